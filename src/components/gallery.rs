use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub images: Vec<String>,
}

#[function_component(Gallery)]
pub fn gallery(props: &Props) -> Html {
    if props.images.is_empty() {
        return html! {};
    }

    html! {
        <div class="gif-container">
            <p class="sub-text">{"Minted Items"}</p>
            <div class="gif-grid">
                { for props.images.iter().map(|url| html! {
                    <div class="gif-item" key={url.clone()}>
                        <img src={url.clone()} alt={url.clone()} />
                    </div>
                }) }
            </div>
        </div>
    }
}
