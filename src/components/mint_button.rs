use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub disabled: bool,
    pub busy: bool,
    pub onclick: Callback<MouseEvent>,
}

#[function_component(MintButton)]
pub fn mint_button(props: &Props) -> Html {
    html! {
        <button
            type="button"
            class="mint-button"
            disabled={props.disabled}
            onclick={props.onclick.clone()}
        >
            if props.busy {
                {"Minting..."}
            } else {
                {"Mint NFT"}
            }
        </button>
    }
}
