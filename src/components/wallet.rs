use solana_program::pubkey::Pubkey;
use yew::prelude::*;

use crate::utils::shorten;

pub struct WalletConnect;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub address: Option<Pubkey>,
    pub on_connect: Callback<()>,
}

impl Component for WalletConnect {
    type Message = ();
    type Properties = Props;

    fn create(_ctx: &Context<Self>) -> Self {
        Self
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let on_connect = ctx.props().on_connect.clone();
        let onclick = Callback::from(move |_: MouseEvent| on_connect.emit(()));

        html! {
            <div class="wallet-section">
                if let Some(address) = &ctx.props().address {
                    <div class="connected-status">
                        {"Wallet Connected"}
                        <div class="wallet-address">
                            {format!("Address: {}", shorten(&address.to_string()))}
                        </div>
                    </div>
                } else {
                    <button class="connect-button" {onclick}>
                        {"Connect to Wallet"}
                    </button>
                }
            </div>
        }
    }
}
