use solana_program::pubkey::Pubkey;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::app::{Services, WalletHandle};
use crate::candy_machine::{read_sale_state, SaleState};
use crate::components::{countdown::Countdown, gallery::Gallery, mint_button::MintButton};
use crate::error::Error;
use crate::history::{fetch_past_mints, resolve_images, MintedGallery};
use crate::mint::{mint, MintProgress};
use crate::utils::{format_sol, now_unix};

/// What the drop date line shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTimer {
    Countdown(i64),
    Static(String),
}

pub fn drop_timer(sale: &SaleState, now: i64) -> DropTimer {
    match sale.seconds_until_live(now) {
        Some(_) => DropTimer::Countdown(sale.go_live_date),
        None => DropTimer::Static(sale.go_live_date_time_string.clone()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintControl {
    SoldOut,
    Button { disabled: bool },
}

/// Sold out replaces the button; an unknown sale state leaves it usable.
pub fn mint_control(sale: Option<&SaleState>, in_flight: bool) -> MintControl {
    match sale {
        Some(sale) if sale.is_sold_out() => MintControl::SoldOut,
        _ => MintControl::Button {
            disabled: in_flight,
        },
    }
}

pub struct CandyMachine {
    sale: Option<SaleState>,
    gallery: MintedGallery,
    progress: MintProgress,
}

pub enum Msg {
    Refresh,
    SaleLoaded(Option<SaleState>),
    ImagesLoaded(Vec<String>),
    Mint,
    MintSettled(Result<String, Error>),
    WentLive,
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub services: Services,
    pub wallet: WalletHandle,
    pub address: Pubkey,
}

impl CandyMachine {
    fn refresh(ctx: &Context<Self>) {
        let services = ctx.props().services.clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            match read_sale_state(services.chain.as_ref(), &services.config).await {
                Ok(state) => link.send_message(Msg::SaleLoaded(state)),
                Err(err) => log::error!("Failed to read candy machine state: {}", err),
            }
        });

        let services = ctx.props().services.clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            let creator = services.config.candy_machine_id;
            match fetch_past_mints(services.chain.as_ref(), &creator, true).await {
                Ok(mints) => {
                    let images = resolve_images(services.store.as_ref(), &mints).await;
                    link.send_message(Msg::ImagesLoaded(images));
                }
                Err(err) => log::error!("Failed to fetch past mints: {}", err),
            }
        });
    }
}

impl Component for CandyMachine {
    type Message = Msg;
    type Properties = Props;

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_message(Msg::Refresh);
        Self {
            sale: None,
            gallery: MintedGallery::default(),
            progress: MintProgress::default(),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Refresh => {
                Self::refresh(ctx);
                false
            }
            Msg::SaleLoaded(state) => {
                self.sale = state;
                true
            }
            Msg::ImagesLoaded(images) => self.gallery.extend_unique(images),
            Msg::Mint => {
                if !self.progress.begin() {
                    return false;
                }
                let services = ctx.props().services.clone();
                let wallet = ctx.props().wallet.clone();
                let payer = ctx.props().address;
                let link = ctx.link().clone();
                spawn_local(async move {
                    let outcome = mint(
                        services.chain.as_ref(),
                        wallet.provider(),
                        &services.config,
                        &payer,
                    )
                    .await;
                    link.send_message(Msg::MintSettled(outcome));
                });
                true
            }
            Msg::MintSettled(outcome) => {
                self.progress.settle(&outcome);
                ctx.link().send_message(Msg::Refresh);
                true
            }
            Msg::WentLive => true,
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().address != old_props.address {
            ctx.link().send_message(Msg::Refresh);
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onclick = ctx.link().callback(|_: MouseEvent| Msg::Mint);
        let on_live = ctx.link().callback(|_| Msg::WentLive);

        let control = match mint_control(self.sale.as_ref(), self.progress.in_flight()) {
            MintControl::SoldOut => html! {
                <p class="sold-out">{"SOLD OUT"}</p>
            },
            MintControl::Button { disabled } => html! {
                <MintButton {disabled} busy={self.progress.in_flight()} {onclick} />
            },
        };

        html! {
            <div class="candy-machine">
                if let Some(sale) = &self.sale {
                    <div class="machine-stats">
                        { match drop_timer(sale, now_unix()) {
                            DropTimer::Countdown(go_live) => html! {
                                <Countdown {go_live} on_complete={on_live} />
                            },
                            DropTimer::Static(date) => html! {
                                <p>{format!("Drop Date: {}", date)}</p>
                            },
                        } }
                        <p>{format!("Items Minted: {} / {}", sale.items_redeemed, sale.items_available)}</p>
                        <p>{format!("Price: {}", format_sol(sale.price_lamports))}</p>
                    </div>
                }
                <div class="mint-control">
                    {control}
                </div>
                if let Some(notice) = self.progress.notice() {
                    <div class="status-message">
                        {notice}
                    </div>
                }
                <Gallery images={self.gallery.urls().to_vec()} />
            </div>
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(available: u64, redeemed: u64, go_live: i64) -> SaleState {
        SaleState {
            items_available: available,
            items_redeemed: redeemed,
            items_remaining: available.saturating_sub(redeemed),
            go_live_date: go_live,
            go_live_date_time_string: "Sat, 01 Jan 2022 00:00:00 GMT".to_string(),
            price_lamports: 0,
        }
    }

    #[test]
    fn countdown_before_go_live() {
        assert_eq!(
            drop_timer(&sale(10, 0, 1_640_995_200), 1_640_995_100),
            DropTimer::Countdown(1_640_995_200)
        );
    }

    #[test]
    fn static_string_once_live() {
        let expected = DropTimer::Static("Sat, 01 Jan 2022 00:00:00 GMT".to_string());
        assert_eq!(drop_timer(&sale(10, 0, 1_640_995_200), 1_640_995_200), expected);
        assert_eq!(drop_timer(&sale(10, 0, 1_640_995_200), 1_700_000_000), expected);
    }

    #[test]
    fn sold_out_replaces_button() {
        assert_eq!(mint_control(Some(&sale(10, 10, 0)), false), MintControl::SoldOut);
        assert_eq!(mint_control(Some(&sale(10, 10, 0)), true), MintControl::SoldOut);
    }

    #[test]
    fn button_disabled_only_while_minting() {
        assert_eq!(
            mint_control(Some(&sale(10, 3, 0)), false),
            MintControl::Button { disabled: false }
        );
        assert_eq!(
            mint_control(Some(&sale(10, 3, 0)), true),
            MintControl::Button { disabled: true }
        );
        assert_eq!(mint_control(None, true), MintControl::Button { disabled: true });
    }
}
