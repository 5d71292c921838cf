use std::rc::Rc;

use gloo_events::EventListener;
use solana_program::pubkey::Pubkey;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::components::{candy_machine::CandyMachine, wallet::WalletConnect};
use crate::config::Config;
use crate::error::Error;
use crate::history::{DocumentStore, HttpDocumentStore};
use crate::rpc::{ChainClient, RpcClient};
use crate::wallet::{self, InjectedWallet, WalletProvider};

/// Collaborators built once at start-up and shared by every component.
#[derive(Clone)]
pub struct Services {
    pub config: Rc<Config>,
    pub chain: Rc<dyn ChainClient>,
    pub store: Rc<dyn DocumentStore>,
}

impl Services {
    pub fn new(config: Config) -> Self {
        let chain = Rc::new(RpcClient::new(&config));
        Self {
            config: Rc::new(config),
            chain,
            store: Rc::new(HttpDocumentStore),
        }
    }
}

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.config, &other.config)
    }
}

#[derive(Clone)]
pub struct WalletHandle(Rc<dyn WalletProvider>);

impl WalletHandle {
    pub fn new(provider: impl WalletProvider + 'static) -> Self {
        Self(Rc::new(provider))
    }

    pub fn provider(&self) -> &dyn WalletProvider {
        self.0.as_ref()
    }
}

impl PartialEq for WalletHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

pub struct App {
    wallet: Option<WalletHandle>,
    wallet_address: Option<Pubkey>,
    load_listener: Option<EventListener>,
}

pub enum Msg {
    AutoConnect,
    Connect,
    Connected(Pubkey),
    ConnectFailed { err: Error, silent: bool },
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub services: Result<Services, Error>,
}

impl App {
    fn detect_wallet(&mut self) -> Option<WalletHandle> {
        if self.wallet.is_none() {
            self.wallet = InjectedWallet::detect().map(WalletHandle::new);
        }
        self.wallet.clone()
    }
}

impl Component for App {
    type Message = Msg;
    type Properties = Props;

    fn create(ctx: &Context<Self>) -> Self {
        let loaded = gloo_utils::document().ready_state() == "complete";
        let load_listener = if loaded {
            ctx.link().send_message(Msg::AutoConnect);
            None
        } else {
            let link = ctx.link().clone();
            Some(EventListener::once(&gloo_utils::window(), "load", move |_| {
                link.send_message(Msg::AutoConnect)
            }))
        };

        Self {
            wallet: None,
            wallet_address: None,
            load_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::AutoConnect => {
                self.load_listener = None;
                let handle = self.detect_wallet();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let provider = handle.as_ref().map(WalletHandle::provider);
                    match wallet::try_auto_connect(provider).await {
                        Ok(address) => link.send_message(Msg::Connected(address)),
                        Err(err) => link.send_message(Msg::ConnectFailed { err, silent: true }),
                    }
                });
                false
            }
            Msg::Connect => {
                let handle = self.detect_wallet();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let provider = handle.as_ref().map(WalletHandle::provider);
                    match wallet::connect(provider).await {
                        Ok(address) => link.send_message(Msg::Connected(address)),
                        Err(err) => link.send_message(Msg::ConnectFailed { err, silent: false }),
                    }
                });
                false
            }
            Msg::Connected(address) => {
                self.wallet_address = Some(address);
                true
            }
            Msg::ConnectFailed { err, silent } => {
                match (&err, silent) {
                    (Error::ProviderMissing, true) => gloo_dialogs::alert(&err.to_string()),
                    _ => log::error!("{}", err),
                }
                false
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.load_listener.take();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let services = match &ctx.props().services {
            Ok(services) => services.clone(),
            Err(err) => {
                return html! {
                    <div class="container">
                        <h1>{"Candy Drop"}</h1>
                        <div class="status-message">{err.to_string()}</div>
                    </div>
                }
            }
        };
        let on_connect = ctx.link().callback(|_| Msg::Connect);

        html! {
            <div class="container">
                <h1>{"Candy Drop"}</h1>
                <p class="sub-text">{"NFT drop machine with fair mint"}</p>
                <WalletConnect address={self.wallet_address} {on_connect} />
                if let (Some(address), Some(wallet)) = (self.wallet_address, self.wallet.clone()) {
                    <CandyMachine {services} {wallet} {address} />
                }
            </div>
        }
    }
}
