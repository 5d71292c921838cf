use wasm_bindgen::prelude::*;

pub mod app;
pub mod candy_machine;
mod components;
pub mod config;
pub mod error;
pub mod history;
pub mod metadata;
pub mod mint;
pub mod pda;
pub mod rpc;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod testing;

use app::{App, Props, Services};
use config::Config;

#[wasm_bindgen(start)]
pub fn run_app() -> Result<(), JsValue> {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    wasm_logger::init(wasm_logger::Config::default());

    let services = Config::from_env().map(Services::new);
    if let Err(err) = &services {
        log::error!("{}", err);
    }

    yew::Renderer::<App>::with_props(Props { services }).render();
    Ok(())
}
