use std::str::FromStr;

use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use solana_program::pubkey::Pubkey;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    /// Succeeds silently only when the user already trusts the site.
    OnlyIfTrusted,
    /// May prompt the user.
    Prompt,
}

/// What the app needs from a browser wallet.
#[async_trait(?Send)]
pub trait WalletProvider {
    async fn connect(&self, mode: ConnectMode) -> Result<Pubkey>;

    /// Signs serialized transaction message bytes with the wallet's key.
    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64]>;
}

/// Silent connection attempted once the page has loaded.
pub async fn try_auto_connect(provider: Option<&dyn WalletProvider>) -> Result<Pubkey> {
    let provider = provider.ok_or(Error::ProviderMissing)?;
    let address = provider.connect(ConnectMode::OnlyIfTrusted).await?;
    log::info!("Connected with Public Key: {}", address);
    Ok(address)
}

/// Connection requested by the user.
pub async fn connect(provider: Option<&dyn WalletProvider>) -> Result<Pubkey> {
    let provider = provider.ok_or(Error::ProviderMissing)?;
    let address = provider.connect(ConnectMode::Prompt).await?;
    log::info!("Connected with Public Key: {}", address);
    Ok(address)
}

/// The provider object a wallet extension injects as `window.solana`.
pub struct InjectedWallet {
    provider: JsValue,
}

impl InjectedWallet {
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let provider = Reflect::get(&window, &JsValue::from_str("solana")).ok()?;
        if provider.is_undefined() || provider.is_null() {
            return None;
        }

        let is_phantom = Reflect::get(&provider, &JsValue::from_str("isPhantom"))
            .ok()
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false);
        if is_phantom {
            log::info!("Phantom wallet found!");
        }

        Some(Self { provider })
    }

    fn method(&self, name: &str) -> Result<Function> {
        Reflect::get(&self.provider, &JsValue::from_str(name))
            .map_err(|err| Error::Wallet(js_error(err)))?
            .dyn_into::<Function>()
            .map_err(|_| Error::Wallet(format!("wallet has no {} method", name)))
    }

    async fn await_promise(value: JsValue) -> Result<JsValue> {
        let promise: Promise = value
            .dyn_into()
            .map_err(|_| Error::Wallet("wallet did not return a promise".to_string()))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| Error::Wallet(js_error(err)))
    }
}

#[async_trait(?Send)]
impl WalletProvider for InjectedWallet {
    async fn connect(&self, mode: ConnectMode) -> Result<Pubkey> {
        let connect = self.method("connect")?;
        let pending = match mode {
            ConnectMode::OnlyIfTrusted => {
                let options = Object::new();
                Reflect::set(
                    &options,
                    &JsValue::from_str("onlyIfTrusted"),
                    &JsValue::TRUE,
                )
                .map_err(|err| Error::Wallet(js_error(err)))?;
                connect.call1(&self.provider, &options)
            }
            ConnectMode::Prompt => connect.call0(&self.provider),
        }
        .map_err(|err| Error::Wallet(js_error(err)))?;

        let response = Self::await_promise(pending).await?;
        let key = Reflect::get(&response, &JsValue::from_str("publicKey"))
            .map_err(|err| Error::Wallet(js_error(err)))?;
        parse_key(&key)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64]> {
        let request = self.method("request")?;

        let params = Object::new();
        Reflect::set(
            &params,
            &JsValue::from_str("message"),
            &JsValue::from_str(&bs58::encode(message).into_string()),
        )
        .map_err(|err| Error::Wallet(js_error(err)))?;
        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str("signTransaction"))
            .map_err(|err| Error::Wallet(js_error(err)))?;
        Reflect::set(&args, &JsValue::from_str("params"), &params)
            .map_err(|err| Error::Wallet(js_error(err)))?;

        let pending = request
            .call1(&self.provider, &args)
            .map_err(|err| Error::Wallet(js_error(err)))?;
        let response = Self::await_promise(pending).await?;

        let signature = Reflect::get(&response, &JsValue::from_str("signature"))
            .ok()
            .and_then(|value| value.as_string())
            .ok_or_else(|| Error::Wallet("wallet returned no signature".to_string()))?;
        decode_signature(&signature)
    }
}

fn parse_key(key: &JsValue) -> Result<Pubkey> {
    let text = match key.as_string() {
        Some(text) => text,
        None => key
            .dyn_ref::<Object>()
            .map(|object| String::from(object.to_string()))
            .ok_or_else(|| Error::Wallet("wallet returned no public key".to_string()))?,
    };
    Pubkey::from_str(&text).map_err(|_| Error::Wallet(format!("invalid public key {}", text)))
}

pub(crate) fn decode_signature(encoded: &str) -> Result<[u8; 64]> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|err| Error::Wallet(format!("signature: {}", err)))?;
    <[u8; 64]>::try_from(bytes.as_slice())
        .map_err(|_| Error::Wallet(format!("signature has {} bytes", bytes.len())))
}

fn js_error(value: JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    if let Some(text) = value.as_string() {
        return text;
    }
    Reflect::get(&value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWallet;
    use futures::executor::block_on;

    #[test]
    fn missing_provider_is_reported() {
        assert_eq!(block_on(try_auto_connect(None)), Err(Error::ProviderMissing));
        assert_eq!(block_on(connect(None)), Err(Error::ProviderMissing));
    }

    #[test]
    fn auto_connect_only_asks_for_trusted_connection() {
        let wallet = FakeWallet::trusted();
        let address = block_on(try_auto_connect(Some(&wallet))).unwrap();
        assert_eq!(address, wallet.key);
        assert_eq!(*wallet.modes.borrow(), vec![ConnectMode::OnlyIfTrusted]);
    }

    #[test]
    fn untrusted_site_stays_disconnected_until_prompted() {
        let wallet = FakeWallet::untrusted();
        assert!(matches!(
            block_on(try_auto_connect(Some(&wallet))),
            Err(Error::Wallet(_))
        ));

        let address = block_on(connect(Some(&wallet))).unwrap();
        assert_eq!(address, wallet.key);
        assert_eq!(
            *wallet.modes.borrow(),
            vec![ConnectMode::OnlyIfTrusted, ConnectMode::Prompt]
        );
    }

    #[test]
    fn signature_must_be_64_bytes() {
        let encoded = bs58::encode([7u8; 64]).into_string();
        assert_eq!(decode_signature(&encoded).unwrap(), [7u8; 64]);
        assert!(decode_signature(&bs58::encode([7u8; 12]).into_string()).is_err());
        assert!(decode_signature("0OIl").is_err());
    }
}
