use std::str::FromStr;

use solana_program::pubkey::Pubkey;

use crate::error::{Error, Result};

/// Deployment settings, fixed at build time and shared by every component.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rpc_host: String,
    pub candy_machine_id: Pubkey,
    pub candy_machine_config: Pubkey,
    pub treasury: Pubkey,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            option_env!("SOLANA_RPC_HOST"),
            option_env!("CANDY_MACHINE_ID"),
            option_env!("CANDY_MACHINE_CONFIG"),
            option_env!("TREASURY_ADDRESS"),
        )
    }

    pub fn from_values(
        rpc_host: Option<&str>,
        candy_machine_id: Option<&str>,
        candy_machine_config: Option<&str>,
        treasury: Option<&str>,
    ) -> Result<Self> {
        let rpc_host = required("SOLANA_RPC_HOST", rpc_host)?;
        if !rpc_host.starts_with("http://") && !rpc_host.starts_with("https://") {
            return Err(Error::Config(format!(
                "SOLANA_RPC_HOST must be an http(s) url, got {}",
                rpc_host
            )));
        }

        Ok(Self {
            rpc_host: rpc_host.trim_end_matches('/').to_string(),
            candy_machine_id: address("CANDY_MACHINE_ID", candy_machine_id)?,
            candy_machine_config: address("CANDY_MACHINE_CONFIG", candy_machine_config)?,
            treasury: address("TREASURY_ADDRESS", treasury)?,
        })
    }

    /// Pubsub endpoint living next to the JSON-RPC host.
    pub fn websocket_url(&self) -> String {
        if let Some(rest) = self.rpc_host.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.rpc_host.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.rpc_host.clone()
        }
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{} is not set", name))),
    }
}

fn address(name: &str, value: Option<&str>) -> Result<Pubkey> {
    let value = required(name, value)?;
    Pubkey::from_str(value)
        .map_err(|_| Error::Config(format!("{} is not a valid address: {}", name, value)))
}
