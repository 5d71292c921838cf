use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use solana_program::pubkey::Pubkey;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pda::{anchor_discriminator, find_idl_address, CANDY_MACHINE_PROGRAM_ID};
use crate::rpc::ChainClient;

/// On-chain candy machine account, after the 8-byte discriminator.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct CandyMachine {
    pub authority: Pubkey,
    pub wallet: Pubkey,
    pub token_mint: Option<Pubkey>,
    pub config: Pubkey,
    pub data: CandyMachineData,
    pub items_redeemed: u64,
    pub bump: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq)]
pub struct CandyMachineData {
    pub uuid: String,
    pub price: u64,
    pub items_available: u64,
    pub go_live_date: Option<i64>,
}

impl CandyMachine {
    pub fn discriminator() -> [u8; 8] {
        anchor_discriminator("account", "CandyMachine")
    }

    pub fn try_from_account(data: &[u8]) -> Result<Self> {
        if data.len() < 8 || data[..8] != Self::discriminator() {
            return Err(Error::Decode(
                "candy machine account: discriminator mismatch".to_string(),
            ));
        }
        // Trailing padding is expected, so no exact-length check.
        let mut body = &data[8..];
        Self::deserialize(&mut body)
            .map_err(|err| Error::Decode(format!("candy machine account: {}", err)))
    }
}

/// Snapshot of the sale, replaced wholesale on every refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleState {
    pub items_available: u64,
    pub items_redeemed: u64,
    pub items_remaining: u64,
    pub go_live_date: i64,
    pub go_live_date_time_string: String,
    pub price_lamports: u64,
}

impl SaleState {
    pub fn from_account(account: &CandyMachine) -> Self {
        let items_available = account.data.items_available;
        let items_redeemed = account.items_redeemed;
        let (go_live_date, go_live_date_time_string) = match account.data.go_live_date {
            Some(ts) => (ts, format_go_live(ts)),
            None => (0, "Not scheduled".to_string()),
        };

        Self {
            items_available,
            items_redeemed,
            items_remaining: items_available.saturating_sub(items_redeemed),
            go_live_date,
            go_live_date_time_string,
            price_lamports: account.data.price,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.items_remaining == 0
    }

    /// Whole seconds until go-live, `None` once the drop has started.
    pub fn seconds_until_live(&self, now: i64) -> Option<i64> {
        if now < self.go_live_date {
            Some(self.go_live_date - now)
        } else {
            None
        }
    }
}

/// RFC 1123 in UTC, e.g. `Sat, 01 Jan 2022 00:00:00 GMT`.
pub fn format_go_live(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Reads the sale configuration of the configured candy machine.
///
/// Returns `Ok(None)` while the program has not published its interface
/// record, so callers can poll again later instead of surfacing an error.
pub async fn read_sale_state(client: &dyn ChainClient, config: &Config) -> Result<Option<SaleState>> {
    let idl_address = find_idl_address(&CANDY_MACHINE_PROGRAM_ID)?;
    match client.account_data(&idl_address).await? {
        Some(data) if !data.is_empty() => {}
        _ => {
            log::warn!("Candy machine program interface not available yet");
            return Ok(None);
        }
    }

    let data = client
        .account_data(&config.candy_machine_id)
        .await?
        .ok_or_else(|| {
            Error::Decode(format!(
                "candy machine account {} not found",
                config.candy_machine_id
            ))
        })?;
    let candy_machine = CandyMachine::try_from_account(&data)?;
    let state = SaleState::from_account(&candy_machine);

    log::info!(
        "Candy machine: {} / {} redeemed, {} remaining, live {}",
        state.items_redeemed,
        state.items_available,
        state.items_remaining,
        state.go_live_date_time_string
    );

    Ok(Some(state))
}
