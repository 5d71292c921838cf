//! In-memory doubles for the wallet, the RPC node and the document store.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use solana_program::{hash::Hash, pubkey::Pubkey};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::DocumentStore;
use crate::rpc::{ChainClient, Commitment, Memcmp};
use crate::wallet::{ConnectMode, WalletProvider};

pub fn test_config() -> Config {
    Config::from_values(
        Some("https://api.devnet.solana.com"),
        Some("Vote111111111111111111111111111111111111111"),
        Some("Config1111111111111111111111111111111111111"),
        Some("Stake11111111111111111111111111111111111111"),
    )
    .unwrap()
}

#[derive(Default)]
pub struct FakeChain {
    pub accounts: RefCell<HashMap<Pubkey, Vec<u8>>>,
    pub unreachable: RefCell<Vec<Pubkey>>,
    pub program_keys: RefCell<Vec<Pubkey>>,
    pub filters: RefCell<Vec<(Pubkey, Memcmp)>>,
    pub sent: RefCell<Vec<Vec<u8>>>,
    pub confirmed: RefCell<Vec<(String, Commitment)>>,
    pub send_error: RefCell<Option<Error>>,
    pub confirm_error: RefCell<Option<Error>>,
}

impl FakeChain {
    pub fn insert(&self, key: Pubkey, data: Vec<u8>) {
        self.accounts.borrow_mut().insert(key, data);
    }
}

#[async_trait(?Send)]
impl ChainClient for FakeChain {
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        if self.unreachable.borrow().contains(address) {
            return Err(Error::Transport("getAccountInfo returned HTTP 503".to_string()));
        }
        Ok(self.accounts.borrow().get(address).cloned())
    }

    async fn program_account_keys(&self, program_id: &Pubkey, filter: &Memcmp) -> Result<Vec<Pubkey>> {
        self.filters
            .borrow_mut()
            .push((*program_id, filter.clone()));
        Ok(self.program_keys.borrow().clone())
    }

    async fn minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64> {
        Ok(1_461_600)
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_from_array([9; 32]))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String> {
        if let Some(err) = self.send_error.borrow().clone() {
            return Err(err);
        }
        self.sent.borrow_mut().push(wire.to_vec());
        Ok("5ignature".to_string())
    }

    async fn confirm_signature(&self, signature: &str, commitment: Commitment) -> Result<()> {
        if let Some(err) = self.confirm_error.borrow().clone() {
            return Err(err);
        }
        self.confirmed
            .borrow_mut()
            .push((signature.to_string(), commitment));
        Ok(())
    }
}

pub struct FakeWallet {
    pub key: Pubkey,
    pub trusted: bool,
    pub modes: RefCell<Vec<ConnectMode>>,
}

impl FakeWallet {
    pub fn trusted() -> Self {
        Self {
            key: Pubkey::new_unique(),
            trusted: true,
            modes: RefCell::default(),
        }
    }

    pub fn untrusted() -> Self {
        Self {
            trusted: false,
            ..Self::trusted()
        }
    }
}

#[async_trait(?Send)]
impl WalletProvider for FakeWallet {
    async fn connect(&self, mode: ConnectMode) -> Result<Pubkey> {
        self.modes.borrow_mut().push(mode);
        match mode {
            ConnectMode::OnlyIfTrusted if !self.trusted => {
                Err(Error::Wallet("User rejected the request.".to_string()))
            }
            _ => Ok(self.key),
        }
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<[u8; 64]> {
        Ok([1; 64])
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub documents: RefCell<HashMap<String, Value>>,
    pub requested: RefCell<Vec<String>>,
}

impl FakeStore {
    pub fn insert(&self, uri: &str, document: Value) {
        self.documents.borrow_mut().insert(uri.to_string(), document);
    }
}

#[async_trait(?Send)]
impl DocumentStore for FakeStore {
    async fn fetch_json(&self, uri: &str) -> Result<Value> {
        self.requested.borrow_mut().push(uri.to_string());
        self.documents
            .borrow()
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("{} returned HTTP 404", uri)))
    }
}
