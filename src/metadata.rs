//! Token metadata account layout.
//!
//! Names, symbols and URIs are stored zero padded to their maximum length,
//! which keeps every field before the creator list at a fixed offset.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::{Error, Result};

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_CREATOR_LEN: usize = 32 + 1 + 1;

const METADATA_V1_KEY: u8 = 4;

/// Byte offset of creator `index`'s address inside a metadata account.
pub const fn creator_offset(index: usize) -> usize {
    1 + // key
    32 + // update authority
    32 + // mint
    4 + MAX_NAME_LENGTH +
    4 + MAX_URI_LENGTH +
    4 + MAX_SYMBOL_LENGTH +
    2 + // seller fee basis points
    1 + // creators option
    4 + // creators vec length
    index * MAX_CREATOR_LEN
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Data {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
struct MetadataAccount {
    key: u8,
    update_authority: Pubkey,
    mint: Pubkey,
    data: Data,
    primary_sale_happened: bool,
    is_mutable: bool,
}

/// Decoded metadata with padding stripped.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRecord {
    pub mint: Pubkey,
    pub update_authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
}

impl MetadataRecord {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let account = MetadataAccount::deserialize(&mut buf)
            .map_err(|err| Error::Decode(format!("metadata account: {}", err)))?;
        if account.key != METADATA_V1_KEY {
            return Err(Error::Decode(format!(
                "metadata account: unexpected key {}",
                account.key
            )));
        }

        Ok(Self {
            mint: account.mint,
            update_authority: account.update_authority,
            name: unpad(&account.data.name),
            symbol: unpad(&account.data.symbol),
            uri: unpad(&account.data.uri),
            seller_fee_basis_points: account.data.seller_fee_basis_points,
            creators: account.data.creators.unwrap_or_default(),
        })
    }
}

fn unpad(value: &str) -> String {
    value.trim_end_matches('\0').to_string()
}
