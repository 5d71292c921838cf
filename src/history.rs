use std::collections::HashSet;

use async_trait::async_trait;
use gloo_net::http::Request;
use serde_json::Value;
use solana_program::pubkey::Pubkey;

use crate::error::{Error, Result};
use crate::metadata::{creator_offset, MetadataRecord};
use crate::pda::TOKEN_METADATA_PROGRAM_ID;
use crate::rpc::{ChainClient, Memcmp};

/// One previously minted token, shaped by the `include_metadata` flag.
#[derive(Clone, Debug, PartialEq)]
pub enum PastMint {
    Full(MetadataRecord),
    Reference(Pubkey),
}

/// Off-chain storage hosting the JSON documents metadata URIs point to.
#[async_trait(?Send)]
pub trait DocumentStore {
    async fn fetch_json(&self, uri: &str) -> Result<Value>;
}

pub struct HttpDocumentStore;

#[async_trait(?Send)]
impl DocumentStore for HttpDocumentStore {
    async fn fetch_json(&self, uri: &str) -> Result<Value> {
        let response = Request::get(uri).send().await?;
        if !response.ok() {
            return Err(Error::Transport(format!(
                "{} returned HTTP {}",
                uri,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Metadata accounts whose first creator is `creator`, in ledger order.
pub async fn fetch_past_mints(
    client: &dyn ChainClient,
    creator: &Pubkey,
    include_metadata: bool,
) -> Result<Vec<PastMint>> {
    let filter = Memcmp {
        offset: creator_offset(0),
        bytes: *creator,
    };
    let keys = client
        .program_account_keys(&TOKEN_METADATA_PROGRAM_ID, &filter)
        .await?;
    log::debug!("{} metadata accounts created by {}", keys.len(), creator);

    let mut mints = Vec::with_capacity(keys.len());
    for key in keys {
        let data = match client.account_data(&key).await {
            Ok(Some(data)) => data,
            Ok(None) => continue,
            Err(err) => {
                log::warn!("Failed to read metadata account {}: {}", key, err);
                continue;
            }
        };
        match MetadataRecord::decode(&data) {
            Ok(record) if include_metadata => mints.push(PastMint::Full(record)),
            Ok(record) => mints.push(PastMint::Reference(record.mint)),
            Err(err) => log::warn!("Skipping metadata account {}: {}", key, err),
        }
    }

    Ok(mints)
}

/// Image URLs of the given mints. A document that cannot be fetched or has
/// no `image` field is logged and left out.
pub async fn resolve_images(store: &dyn DocumentStore, mints: &[PastMint]) -> Vec<String> {
    let mut images = Vec::new();
    for mint in mints {
        let record = match mint {
            PastMint::Full(record) => record,
            PastMint::Reference(_) => continue,
        };
        match store.fetch_json(&record.uri).await {
            Ok(document) => match document.get("image").and_then(Value::as_str) {
                Some(image) => images.push(image.to_string()),
                None => log::warn!("No image in metadata document {}", record.uri),
            },
            Err(err) => log::warn!("Failed to fetch {}: {}", record.uri, err),
        }
    }
    images
}

/// Images minted so far this session, in discovery order and without repeats.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MintedGallery {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl MintedGallery {
    /// Appends unseen URLs, returning whether anything was added.
    pub fn extend_unique<I>(&mut self, urls: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.urls.len();
        for url in urls {
            if self.seen.insert(url.clone()) {
                self.urls.push(url);
            }
        }
        self.urls.len() != before
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::encode_metadata;
    use crate::testing::{FakeChain, FakeStore};
    use futures::executor::block_on;
    use serde_json::json;

    fn seeded_chain(creator: Pubkey, uris: &[&str]) -> (FakeChain, Vec<Pubkey>) {
        let chain = FakeChain::default();
        let mut mints = Vec::new();
        for uri in uris {
            let mint = Pubkey::new_unique();
            let key = Pubkey::new_unique();
            chain.insert(key, encode_metadata(mint, creator, uri));
            chain.program_keys.borrow_mut().push(key);
            mints.push(mint);
        }
        (chain, mints)
    }

    #[test]
    fn filters_on_first_creator_offset() {
        let creator = Pubkey::new_unique();
        let (chain, _) = seeded_chain(creator, &["https://a"]);

        block_on(fetch_past_mints(&chain, &creator, true)).unwrap();

        let filters = chain.filters.borrow();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0], (TOKEN_METADATA_PROGRAM_ID, Memcmp { offset: 326, bytes: creator }));
    }

    #[test]
    fn flag_selects_record_or_reference() {
        let creator = Pubkey::new_unique();
        let (chain, mints) = seeded_chain(creator, &["https://a", "https://b"]);

        let full = block_on(fetch_past_mints(&chain, &creator, true)).unwrap();
        assert!(matches!(&full[0], PastMint::Full(record) if record.uri == "https://a"));

        let refs = block_on(fetch_past_mints(&chain, &creator, false)).unwrap();
        assert_eq!(refs, vec![PastMint::Reference(mints[0]), PastMint::Reference(mints[1])]);
    }

    #[test]
    fn vanished_and_garbled_accounts_are_skipped() {
        let creator = Pubkey::new_unique();
        let (chain, _) = seeded_chain(creator, &["https://a"]);
        chain.program_keys.borrow_mut().push(Pubkey::new_unique());
        let garbled = Pubkey::new_unique();
        chain.insert(garbled, vec![9, 9, 9]);
        chain.program_keys.borrow_mut().push(garbled);

        let mints = block_on(fetch_past_mints(&chain, &creator, true)).unwrap();
        assert_eq!(mints.len(), 1);
    }

    #[test]
    fn unreadable_account_does_not_abort_the_batch() {
        let creator = Pubkey::new_unique();
        let (chain, _) = seeded_chain(creator, &["https://a", "https://b", "https://c"]);
        let flaky = chain.program_keys.borrow()[1];
        chain.unreachable.borrow_mut().push(flaky);

        let mints = block_on(fetch_past_mints(&chain, &creator, true)).unwrap();
        let uris: Vec<&str> = mints
            .iter()
            .filter_map(|mint| match mint {
                PastMint::Full(record) => Some(record.uri.as_str()),
                PastMint::Reference(_) => None,
            })
            .collect();
        assert_eq!(uris, vec!["https://a", "https://c"]);
    }

    #[test]
    fn failed_documents_do_not_abort_the_batch() {
        let creator = Pubkey::new_unique();
        let (chain, _) = seeded_chain(creator, &["https://a", "https://broken", "https://c", "https://noimage"]);
        let store = FakeStore::default();
        store.insert("https://a", json!({ "image": "https://img/a.png" }));
        store.insert("https://c", json!({ "image": "https://img/c.png" }));
        store.insert("https://noimage", json!({ "name": "x" }));

        let mints = block_on(fetch_past_mints(&chain, &creator, true)).unwrap();
        let images = block_on(resolve_images(&store, &mints));
        assert_eq!(images, vec!["https://img/a.png", "https://img/c.png"]);
    }

    #[test]
    fn references_are_not_fetched() {
        let store = FakeStore::default();
        let images = block_on(resolve_images(&store, &[PastMint::Reference(Pubkey::new_unique())]));
        assert!(images.is_empty());
        assert!(store.requested.borrow().is_empty());
    }

    #[test]
    fn gallery_never_holds_duplicates() {
        let mut gallery = MintedGallery::default();
        assert!(gallery.extend_unique(vec!["a".to_string(), "b".to_string(), "a".to_string()]));
        assert!(!gallery.extend_unique(vec!["b".to_string(), "a".to_string()]));
        assert!(gallery.extend_unique(vec!["c".to_string(), "b".to_string()]));
        assert_eq!(gallery.urls(), &["a", "b", "c"]);
    }
}
