use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::{SinkExt, StreamExt};
use gloo_net::http::Request;
use gloo_net::websocket::{futures::WebSocket, Message};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use solana_program::{hash::Hash, pubkey::Pubkey};

use crate::config::Config;
use crate::error::{Error, Result, MINT_NFT_INSTRUCTION};

/// Confirmation levels the app asks the node for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Processed,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
        }
    }
}

/// Byte comparison applied server side to every account of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Memcmp {
    pub offset: usize,
    pub bytes: Pubkey,
}

/// The ledger operations the app needs from a Solana node.
#[async_trait(?Send)]
pub trait ChainClient {
    /// Raw data of an account, `None` when it does not exist.
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    async fn program_account_keys(&self, program_id: &Pubkey, filter: &Memcmp) -> Result<Vec<Pubkey>>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submits a fully signed transaction, returning its signature.
    async fn send_transaction(&self, wire: &[u8]) -> Result<String>;

    /// Resolves once the node reports `signature` at `commitment`.
    async fn confirm_signature(&self, signature: &str, commitment: Commitment) -> Result<()>;
}

/// JSON-RPC over HTTP plus the pubsub socket for confirmations.
pub struct RpcClient {
    endpoint: String,
    websocket: String,
    commitment: Commitment,
}

#[derive(Deserialize)]
struct RpcReply<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct UiAccount {
    data: (String, String),
}

#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: String,
}

#[derive(Deserialize)]
struct LatestBlockhash {
    blockhash: String,
}

impl RpcClient {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.rpc_host.clone(),
            websocket: config.websocket_url(),
            commitment: Commitment::Processed,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        log::debug!("rpc {}", method);

        let response = Request::post(&self.endpoint).json(&body)?.send().await?;
        if !response.ok() {
            return Err(Error::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let reply: RpcReply<T> = response.json().await?;
        match (reply.result, reply.error) {
            (_, Some(err)) => Err(rpc_error(err.code, err.message, err.data.as_ref())),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::Decode(format!("empty {} response", method))),
        }
    }
}

#[async_trait(?Send)]
impl ChainClient for RpcClient {
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let reply: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment.as_str(),
                }]),
            )
            .await?;

        reply
            .value
            .map(|account| {
                STANDARD
                    .decode(account.data.0)
                    .map_err(|err| Error::Decode(format!("account {}: {}", address, err)))
            })
            .transpose()
    }

    async fn program_account_keys(&self, program_id: &Pubkey, filter: &Memcmp) -> Result<Vec<Pubkey>> {
        let accounts: Vec<KeyedAccount> = self
            .call(
                "getProgramAccounts",
                json!([program_id.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment.as_str(),
                    "dataSlice": { "offset": 0, "length": 0 },
                    "filters": [{
                        "memcmp": { "offset": filter.offset, "bytes": filter.bytes.to_string() }
                    }],
                }]),
            )
            .await?;

        accounts
            .into_iter()
            .map(|account| {
                Pubkey::from_str(&account.pubkey)
                    .map_err(|_| Error::Decode(format!("pubkey {}", account.pubkey)))
            })
            .collect()
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([data_len]))
            .await
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        let reply: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Hash::from_str(&reply.value.blockhash)
            .map_err(|_| Error::Decode(format!("blockhash {}", reply.value.blockhash)))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String> {
        self.call(
            "sendTransaction",
            json!([STANDARD.encode(wire), {
                "encoding": "base64",
                "preflightCommitment": self.commitment.as_str(),
            }]),
        )
        .await
    }

    async fn confirm_signature(&self, signature: &str, commitment: Commitment) -> Result<()> {
        let socket = WebSocket::open(&self.websocket)
            .map_err(|err| Error::Transport(format!("websocket: {}", err)))?;
        let (mut write, mut read) = socket.split();

        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "signatureSubscribe",
            "params": [signature, { "commitment": commitment.as_str() }],
        });
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|err| Error::Transport(format!("websocket: {}", err)))?;

        while let Some(message) = read.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Bytes(_)) => continue,
                Err(err) => return Err(Error::Transport(format!("websocket: {}", err))),
            };
            if let Some(outcome) = parse_signature_notification(&text)? {
                log::info!("Received status event for {}", signature);
                return outcome;
            }
        }

        Err(Error::Transport("signature subscription closed".to_string()))
    }
}

/// Splits candy machine rejections out of a JSON-RPC error.
///
/// A failed preflight carries `data.err = {"InstructionError": [index, {"Custom": code}]}`.
/// Only the candy machine call yields `Error::Program`; failures in the setup
/// instructions keep the node message with the simulation logs appended.
pub fn rpc_error(code: i64, message: String, data: Option<&Value>) -> Error {
    if let Some(custom) = data.and_then(|data| data.get("err")).and_then(candy_machine_code) {
        return Error::program(custom);
    }

    let logs = data
        .and_then(|data| data.get("logs"))
        .and_then(Value::as_array)
        .map(|logs| logs.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    let message = if logs.is_empty() {
        message
    } else {
        format!("{}\n{}", message, logs.join("\n"))
    };
    Error::Rpc { code, message }
}

/// Custom error code raised by the candy machine instruction, if that is what failed.
fn candy_machine_code(err: &Value) -> Option<u32> {
    let instruction = err.get("InstructionError")?;
    if instruction.get(0).and_then(Value::as_u64) != Some(MINT_NFT_INSTRUCTION) {
        return None;
    }
    instruction
        .get(1)?
        .get("Custom")?
        .as_u64()
        .and_then(|code| u32::try_from(code).ok())
}

/// `Ok(None)` for frames that are not the signature notification
/// (the subscription id acknowledgement, for instance).
fn parse_signature_notification(text: &str) -> Result<Option<Result<()>>> {
    let frame: Value = serde_json::from_str(text)?;

    if let Some(err) = frame.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(Some(Err(Error::Rpc { code, message })));
    }

    if frame.get("method").and_then(Value::as_str) != Some("signatureNotification") {
        return Ok(None);
    }

    let err = &frame["params"]["result"]["value"]["err"];
    if err.is_null() {
        Ok(Some(Ok(())))
    } else {
        Ok(Some(Err(transaction_error(err))))
    }
}

fn transaction_error(err: &Value) -> Error {
    match candy_machine_code(err) {
        Some(custom) => Error::program(custom),
        None => Error::TransactionFailed(err.to_string()),
    }
}
