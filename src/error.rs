use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Candy machine program error codes the mint path recognises.
pub const NOT_ENOUGH_SOL: u32 = 309;
pub const CANDY_MACHINE_EMPTY: u32 = 311;
pub const CANDY_MACHINE_NOT_LIVE: u32 = 312;

/// Position of the candy machine call within a mint transaction.
pub const MINT_NFT_INSTRUCTION: u64 = 4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Solana object not found! Get a Phantom Wallet")]
    ProviderMissing,

    #[error("Wallet request failed: {0}")]
    Wallet(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Program error {code}: {message}")]
    Program { code: u32, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode {0}")]
    Decode(String),

    #[error("Failed to build instruction: {0}")]
    Instruction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

impl Error {
    /// Message attached to a known candy machine program error code.
    pub fn program(code: u32) -> Self {
        let message = match code {
            NOT_ENOUGH_SOL => "Not enough SOL to pay for this minting",
            CANDY_MACHINE_EMPTY => "Candy machine is empty!",
            CANDY_MACHINE_NOT_LIVE => "Candy machine is not live yet!",
            _ => "Unknown program error",
        };
        Error::Program {
            code,
            message: message.to_string(),
        }
    }
}

impl From<gloo_net::Error> for Error {
    fn from(err: gloo_net::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<solana_program::program_error::ProgramError> for Error {
    fn from(err: solana_program::program_error::ProgramError) -> Self {
        Error::Instruction(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Human readable cause of a failed mint attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintFailure {
    SoldOut,
    NotLive,
    InsufficientFunds,
    Unknown,
}

impl MintFailure {
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Program { code, .. } => match *code {
                CANDY_MACHINE_EMPTY => MintFailure::SoldOut,
                CANDY_MACHINE_NOT_LIVE => MintFailure::NotLive,
                NOT_ENOUGH_SOL => MintFailure::InsufficientFunds,
                _ => MintFailure::Unknown,
            },
            Error::Rpc { message, .. }
            | Error::Transport(message)
            | Error::Wallet(message)
            | Error::TransactionFailed(message) => Self::from_message(message),
            _ => MintFailure::Unknown,
        }
    }

    fn from_message(message: &str) -> Self {
        if message.contains("0x137") {
            MintFailure::SoldOut
        } else if message.contains("0x138") {
            MintFailure::NotLive
        } else if message.contains("0x135") || message.contains("insufficient lamports") {
            MintFailure::InsufficientFunds
        } else {
            MintFailure::Unknown
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            MintFailure::SoldOut => "SOLD OUT!",
            MintFailure::NotLive => "Minting period hasn't started yet.",
            MintFailure::InsufficientFunds => {
                "Insufficient funds to mint. Please fund your wallet."
            }
            MintFailure::Unknown => "Minting failed! Please try again!",
        }
    }
}
