//! Error types for every fallible boundary in the crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("program_id is not set")]
    MissingProgramId,
    #[error("invalid program_id: {0}")]
    InvalidProgramId(#[source] KeyError),
    #[error("base account keypair {path}: {source}")]
    BaseAccount {
        path: PathBuf,
        #[source]
        source: KeyError,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("keypair I/O: {0}")]
    Io(String),
    #[error("unrecognized keypair format: {0}")]
    Format(String),
    #[error("secret key does not match public key")]
    Mismatch,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("RPC error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("malformed RPC response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("no wallet available")]
    NotFound,
    #[error("wallet is not usable: {0}")]
    Unsupported(String),
    #[error("wallet has not trusted this application")]
    NotTrusted,
    #[error("connection rejected: {0}")]
    Rejected(String),
    #[error("wallet is not connected")]
    NotConnected,
    #[error("wallet I/O: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("program account has not been initialized")]
    AccountNotFound,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("invalid identity: {0}")]
    Identity(#[from] KeyError),
    #[error("account data: {0}")]
    Decode(String),
    #[error("transaction: {0}")]
    Transaction(String),
    #[error("transaction failed on chain: {0}")]
    Failed(String),
    #[error("transaction {0} was not confirmed in time")]
    ConfirmationTimeout(String),
}
