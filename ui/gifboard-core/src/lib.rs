//! Core of the GIF board: wallet session, on-chain ledger access and the view
//! state the desktop front end renders.
//!
//! The front end owns no logic. It reads [`session::ViewState`] snapshots,
//! turns them into a [`view::Screen`] and dispatches [`session::Session`]
//! operations back.

pub mod config;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod program;
pub mod rpc;
pub mod session;
pub mod transaction;
pub mod view;
pub mod wallet;

pub use config::{AppConfig, Settings};
pub use error::{ConfigError, KeyError, LedgerError, RpcError, WalletError};
pub use keys::{Keypair, Pubkey};
pub use ledger::{ProgramLedger, RemoteLedger};
pub use program::Record;
pub use session::{Identity, RecordList, Session, ViewState};
pub use view::{render, Screen};
pub use wallet::{ConnectOptions, KeypairWallet, WalletConnector, WalletPresence};
