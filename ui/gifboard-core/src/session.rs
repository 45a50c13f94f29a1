//! The view state machine.
//!
//! [`Session`] owns the only mutable state in the application: the connected
//! identity, the input draft and the record list. Every operation is an async
//! task that suspends at the wallet/ledger boundary; failures are logged and
//! folded into state, never returned to the caller.
//!
//! State is published through a [`tokio::sync::watch`] channel so the front
//! end can re-render on every change.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::AppConfig;
use crate::error::{KeyError, LedgerError};
use crate::keys::Pubkey;
use crate::ledger::RemoteLedger;
use crate::program::Record;
use crate::wallet::{ConnectOptions, WalletConnector, WalletPresence};

/// The connected wallet's public identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn pubkey(&self) -> Result<Pubkey, KeyError> {
        self.0.parse()
    }

    /// `Ab12Cd...wXyZ` form for compact display.
    pub fn short(&self) -> String {
        let id = &self.0;
        if id.len() > 12 && id.is_ascii() {
            format!("{}...{}", &id[..6], &id[id.len() - 4..])
        } else {
            id.clone()
        }
    }
}

impl From<Pubkey> for Identity {
    fn from(key: Pubkey) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RecordList {
    /// Never fetched.
    #[default]
    Unloaded,
    Loaded(Vec<Record>),
    /// The base account does not exist yet.
    NoAccount,
    /// The last fetch failed for any other reason.
    FetchError(String),
}

impl RecordList {
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Self::Loaded(records) => Some(records),
            _ => None,
        }
    }

    pub fn fetch_error(&self) -> Option<&str> {
        match self {
            Self::FetchError(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NoAccount | Self::FetchError(_))
    }
}

/// Operations currently awaiting the wallet or ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pending {
    pub connect: bool,
    pub refresh: bool,
    pub submit: bool,
    pub initialize: bool,
}

/// A message the user must see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    WalletMissing,
    WalletUnsupported(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletMissing => write!(f, "No Solana wallet found. Install one to continue."),
            Self::WalletUnsupported(reason) => write!(f, "Need a Solana wallet: {reason}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    ConnectedNoAccount,
    ConnectedFetchError,
    ConnectedWithList,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub identity: Option<Identity>,
    pub draft: String,
    pub records: RecordList,
    pub pending: Pending,
    pub notice: Option<Notice>,
}

impl ViewState {
    pub fn phase(&self) -> Phase {
        if self.identity.is_none() {
            return Phase::Disconnected;
        }
        match self.records {
            RecordList::Unloaded => Phase::Connecting,
            RecordList::NoAccount => Phase::ConnectedNoAccount,
            RecordList::FetchError(_) => Phase::ConnectedFetchError,
            RecordList::Loaded(_) => Phase::ConnectedWithList,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub clear_draft_after_submit: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clear_draft_after_submit: true,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            clear_draft_after_submit: config.clear_draft_after_submit,
        }
    }
}

/// Cheap to clone; all clones drive the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    options: SessionOptions,
    wallet: Arc<dyn WalletConnector>,
    ledger: Arc<dyn RemoteLedger>,
    state: watch::Sender<ViewState>,
    silent_attempted: AtomicBool,
    fetch_generation: AtomicU64,
}

impl Session {
    pub fn new(
        options: SessionOptions,
        wallet: Arc<dyn WalletConnector>,
        ledger: Arc<dyn RemoteLedger>,
    ) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            inner: Arc::new(Inner {
                options,
                wallet,
                ledger,
                state,
                silent_attempted: AtomicBool::new(false),
                fetch_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut ViewState)) {
        self.inner.state.send_modify(f);
    }

    /// Reconnect without prompting if the wallet already trusts us. Runs at
    /// most once per session.
    pub async fn attempt_silent_connect(&self) {
        if self.inner.silent_attempted.swap(true, Ordering::SeqCst) {
            tracing::debug!("silent connect already attempted");
            return;
        }
        match self.inner.wallet.presence().await {
            WalletPresence::Absent => {
                tracing::debug!("no wallet available for silent connect");
                return;
            }
            WalletPresence::Unsupported(reason) => {
                tracing::warn!(%reason, "wallet is not usable");
                self.update(|s| s.notice = Some(Notice::WalletUnsupported(reason)));
                return;
            }
            WalletPresence::Ready => {}
        }
        self.connect_with(ConnectOptions::silent()).await;
    }

    /// Connect at the user's request. A rejection leaves the session
    /// disconnected; there is no retry.
    pub async fn connect_explicitly(&self) {
        match self.inner.wallet.presence().await {
            WalletPresence::Absent => {
                tracing::warn!("connect requested but no wallet is available");
                self.update(|s| s.notice = Some(Notice::WalletMissing));
                return;
            }
            WalletPresence::Unsupported(reason) => {
                tracing::warn!(%reason, "wallet is not usable");
                self.update(|s| s.notice = Some(Notice::WalletUnsupported(reason)));
                return;
            }
            WalletPresence::Ready => {}
        }
        self.connect_with(ConnectOptions::interactive()).await;
    }

    async fn connect_with(&self, options: ConnectOptions) {
        let started = self.inner.state.send_if_modified(|s| {
            if s.identity.is_some() || s.pending.connect {
                return false;
            }
            s.pending.connect = true;
            true
        });
        if !started {
            tracing::debug!("already connected or connecting");
            return;
        }

        match self.inner.wallet.connect(options).await {
            Ok(pubkey) => {
                let identity = Identity::from(pubkey);
                tracing::info!(%identity, silent = options.only_if_trusted, "wallet connected");
                self.update(|s| {
                    s.pending.connect = false;
                    s.identity = Some(identity);
                    s.notice = None;
                });
                self.refresh_list().await;
            }
            Err(e) => {
                if options.only_if_trusted {
                    tracing::info!(error = %e, "silent reconnect unavailable");
                } else {
                    tracing::warn!(error = %e, "wallet connection rejected");
                }
                self.update(|s| s.pending.connect = false);
            }
        }
    }

    pub fn set_draft(&self, value: impl Into<String>) {
        let value = value.into();
        self.update(|s| s.draft = value);
    }

    pub fn dismiss_notice(&self) {
        self.inner.state.send_if_modified(|s| s.notice.take().is_some());
    }

    /// Replace the record list with the ledger's current contents.
    ///
    /// Only the most recently started fetch may write its result; earlier
    /// fetches that finish later are discarded.
    pub async fn refresh_list(&self) {
        let mut ticket = None;
        self.inner.state.send_if_modified(|s| {
            if s.identity.is_none() {
                return false;
            }
            ticket = Some(self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1);
            s.pending.refresh = true;
            true
        });
        let Some(ticket) = ticket else {
            tracing::debug!("refresh skipped: not connected");
            return;
        };

        let result = self.inner.ledger.fetch_records().await;

        if self.inner.fetch_generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "discarding superseded fetch");
            return;
        }
        let records = match result {
            Ok(records) => {
                tracing::debug!(count = records.len(), "fetched record list");
                RecordList::Loaded(records)
            }
            Err(LedgerError::AccountNotFound) => {
                tracing::info!("base account not initialized");
                RecordList::NoAccount
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch record list");
                RecordList::FetchError(e.to_string())
            }
        };
        self.update(|s| {
            s.pending.refresh = false;
            s.records = records;
        });
    }

    /// Append the draft to the ledger, then re-fetch. An empty draft is a
    /// no-op.
    pub async fn submit_draft(&self) {
        let mut job = None;
        self.inner.state.send_if_modified(|s| {
            if s.draft.is_empty() {
                tracing::debug!("no input");
                return false;
            }
            let Some(identity) = s.identity.clone() else {
                return false;
            };
            if s.pending.submit {
                tracing::debug!("submit already in flight");
                return false;
            }
            s.pending.submit = true;
            job = Some((s.draft.clone(), identity));
            true
        });
        let Some((link, identity)) = job else {
            return;
        };

        tracing::info!(%link, "submitting gif link");
        match self.inner.ledger.append(&link, &identity).await {
            Ok(signature) => {
                tracing::info!(%signature, "gif link stored");
                let clear = self.inner.options.clear_draft_after_submit;
                self.update(|s| {
                    s.pending.submit = false;
                    // Keep anything typed while the append was in flight.
                    if clear && s.draft == link {
                        s.draft.clear();
                    }
                });
                self.refresh_list().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to submit gif link");
                self.update(|s| s.pending.submit = false);
            }
        }
    }

    /// Create the base account, then re-fetch. Failure changes nothing
    /// visible.
    pub async fn initialize_account(&self) {
        let mut caller = None;
        self.inner.state.send_if_modified(|s| {
            if s.pending.initialize {
                return false;
            }
            caller = s.identity.clone();
            if caller.is_none() {
                return false;
            }
            s.pending.initialize = true;
            true
        });
        let Some(identity) = caller else {
            tracing::debug!("initialize skipped");
            return;
        };

        match self.inner.ledger.initialize(&identity).await {
            Ok(signature) => {
                tracing::info!(%signature, "base account initialized");
                self.update(|s| s.pending.initialize = false);
                self.refresh_list().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to initialize base account");
                self.update(|s| s.pending.initialize = false);
            }
        }
    }
}
