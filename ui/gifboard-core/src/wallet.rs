//! Wallet connector: brokers the user's identity and signs transactions.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, WalletError};
use crate::keys::{Keypair, Pubkey};

/// Whether a wallet can be used at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletPresence {
    Absent,
    Unsupported(String),
    Ready,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Succeed only if the wallet already trusts this application; never
    /// prompt.
    pub only_if_trusted: bool,
}

impl ConnectOptions {
    pub fn silent() -> Self {
        Self {
            only_if_trusted: true,
        }
    }

    pub fn interactive() -> Self {
        Self {
            only_if_trusted: false,
        }
    }
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn presence(&self) -> WalletPresence;

    async fn connect(&self, options: ConnectOptions) -> Result<Pubkey, WalletError>;

    /// Sign a serialized transaction message with the connected key.
    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], WalletError>;
}

/// Remembers which wallet keys have approved this application.
#[derive(Debug)]
pub struct TrustStore {
    path: PathBuf,
}

#[derive(Default, Serialize, Deserialize)]
struct TrustFile {
    trusted: BTreeSet<Pubkey>,
}

impl TrustStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> TrustFile {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt trust store");
                TrustFile::default()
            }),
            Err(_) => TrustFile::default(),
        }
    }

    pub fn is_trusted(&self, key: &Pubkey) -> bool {
        self.read().trusted.contains(key)
    }

    pub fn trust(&self, key: Pubkey) -> Result<(), WalletError> {
        let mut file = self.read();
        if !file.trusted.insert(key) {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| WalletError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&file).map_err(|e| WalletError::Io(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| WalletError::Io(e.to_string()))
    }
}

fn load_keypair(path: &Path) -> Result<Keypair, WalletError> {
    if !path.exists() {
        return Err(WalletError::NotFound);
    }
    Keypair::read_file(path).map_err(|e| match e {
        KeyError::Io(msg) => WalletError::Io(msg),
        other => WalletError::Unsupported(other.to_string()),
    })
}

/// Load the key and check or record trust. Blocking file I/O.
fn open_wallet(
    path: &Path,
    trust: &TrustStore,
    options: ConnectOptions,
) -> Result<Keypair, WalletError> {
    let keypair = load_keypair(path)?;
    let pubkey = keypair.pubkey();

    if options.only_if_trusted {
        if !trust.is_trusted(&pubkey) {
            return Err(WalletError::NotTrusted);
        }
    } else if let Err(e) = trust.trust(pubkey) {
        // Connecting still succeeds; the next launch just won't be silent.
        tracing::warn!(error = %e, "failed to record wallet trust");
    }
    Ok(keypair)
}

/// A wallet backed by a local keypair file (e.g. the Solana CLI default).
pub struct KeypairWallet {
    keypair_path: PathBuf,
    trust: Arc<TrustStore>,
    connected: Mutex<Option<Keypair>>,
}

impl KeypairWallet {
    pub fn new(keypair_path: impl Into<PathBuf>, trust: TrustStore) -> Self {
        Self {
            keypair_path: keypair_path.into(),
            trust: Arc::new(trust),
            connected: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WalletConnector for KeypairWallet {
    async fn presence(&self) -> WalletPresence {
        let path = self.keypair_path.clone();
        match tokio::task::spawn_blocking(move || load_keypair(&path)).await {
            Ok(Ok(_)) => WalletPresence::Ready,
            Ok(Err(WalletError::NotFound)) => WalletPresence::Absent,
            Ok(Err(e)) => WalletPresence::Unsupported(e.to_string()),
            Err(e) => WalletPresence::Unsupported(format!("wallet task failed: {e}")),
        }
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Pubkey, WalletError> {
        let path = self.keypair_path.clone();
        let trust = self.trust.clone();
        let keypair = tokio::task::spawn_blocking(move || open_wallet(&path, &trust, options))
            .await
            .map_err(|e| WalletError::Io(format!("wallet task failed: {e}")))??;
        let pubkey = keypair.pubkey();

        let mut guard = self
            .connected
            .lock()
            .map_err(|_| WalletError::Io("wallet lock poisoned".into()))?;
        *guard = Some(keypair);
        Ok(pubkey)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], WalletError> {
        let guard = self
            .connected
            .lock()
            .map_err(|_| WalletError::Io("wallet lock poisoned".into()))?;
        let keypair = guard.as_ref().ok_or(WalletError::NotConnected)?;
        Ok(keypair.sign(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_in(dir: &Path) -> (KeypairWallet, Keypair) {
        let kp = Keypair::from_seed(&[6u8; 32]);
        let path = dir.join("id.json");
        std::fs::write(&path, serde_json::to_string(&kp.to_bytes().to_vec()).unwrap()).unwrap();
        let wallet = KeypairWallet::new(path, TrustStore::new(dir.join("trust").join("trusted.json")));
        (wallet, kp)
    }

    #[tokio::test]
    async fn absent_keypair_file() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = KeypairWallet::new(dir.path().join("none.json"), TrustStore::new(dir.path().join("t.json")));
        assert_eq!(wallet.presence().await, WalletPresence::Absent);
        assert_eq!(
            wallet.connect(ConnectOptions::interactive()).await,
            Err(WalletError::NotFound)
        );
    }

    #[tokio::test]
    async fn garbage_keypair_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        std::fs::write(&path, "{\"hello\": 1}").unwrap();
        let wallet = KeypairWallet::new(path, TrustStore::new(dir.path().join("t.json")));
        assert!(matches!(wallet.presence().await, WalletPresence::Unsupported(_)));
    }

    #[tokio::test]
    async fn silent_connect_needs_prior_trust() {
        let dir = tempfile::tempdir().unwrap();
        let (wallet, kp) = wallet_in(dir.path());
        assert_eq!(wallet.presence().await, WalletPresence::Ready);

        assert_eq!(
            wallet.connect(ConnectOptions::silent()).await,
            Err(WalletError::NotTrusted)
        );
        assert_eq!(
            wallet.sign_message(b"msg").await,
            Err(WalletError::NotConnected)
        );

        assert_eq!(wallet.connect(ConnectOptions::interactive()).await, Ok(kp.pubkey()));

        // A fresh wallet over the same files reconnects silently.
        let (again, _) = wallet_in(dir.path());
        assert_eq!(again.connect(ConnectOptions::silent()).await, Ok(kp.pubkey()));
        assert_eq!(again.sign_message(b"msg").await, Ok(kp.sign(b"msg")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connects_from_a_spawned_task() {
        let dir = tempfile::tempdir().unwrap();
        let (wallet, kp) = wallet_in(dir.path());
        let wallet = Arc::new(wallet);

        let task = tokio::spawn({
            let wallet = wallet.clone();
            async move {
                let presence = wallet.presence().await;
                (presence, wallet.connect(ConnectOptions::interactive()).await)
            }
        });
        assert_eq!(task.await.unwrap(), (WalletPresence::Ready, Ok(kp.pubkey())));
        assert!(dir.path().join("trust").join("trusted.json").exists());
        assert_eq!(wallet.sign_message(b"msg").await, Ok(kp.sign(b"msg")));
    }

    #[test]
    fn trust_store_survives_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trusted.json");
        std::fs::write(&path, "not json").unwrap();
        let store = TrustStore::new(&path);
        let key = Pubkey::new([1; 32]);
        assert!(!store.is_trusted(&key));
        store.trust(key).unwrap();
        assert!(store.is_trusted(&key));
    }
}
