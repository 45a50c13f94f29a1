//! Application settings and the immutable runtime configuration built from
//! them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys::{Keypair, Pubkey};

pub const CONFIG_ENV: &str = "GIFBOARD_CONFIG";
pub const RPC_URL_ENV: &str = "GIFBOARD_RPC_URL";
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

const APP_DIR: &str = "gifboard";

/// Commitment level used for preflight and confirmation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Self::Processed),
            "confirmed" => Some(Self::Confirmed),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }
}

/// On-disk settings (`config.toml`). Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rpc_url: String,
    pub commitment: Commitment,
    pub program_id: Option<String>,
    pub base_account_keypair: PathBuf,
    pub wallet_keypair: PathBuf,
    pub trust_store: PathBuf,
    pub clear_draft_after_submit: bool,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_default();
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: Commitment::Processed,
            program_id: None,
            base_account_keypair: PathBuf::from("keypair.json"),
            wallet_keypair: home.join(".config").join("solana").join("id.json"),
            trust_store: app_dir().join("trusted.json"),
            clear_draft_after_submit: true,
            confirm_timeout_secs: 30,
            confirm_poll_interval_ms: 500,
        }
    }
}

impl Settings {
    /// Load from `path`, else `$GIFBOARD_CONFIG`, else the per-user config
    /// file. Only an explicitly named file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut settings = match explicit {
            Some(p) => Self::read(&p)?,
            None => {
                let p = default_config_path();
                if p.exists() {
                    Self::read(&p)?
                } else {
                    tracing::debug!(path = %p.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            settings.rpc_url = url;
        }
        Ok(settings)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // Relative keypair paths are relative to the config file.
        if let Some(dir) = path.parent() {
            if settings.base_account_keypair.is_relative() {
                settings.base_account_keypair = dir.join(&settings.base_account_keypair);
            }
        }
        tracing::info!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    /// Parse the program id and load the base account keypair.
    pub fn resolve(self) -> Result<AppConfig, ConfigError> {
        let program_id = self
            .program_id
            .as_deref()
            .ok_or(ConfigError::MissingProgramId)?
            .parse::<Pubkey>()
            .map_err(ConfigError::InvalidProgramId)?;
        let base_account =
            Keypair::read_file(&self.base_account_keypair).map_err(|source| {
                ConfigError::BaseAccount {
                    path: self.base_account_keypair.clone(),
                    source,
                }
            })?;
        Ok(AppConfig {
            rpc_url: self.rpc_url,
            commitment: self.commitment,
            program_id,
            base_account,
            wallet_keypair: self.wallet_keypair,
            trust_store: self.trust_store,
            clear_draft_after_submit: self.clear_draft_after_submit,
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
            confirm_poll_interval: Duration::from_millis(self.confirm_poll_interval_ms),
        })
    }
}

/// Runtime configuration. Built once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: String,
    pub commitment: Commitment,
    pub program_id: Pubkey,
    pub base_account: Keypair,
    pub wallet_keypair: PathBuf,
    pub trust_store: PathBuf,
    pub clear_draft_after_submit: bool,
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
}

pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_base_account(dir: &Path) -> Keypair {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let json = serde_json::to_string(&kp.to_bytes().to_vec()).unwrap();
        std::fs::write(dir.join("keypair.json"), json).unwrap();
        kp
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(r#"rpc_url = "http://localhost:8899""#).unwrap();
        assert_eq!(settings.rpc_url, "http://localhost:8899");
        assert_eq!(settings.commitment, Commitment::Processed);
        assert!(settings.clear_draft_after_submit);
        assert_eq!(settings.confirm_timeout_secs, 30);
        assert!(settings.program_id.is_none());
    }

    #[test]
    fn commitment_names() {
        let settings: Settings = toml::from_str(r#"commitment = "finalized""#).unwrap();
        assert_eq!(settings.commitment, Commitment::Finalized);
        assert_eq!(Commitment::parse("confirmed"), Some(Commitment::Confirmed));
        assert_eq!(Commitment::parse("recent"), None);
        assert!(Commitment::Processed < Commitment::Finalized);
    }

    #[test]
    fn read_resolves_relative_keypair_and_builds_config() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_base_account(dir.path());
        let program = Pubkey::new([2u8; 32]);
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "program_id = \"{program}\"\nclear_draft_after_submit = false\nconfirm_poll_interval_ms = 50\n"
            ),
        )
        .unwrap();

        let config = Settings::read(&path).unwrap().resolve().unwrap();
        assert_eq!(config.program_id, program);
        assert_eq!(config.base_account.pubkey(), base.pubkey());
        assert!(!config.clear_draft_after_submit);
        assert_eq!(config.confirm_poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn resolve_requires_program_id() {
        let err = Settings::default().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingProgramId));

        let settings = Settings {
            program_id: Some("not-a-key".into()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.resolve().unwrap_err(),
            ConfigError::InvalidProgramId(_)
        ));
    }

    #[test]
    fn resolve_reports_missing_base_account() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            program_id: Some(Pubkey::new([1u8; 32]).to_string()),
            base_account_keypair: dir.path().join("missing.json"),
            ..Settings::default()
        };
        assert!(matches!(
            settings.resolve().unwrap_err(),
            ConfigError::BaseAccount { .. }
        ));
    }

    #[test]
    fn unreadable_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
