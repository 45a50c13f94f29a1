//! Remote ledger: the program's base account and its read/write operations.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::LedgerError;
use crate::keys::Pubkey;
use crate::program::{self, BaseAccount, Record};
use crate::rpc::RpcClient;
use crate::session::Identity;
use crate::transaction::{Instruction, Message, Transaction};
use crate::wallet::WalletConnector;

#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Current record list, in stored order.
    ///
    /// Returns [`LedgerError::AccountNotFound`] when the base account has not
    /// been created yet.
    async fn fetch_records(&self) -> Result<Vec<Record>, LedgerError>;

    /// Create the base account. Fails remotely if it already exists.
    async fn initialize(&self, caller: &Identity) -> Result<String, LedgerError>;

    /// Append `link`. Returns the transaction signature.
    async fn append(&self, link: &str, caller: &Identity) -> Result<String, LedgerError>;
}

/// [`RemoteLedger`] over JSON-RPC, signing with the connected wallet.
pub struct ProgramLedger {
    config: Arc<AppConfig>,
    rpc: RpcClient,
    wallet: Arc<dyn WalletConnector>,
}

impl ProgramLedger {
    pub fn new(config: Arc<AppConfig>, wallet: Arc<dyn WalletConnector>) -> Self {
        let rpc = RpcClient::new(config.rpc_url.clone(), config.commitment);
        Self {
            config,
            rpc,
            wallet,
        }
    }

    pub fn base_account(&self) -> Pubkey {
        self.config.base_account.pubkey()
    }

    /// Build, sign, send and confirm a transaction paid for by `payer`.
    async fn submit(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
        sign_with_base: bool,
    ) -> Result<String, LedgerError> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let message =
            Message::compile(payer, instructions, &blockhash).map_err(LedgerError::Transaction)?;
        let mut tx = Transaction::new(message);
        let bytes = tx.message_bytes();

        if sign_with_base {
            let base = &self.config.base_account;
            tx.sign(&base.pubkey(), base.sign(&bytes))
                .map_err(LedgerError::Transaction)?;
        }
        let signature = self.wallet.sign_message(&bytes).await?;
        tx.sign(payer, signature).map_err(LedgerError::Transaction)?;

        let expected = tx.signature_base58();
        let encoded = tx.to_base64().map_err(LedgerError::Transaction)?;
        let sig = self.rpc.send_transaction(&encoded).await?;
        if expected.as_deref() != Some(sig.as_str()) {
            tracing::warn!(signature = %sig, ?expected, "node returned an unexpected signature");
        }
        tracing::debug!(signature = %sig, "transaction sent");

        self.confirm(&sig).await?;
        Ok(sig)
    }

    async fn confirm(&self, signature: &str) -> Result<(), LedgerError> {
        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            if let Some(status) = self.rpc.get_signature_status(signature).await? {
                if let Some(err) = status.err {
                    return Err(LedgerError::Failed(err));
                }
                if status
                    .confirmation
                    .is_some_and(|level| level >= self.config.commitment)
                {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout(signature.to_string()));
            }
            tokio::time::sleep(self.config.confirm_poll_interval).await;
        }
    }
}

#[async_trait]
impl RemoteLedger for ProgramLedger {
    async fn fetch_records(&self) -> Result<Vec<Record>, LedgerError> {
        let account = self
            .rpc
            .get_account(&self.base_account())
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        tracing::debug!(lamports = account.lamports, bytes = account.data.len(), "read base account");
        if account.owner != self.config.program_id {
            return Err(LedgerError::Decode(format!(
                "base account is owned by {}, not the program",
                account.owner
            )));
        }
        let decoded = BaseAccount::decode(&account.data).map_err(LedgerError::Decode)?;
        Ok(decoded.gif_list)
    }

    async fn initialize(&self, caller: &Identity) -> Result<String, LedgerError> {
        let user = caller.pubkey()?;
        let ix = program::start_stuff_off(&self.config.program_id, &self.base_account(), &user);
        let sig = self.submit(&user, &[ix], true).await?;
        tracing::info!(base_account = %self.base_account(), "created base account");
        Ok(sig)
    }

    async fn append(&self, link: &str, caller: &Identity) -> Result<String, LedgerError> {
        let user = caller.pubkey()?;
        let ix = program::add_gif(&self.config.program_id, &self.base_account(), link);
        self.submit(&user, &[ix], false).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    use super::*;
    use crate::config::Commitment;
    use crate::error::WalletError;
    use crate::keys::Keypair;
    use crate::wallet::{ConnectOptions, WalletPresence};

    struct LocalSigner(Keypair);

    #[async_trait]
    impl WalletConnector for LocalSigner {
        async fn presence(&self) -> WalletPresence {
            WalletPresence::Ready
        }

        async fn connect(&self, _: ConnectOptions) -> Result<Pubkey, WalletError> {
            Ok(self.0.pubkey())
        }

        async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], WalletError> {
            Ok(self.0.sign(message))
        }
    }

    fn config(server: &ServerGuard, program_id: Pubkey) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            rpc_url: server.url(),
            commitment: Commitment::Processed,
            program_id,
            base_account: Keypair::from_seed(&[1; 32]),
            wallet_keypair: "unused".into(),
            trust_store: "unused".into(),
            clear_draft_after_submit: true,
            confirm_timeout: Duration::from_millis(50),
            confirm_poll_interval: Duration::from_millis(10),
        })
    }

    fn ledger(server: &ServerGuard, program_id: Pubkey) -> (ProgramLedger, Identity) {
        let user = Keypair::from_seed(&[2; 32]);
        let identity = Identity::from(user.pubkey());
        let ledger = ProgramLedger::new(config(server, program_id), Arc::new(LocalSigner(user)));
        (ledger, identity)
    }

    fn account_body(owner: Pubkey, data: &[u8]) -> String {
        json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 1 }, "value": {
                "data": [STANDARD.encode(data), "base64"],
                "lamports": 1, "owner": owner.to_string(), "executable": false
            }}
        })
        .to_string()
    }

    async fn mock_method(server: &mut ServerGuard, method: &str, body: &str) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn fetch_distinguishes_missing_account() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getAccountInfo",
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":null}}"#,
        )
        .await;
        let (ledger, _) = ledger(&server, Pubkey::new([9; 32]));
        assert_eq!(ledger.fetch_records().await, Err(LedgerError::AccountNotFound));
    }

    #[tokio::test]
    async fn fetch_decodes_records_in_order() {
        let mut server = Server::new_async().await;
        let program_id = Pubkey::new([9; 32]);
        let records = vec![
            Record { gif_link: "https://x/a.gif".into(), user_address: Pubkey::new([3; 32]) },
            Record { gif_link: "https://x/b.gif".into(), user_address: Pubkey::new([4; 32]) },
        ];
        let data = BaseAccount { total_gifs: 2, gif_list: records.clone() }.encode();
        mock_method(&mut server, "getAccountInfo", &account_body(program_id, &data)).await;

        let (ledger, _) = ledger(&server, program_id);
        assert_eq!(ledger.fetch_records().await.unwrap(), records);
    }

    #[tokio::test]
    async fn fetch_rejects_foreign_owner() {
        let mut server = Server::new_async().await;
        let data = BaseAccount { total_gifs: 0, gif_list: vec![] }.encode();
        mock_method(&mut server, "getAccountInfo", &account_body(Pubkey::new([5; 32]), &data)).await;

        let (ledger, _) = ledger(&server, Pubkey::new([9; 32]));
        assert!(matches!(ledger.fetch_records().await, Err(LedgerError::Decode(_))));
    }

    #[tokio::test]
    async fn append_sends_and_confirms() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getLatestBlockhash",
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":{"blockhash":"11111111111111111111111111111111","lastValidBlockHeight":10}}}"#,
        )
        .await;
        let send = mock_method(&mut server, "sendTransaction", r#"{"jsonrpc":"2.0","id":2,"result":"5ig"}"#).await;
        mock_method(
            &mut server,
            "getSignatureStatuses",
            r#"{"jsonrpc":"2.0","id":3,"result":{"context":{"slot":2},"value":[{"slot":2,"confirmations":0,"err":null,"confirmationStatus":"processed"}]}}"#,
        )
        .await;

        let (ledger, identity) = ledger(&server, Pubkey::new([9; 32]));
        let sig = ledger.append("https://x/b.gif", &identity).await.unwrap();
        assert_eq!(sig, "5ig");
        send.assert_async().await;
    }

    #[tokio::test]
    async fn unconfirmed_transaction_times_out() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getLatestBlockhash",
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":{"blockhash":"11111111111111111111111111111111","lastValidBlockHeight":10}}}"#,
        )
        .await;
        mock_method(&mut server, "sendTransaction", r#"{"jsonrpc":"2.0","id":2,"result":"5ig"}"#).await;
        mock_method(
            &mut server,
            "getSignatureStatuses",
            r#"{"jsonrpc":"2.0","id":3,"result":{"context":{"slot":2},"value":[null]}}"#,
        )
        .await;

        let (ledger, identity) = ledger(&server, Pubkey::new([9; 32]));
        assert_eq!(
            ledger.initialize(&identity).await,
            Err(LedgerError::ConfirmationTimeout("5ig".into()))
        );
    }

    #[tokio::test]
    async fn invalid_identity_never_reaches_rpc() {
        let server = Server::new_async().await;
        let (ledger, _) = ledger(&server, Pubkey::new([9; 32]));
        let bogus = Identity::new("not a key");
        assert!(matches!(
            ledger.append("https://x/a.gif", &bogus).await,
            Err(LedgerError::Identity(_))
        ));
    }
}
