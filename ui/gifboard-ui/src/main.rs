#![allow(non_snake_case)]

mod components;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dioxus::prelude::*;
use tracing_subscriber::EnvFilter;

use gifboard_core::session::SessionOptions;
use gifboard_core::wallet::TrustStore;
use gifboard_core::{render, KeypairWallet, ProgramLedger, Screen, Session, Settings, ViewState};

const STYLE: &str = include_str!("../assets/style.css");

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gifboard_core=debug,gifboard=debug")),
        )
        .init();

    // Optional first argument: path to config.toml
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("loading settings")?;
    let config = Arc::new(settings.resolve().context("resolving configuration")?);
    tracing::info!(
        rpc_url = %config.rpc_url,
        program_id = %config.program_id,
        base_account = %config.base_account.pubkey(),
        "starting"
    );

    let wallet = Arc::new(KeypairWallet::new(
        config.wallet_keypair.clone(),
        TrustStore::new(config.trust_store.clone()),
    ));
    let ledger = Arc::new(ProgramLedger::new(config.clone(), wallet.clone()));
    let session = Session::new(SessionOptions::from(config.as_ref()), wallet, ledger);

    dioxus::LaunchBuilder::new().with_context(session).launch(App);
    Ok(())
}

#[component]
fn App() -> Element {
    let session = use_context::<Session>();
    let view = state::use_view_state(session.clone());
    use_context_provider(|| view);
    state::use_session_actions(session.clone());

    // Reconnect to a previously trusted wallet once, on mount.
    use_hook(move || {
        spawn(async move {
            session.attempt_silent_connect().await;
        })
    });

    let snapshot: ViewState = view.read().clone();
    let connected = snapshot.identity.is_some();

    rsx! {
        document::Style { {STYLE} }
        div { class: "App",
            div { class: if connected { "authed-container" } else { "container" },
                div { class: "header-container",
                    components::layout::Header {}
                    components::notice::NoticeBanner {}
                    match render(&snapshot) {
                        Screen::Connect { busy } => rsx! {
                            components::connect::ConnectButton { busy }
                        },
                        Screen::Loading => rsx! {
                            p { class: "sub-text", "Fetching GIF list..." }
                        },
                        Screen::InitializeAccount { busy } => rsx! {
                            components::account::InitializeAccount { busy }
                        },
                        Screen::Retry { reason, busy } => rsx! {
                            components::account::RetryFetch { reason, busy }
                        },
                        Screen::Board { draft, submit_enabled, submitting, links } => rsx! {
                            components::board::GifBoard { draft, submit_enabled, submitting, links }
                        },
                    }
                }
                components::layout::Footer {}
            }
        }
    }
}
