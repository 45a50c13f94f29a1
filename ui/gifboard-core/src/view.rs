//! Pure derivation of what the front end shows for a given [`ViewState`].

use crate::session::{Phase, ViewState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Wallet not connected.
    Connect { busy: bool },
    /// Connected, first fetch not back yet.
    Loading,
    /// Connected, base account missing.
    InitializeAccount { busy: bool },
    /// Connected, last fetch failed.
    Retry { reason: String, busy: bool },
    /// Input box, submit control and the stored links in ledger order.
    Board {
        draft: String,
        submit_enabled: bool,
        submitting: bool,
        links: Vec<String>,
    },
}

pub fn render(state: &ViewState) -> Screen {
    match state.phase() {
        Phase::Disconnected => Screen::Connect {
            busy: state.pending.connect,
        },
        Phase::Connecting => Screen::Loading,
        Phase::ConnectedNoAccount => Screen::InitializeAccount {
            busy: state.pending.initialize,
        },
        Phase::ConnectedFetchError => Screen::Retry {
            reason: state.records.fetch_error().unwrap_or_default().to_string(),
            busy: state.pending.refresh,
        },
        Phase::ConnectedWithList => Screen::Board {
            draft: state.draft.clone(),
            submit_enabled: !state.pending.submit && !state.draft.is_empty(),
            submitting: state.pending.submit,
            links: state
                .records
                .records()
                .unwrap_or_default()
                .iter()
                .map(|r| r.gif_link.clone())
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Pubkey;
    use crate::program::Record;
    use crate::session::{Identity, Pending, RecordList};

    fn connected(records: RecordList) -> ViewState {
        ViewState {
            identity: Some(Identity::new("Ab12...")),
            records,
            ..ViewState::default()
        }
    }

    #[test]
    fn disconnected_shows_connect_only() {
        assert_eq!(render(&ViewState::default()), Screen::Connect { busy: false });

        let connecting = ViewState {
            pending: Pending {
                connect: true,
                ..Pending::default()
            },
            ..ViewState::default()
        };
        assert_eq!(render(&connecting), Screen::Connect { busy: true });
    }

    #[test]
    fn missing_account_shows_initialize_only() {
        assert_eq!(
            render(&connected(RecordList::NoAccount)),
            Screen::InitializeAccount { busy: false }
        );
    }

    #[test]
    fn fetch_error_offers_retry() {
        assert_eq!(
            render(&connected(RecordList::FetchError("timeout".into()))),
            Screen::Retry {
                reason: "timeout".into(),
                busy: false
            }
        );
    }

    #[test]
    fn first_fetch_pending_is_loading() {
        assert_eq!(render(&connected(RecordList::Unloaded)), Screen::Loading);
    }

    #[test]
    fn list_shows_input_submit_and_links() {
        let state = connected(RecordList::Loaded(vec![Record {
            gif_link: "https://x/a.gif".into(),
            user_address: Pubkey::default(),
        }]));
        assert_eq!(
            render(&state),
            Screen::Board {
                draft: String::new(),
                submit_enabled: false,
                submitting: false,
                links: vec!["https://x/a.gif".into()],
            }
        );
    }

    #[test]
    fn submit_disabled_while_in_flight() {
        let mut state = connected(RecordList::Loaded(vec![]));
        state.draft = "not even a url".into();
        assert!(matches!(render(&state), Screen::Board { submit_enabled: true, .. }));

        state.pending.submit = true;
        assert!(matches!(
            render(&state),
            Screen::Board {
                submit_enabled: false,
                submitting: true,
                ..
            }
        ));
    }
}
