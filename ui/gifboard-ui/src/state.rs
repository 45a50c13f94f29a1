//! Bridges session state into Dioxus signals, and session operations back.

use dioxus::prelude::*;
use futures_util::StreamExt;

use gifboard_core::{Session, ViewState};

/// A signal that mirrors the session's state, updated on every change.
pub fn use_view_state(session: Session) -> Signal<ViewState> {
    let mut view = use_signal(|| session.snapshot());

    use_future(move || {
        let session = session.clone();
        async move {
            let mut rx = session.subscribe();
            view.set(rx.borrow_and_update().clone());
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                view.set(next);
            }
        }
    });

    view
}

/// Session operations a component can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Connect,
    Refresh,
    Submit,
    Initialize,
}

/// Runs requested operations in the calling component's scope, so they
/// outlive the button that asked for them. Children reach it through
/// `use_coroutine_handle::<Action>()`.
pub fn use_session_actions(session: Session) -> Coroutine<Action> {
    use_coroutine(move |mut rx: UnboundedReceiver<Action>| {
        let session = session.clone();
        async move {
            while let Some(action) = rx.next().await {
                tracing::debug!(?action, "dispatching");
                let session = session.clone();
                spawn(async move {
                    match action {
                        Action::Connect => session.connect_explicitly().await,
                        Action::Refresh => session.refresh_list().await,
                        Action::Submit => session.submit_draft().await,
                        Action::Initialize => session.initialize_account().await,
                    }
                });
            }
        }
    })
}
