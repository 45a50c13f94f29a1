use dioxus::prelude::*;

use crate::state::Action;

/// Shown when the program's base account does not exist yet.
#[component]
pub fn InitializeAccount(busy: bool) -> Element {
    let actions = use_coroutine_handle::<Action>();
    let initialize = move |_| actions.send(Action::Initialize);

    rsx! {
        div { class: "connected-container",
            button {
                class: "cta-button submit-gif-button",
                disabled: busy,
                onclick: initialize,
                if busy {
                    "Initializing..."
                } else {
                    "Do One-Time Initialization For GIF Program Account"
                }
            }
        }
    }
}

/// Shown when the last fetch failed for a reason other than a missing
/// account.
#[component]
pub fn RetryFetch(reason: String, busy: bool) -> Element {
    let actions = use_coroutine_handle::<Action>();
    let retry = move |_| actions.send(Action::Refresh);

    rsx! {
        div { class: "connected-container",
            p { class: "error-text", "Could not load GIFs: {reason}" }
            button {
                class: "cta-button submit-gif-button",
                disabled: busy,
                onclick: retry,
                if busy { "Retrying..." } else { "Retry" }
            }
        }
    }
}
