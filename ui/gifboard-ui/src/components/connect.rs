use dioxus::prelude::*;

use crate::state::Action;

#[component]
pub fn ConnectButton(busy: bool) -> Element {
    let actions = use_coroutine_handle::<Action>();
    let connect = move |_| actions.send(Action::Connect);

    rsx! {
        button {
            class: "cta-button connect-wallet-button",
            disabled: busy,
            onclick: connect,
            if busy { "Connecting..." } else { "Connect to Wallet" }
        }
    }
}
