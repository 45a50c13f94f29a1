use dioxus::prelude::*;

use gifboard_core::{Session, ViewState};

#[component]
pub fn NoticeBanner() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let session = use_context::<Session>();

    let Some(notice) = view.read().notice.clone() else {
        return rsx! {};
    };

    rsx! {
        div { class: "notice",
            span { "{notice}" }
            button {
                class: "notice-dismiss",
                onclick: move |_| session.dismiss_notice(),
                "×"
            }
        }
    }
}
