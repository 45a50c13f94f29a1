use dioxus::prelude::*;

use gifboard_core::ViewState;

const TWITTER_HANDLE: &str = "0xqueso";
const TWITTER_LOGO: &str = include_str!("../../assets/twitter-logo.svg");

#[component]
pub fn Header() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let identity = view.read().identity.as_ref().map(|id| id.short());

    rsx! {
        p { class: "header", "🖼 InstareGif" }
        p { class: "sub-text", "Connect to view Gifs ✨" }
        if let Some(identity) = identity {
            p { class: "wallet-text", title: "Connected wallet", "Connected as {identity}" }
        }
    }
}

#[component]
pub fn Footer() -> Element {
    let link = format!("https://twitter.com/{TWITTER_HANDLE}");
    rsx! {
        div { class: "footer-container",
            span { class: "twitter-logo", dangerous_inner_html: TWITTER_LOGO }
            a {
                class: "footer-text",
                href: "{link}",
                target: "_blank",
                rel: "noreferrer",
                "built by @{TWITTER_HANDLE}"
            }
        }
    }
}
