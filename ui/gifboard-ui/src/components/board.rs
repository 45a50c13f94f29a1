use dioxus::prelude::*;

use gifboard_core::Session;

use crate::state::Action;

#[component]
pub fn GifBoard(
    draft: String,
    submit_enabled: bool,
    submitting: bool,
    links: Vec<String>,
) -> Element {
    let session = use_context::<Session>();
    let actions = use_coroutine_handle::<Action>();

    let on_input = move |e: FormEvent| session.set_draft(e.value());
    let submit = move |_| actions.send(Action::Submit);

    rsx! {
        div { class: "connected-container",
            input {
                r#type: "text",
                placeholder: "Enter gif link!",
                value: "{draft}",
                oninput: on_input,
            }
            button {
                class: "cta-button submit-gif-button",
                disabled: !submit_enabled,
                onclick: submit,
                if submitting { "Submitting..." } else { "Submit" }
            }
            div { class: "gif-grid",
                for (index, link) in links.iter().enumerate() {
                    div { class: "gif-item", key: "{index}",
                        img { src: "{link}" }
                    }
                }
            }
        }
    }
}
