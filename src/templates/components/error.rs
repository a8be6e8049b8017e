use maud::{html, Markup, DOCTYPE};

/// Basic standalone error page
pub fn error_page(status: u16, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Error " (status) }
                style {
                    "body { font-family: system-ui, sans-serif; max-width: 720px; margin: 4rem auto; padding: 1rem; }"
                    "p { font-size: 1.1rem; color: #444; }"
                }
            }
            body {
                h1 { "Error " (status) }
                p class="error-message" { (message) }
                p { a href="/sevis-user" { "← Back to dashboard" } }
            }
        }
    }
}
