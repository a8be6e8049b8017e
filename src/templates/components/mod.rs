use maud::{html, Markup};

pub mod error;

pub use error::error_page;

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        section class="card" {
            h3 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

pub fn metric(label: &str, value: usize) -> Markup {
    html! {
        div class="metric" {
            strong { (value) }
            span { (label) }
        }
    }
}

/// Colored pill. `tone` is one of `ok`, `warn`, `bad` or empty.
pub fn badge(text: &str, tone: &str) -> Markup {
    html! {
        span class=(format!("badge {tone}")) { (text) }
    }
}

pub fn fallback_banner(reason: &str) -> Markup {
    html! {
        div class="fallback-banner" role="status" title=(reason) {
            "Showing sample data: the database could not be reached."
        }
    }
}
