use crate::templates::components::fallback_banner;
use maud::{html, Markup, DOCTYPE};

const NAV: &[(&str, &str)] = &[
    ("/sevis-user", "Dashboard"),
    ("/sevis-user/change-queue", "Change Queue"),
    ("/sevis-user/local-coordinators", "Local Coordinators"),
    ("/sevis-user/sevis-batches", "SEVIS Batches"),
];

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2937; }
header { display: flex; align-items: center; gap: 2rem; padding: 0.75rem 1.5rem; box-shadow: 0 1px 3px #0002; }
header nav ul { display: flex; gap: 1rem; list-style: none; margin: 0; padding: 0; }
header nav a.active { font-weight: 600; text-decoration: underline; }
main.container { max-width: 1200px; margin: 1.5rem auto; padding: 0 1rem; }
.card { border: 1px solid #e5e7eb; border-radius: 8px; padding: 1rem; margin-bottom: 1.5rem; }
.metrics { display: flex; gap: 1rem; flex-wrap: wrap; }
.metric { border: 1px solid #e5e7eb; border-radius: 8px; padding: 0.75rem 1rem; min-width: 140px; }
.metric strong { display: block; font-size: 1.5rem; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 8px; border-bottom: 1px solid #f3f4f6; text-align: left; vertical-align: top; }
th { border-bottom: 2px solid #e5e7eb; }
.badge { padding: 2px 8px; border-radius: 999px; font-size: 0.8em; background: #f3f4f6; }
.badge.ok { background: #d1fae5; } .badge.warn { background: #fef3c7; } .badge.bad { background: #fee2e2; }
.fallback-banner { background: #fef3c7; border-bottom: 1px solid #f59e0b; padding: 0.5rem 1.5rem; font-size: 0.9em; }
form.inline { display: inline-flex; gap: 6px; align-items: center; margin: 0; }
"#;

pub fn desktop_layout(title: &str, active: &str, fallback: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " | Exchange Admin" }
                style { (maud::PreEscaped(STYLE)) }
            }
            body {
                header {
                    h3 { "Exchange Admin" }
                    nav {
                        ul {
                            @for (href, label) in NAV {
                                li { a href=(href) class=[(*href == active).then_some("active")] { (label) } }
                            }
                        }
                    }
                }
                @if let Some(reason) = fallback {
                    (fallback_banner(reason))
                }
                (content)
            }
        }
    }
}
