use crate::domain::field_path::{display_value, resolve_or, EMPTY_VALUE};
use crate::domain::profile::ProfileData;
use crate::loaders::{Loaded, StudentApplication};
use crate::templates::components::badge;
use crate::templates::{card, desktop_layout};
use maud::{html, Markup};
use serde_json::Value;

fn profile_summary(data: Option<&ProfileData>) -> Markup {
    let Some(s) = data.and_then(ProfileData::as_student) else {
        return html! { p { "No student profile on file." } };
    };
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| EMPTY_VALUE.to_string());
    html! {
        dl class="profile" {
            dt { "Name" } dd { (s.first_name) " " (s.last_name) }
            dt { "Birth date" } dd { (field(&s.birth_date)) }
            dt { "Country" } dd { (field(&s.country)) }
            dt { "Program" } dd { (field(&s.program)) }
            dt { "School" } dd { (field(&s.school)) }
            dt { "Address" } dd { (field(&s.address)) }
            dt { "SEVIS ID" } dd { (field(&s.sevis_id)) }
            dt { "Application" } dd { (field(&s.application_status)) }
        }
    }
}

pub fn student_application_page(vm: &Loaded<StudentApplication>) -> Markup {
    let app = &vm.data;
    desktop_layout(
        &format!("Application: {}", app.user.name),
        "",
        vm.fallback.as_deref(),
        html! {
            main class="container" {
                h1 { (app.user.name) }
                p { (app.user.email) }
                @if let Some(host) = &app.host_family {
                    p { "Placed with host family " strong { (host) } }
                }

                (card("Profile", profile_summary(app.profile.as_ref().map(|p| &p.data))))

                (card("Proposed changes", html! {
                    @if app.requests.is_empty() {
                        p class="empty" { "No change requests for this student." }
                    } @else {
                        table id="diff" {
                            thead {
                                tr { th { "Request" } th { "Field" } th { "On record" } th { "Was" } th { "Proposed" } th { "Status" } }
                            }
                            tbody {
                                @for req in &app.requests {
                                    @for item in &req.items {
                                        tr class="diff-row" {
                                            td { (req.id) }
                                            td { code { (item.field_path) } }
                                            td class="current" { (display_value(&resolve_or(&app.record, &item.field_path, Value::Null))) }
                                            td { (display_value(&item.previous_value)) }
                                            td class="proposed" { (display_value(&item.new_value)) }
                                            td { (badge(item.status.as_str(), "")) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }))
            }
        },
    )
}
