use crate::domain::sevis::{BatchStatus, BatchSummary, ParticipantResult};
use crate::templates::components::badge;
use crate::templates::{card, desktop_layout};
use maud::{html, Markup};

fn result_badge(result: ParticipantResult) -> Markup {
    let tone = match result {
        ParticipantResult::Success => "ok",
        ParticipantResult::Pending => "warn",
        ParticipantResult::Failed => "bad",
    };
    badge(result.as_str(), tone)
}

fn batch_card(s: &BatchSummary, can_write: bool) -> Markup {
    let b = &s.batch;
    html! {
        section class="card batch" data-batch=(b.id) {
            h3 { (b.name) " " (badge(b.status.as_str(), "")) }
            p {
                "Created " (b.created_at.format("%Y-%m-%d %H:%M"))
                @if let Some(at) = b.submitted_at { ", submitted " (at.format("%Y-%m-%d %H:%M")) }
            }
            p class="counts" {
                span class="successful" { (s.successful) } " succeeded, "
                span class="failed" { (s.failed) } " failed, "
                span class="pending" { (s.pending) } " pending"
            }
            @if s.counts_drifted() {
                p class="drift" {
                    "Stored totals (" (b.successful_records) " / " (b.failed_records)
                    ") differ from participant results."
                }
            }
            p {
                a href=(format!("/sevis-user/sevis-batches/{}/export", b.id)) { "Export" }
                @if can_write && b.status == BatchStatus::Draft {
                    " "
                    form class="inline" method="post" action=(format!("/sevis-user/sevis-batches/{}/submit", b.id)) {
                        button type="submit" { "Submit to SEVIS" }
                    }
                }
            }
            @if !s.participants.is_empty() {
                table {
                    thead { tr { th { "Student" } th { "Change item" } th { "Result" } th { "Message" } } }
                    tbody {
                        @for p in &s.participants {
                            tr class="participant" {
                                td { a href=(format!("/sevis-user/student-application/{}", p.student_id)) { (p.student_id) } }
                                td { (p.item_id) }
                                td { (result_badge(p.result)) }
                                td { (p.message.as_deref().unwrap_or("")) }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn sevis_batches_page(batches: &[BatchSummary], sevis_ready: usize, fallback: Option<&str>, can_write: bool) -> Markup {
    desktop_layout(
        "SEVIS Batches",
        "/sevis-user/sevis-batches",
        fallback,
        html! {
            main class="container" {
                h1 { "SEVIS Batches" }

                @if can_write {
                    (card("New batch", html! {
                        p { (sevis_ready) " approved SEVIS changes are waiting for a batch." }
                        form class="inline" method="post" action="/sevis-user/sevis-batches" {
                            input type="text" name="name" placeholder="Batch name (optional)";
                            button type="submit" disabled[sevis_ready == 0] { "Create batch" }
                        }
                    }))
                }

                @if batches.is_empty() {
                    p class="empty" { "No SEVIS batches yet." }
                }
                @for s in batches {
                    (batch_card(s, can_write))
                }
            }
        },
    )
}
