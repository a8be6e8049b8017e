use crate::loaders::{Dashboard, Loaded, COORDINATOR_HOST, HOST_STUDENT};
use crate::templates::{card, desktop_layout, metric};
use maud::{html, Markup};

pub fn dashboard_page(vm: &Loaded<Dashboard>, app_id: Option<&str>) -> Markup {
    let d = &vm.data;
    desktop_layout(
        "Dashboard",
        "/sevis-user",
        vm.fallback.as_deref(),
        html! {
            main class="container" {
                h1 { "SEVIS Dashboard" }
                @if let Some(app) = app_id {
                    p class="tenant" { "Program: " code { (app) } }
                }

                @if !d.can_write {
                    p class="read-only" { "Read-only mode: approvals and batch actions are disabled." }
                }

                (card("Change queue", html! {
                    div class="metrics" {
                        (metric("Open requests", d.metrics.total_requests))
                        (metric("Pending items", d.metrics.pending_items))
                        (metric("Pending SEVIS items", d.metrics.pending_sevis))
                        (metric("Ready for batch", d.metrics.sevis_ready))
                    }
                    p { a href="/sevis-user/change-queue" { "Review the change queue" } }
                }))

                (card("Local coordinators", html! {
                    div class="metrics" {
                        (metric("Total", d.coordinators.total))
                        (metric("Active", d.coordinators.active))
                        (metric("In training", d.coordinators.training))
                        (metric("Inactive", d.coordinators.inactive))
                        (metric("Needs region", d.coordinators.unassigned))
                    }
                    @if d.coordinators.unassigned > 0 {
                        p { a href="/sevis-user/local-coordinators?filter=unassigned" { "Assign missing regions" } }
                    }
                }))

                (card("Relationships", html! {
                    @if d.dangling_relationships.is_empty() {
                        p class="relationships-ok" { "Every relationship points at an existing profile." }
                    } @else {
                        p class="dangling" {
                            (d.dangling_relationships.len()) " relationship(s) point at a missing profile: "
                            @for (i, id) in d.dangling_relationships.iter().enumerate() {
                                @if i > 0 { ", " }
                                code { (id) }
                            }
                        }
                    }
                    @if d.can_write {
                        form class="inline" method="post" action="/sevis-user/relationships" {
                            input type="text" name="from_id" placeholder="From profile";
                            input type="text" name="to_id" placeholder="To profile";
                            select name="kind" {
                                option value=(COORDINATOR_HOST) { "Coordinator → host family" }
                                option value=(HOST_STUDENT) { "Host family → student" }
                            }
                            button type="submit" { "Link" }
                        }
                    }
                }))

                (card("Recent SEVIS batches", html! {
                    @if d.recent_batches.is_empty() {
                        p { "No batches yet." }
                    } @else {
                        table {
                            thead { tr { th { "Batch" } th { "Status" } th { "Records" } th { "Succeeded" } th { "Failed" } } }
                            tbody {
                                @for s in &d.recent_batches {
                                    tr {
                                        td { (s.batch.name) }
                                        td { (s.batch.status.as_str()) }
                                        td { (s.participants.len()) }
                                        td { (s.successful) }
                                        td { (s.failed) }
                                    }
                                }
                            }
                        }
                    }
                    p { a href="/sevis-user/sevis-batches" { "All batches" } }
                }))
            }
        },
    )
}
