use crate::domain::change::{ChangeItem, ChangeRequest, ItemStatus, RecordType, RequestStatus};
use crate::domain::field_path::display_value;
use crate::domain::queue::{ChangeRow, QueueSort, QueueView};
use crate::templates::components::badge;
use crate::templates::{card, desktop_layout, metric};
use maud::{html, Markup};

fn status_tone(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::FullyApproved => "ok",
        RequestStatus::PartiallyApproved | RequestStatus::Pending => "warn",
        RequestStatus::Rejected | RequestStatus::Cancelled => "bad",
    }
}

fn item_tone(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Approved => "ok",
        ItemStatus::Pending => "warn",
        ItemStatus::Rejected => "bad",
    }
}

fn filters(view: &QueueView) -> Markup {
    let q = &view.query;
    html! {
        form class="filters" method="get" action="/sevis-user/change-queue" {
            select name="status" {
                option value="" { "All statuses" }
                @for st in RequestStatus::ALL {
                    option value=(st.as_str()) selected[q.status == Some(st)] { (st.label()) }
                }
            }
            select name="record_type" {
                option value="" { "All records" }
                @for rt in RecordType::ALL {
                    option value=(rt.as_str()) selected[q.record_type == Some(rt)] { (rt.label()) }
                }
            }
            input type="search" name="q" placeholder="Search record, requester or field" value=[q.search.as_deref()];
            select name="sort" {
                @for (sort, label) in [
                    (QueueSort::NewestFirst, "Newest first"),
                    (QueueSort::OldestFirst, "Oldest first"),
                    (QueueSort::Priority, "Priority"),
                    (QueueSort::MostItems, "Most items"),
                ] {
                    option value=(sort.as_str()) selected[q.sort == sort] { (label) }
                }
            }
            button type="submit" { "Apply" }
            a href="/sevis-user/change-queue/export" { "Export" }
        }
    }
}

fn item_row(item: &ChangeItem, can_write: bool) -> Markup {
    html! {
        tr class="change-item" data-item=(item.id) {
            td {
                @if item.status == ItemStatus::Pending && can_write {
                    input type="checkbox" name="items" value=(item.id) form=(format!("decide-{}", item.request_id));
                }
            }
            td { code { (item.field_path) } }
            td { (display_value(&item.previous_value)) }
            td { (display_value(&item.new_value)) }
            td { (item.change_type.as_str()) }
            td {
                (badge(item.status.as_str(), item_tone(item.status)))
                @if item.is_sevis_related { " " (badge("SEVIS", "")) }
                @if let Some(batch) = &item.sevis_batch_id { br; small { "in " (batch) } }
                @if let Some(reason) = &item.rejection_reason { br; small { (reason) } }
            }
            td {
                @for c in &item.comments {
                    p class="comment" {
                        strong { (c.author) } ": " (c.body)
                        @if c.is_internal { " " (badge("internal", "")) }
                    }
                }
                @if can_write {
                    form class="inline" method="post" action=(format!("/sevis-user/change-queue/items/{}/comments", item.id)) {
                        input type="text" name="author" placeholder="Name" required;
                        input type="text" name="body" placeholder="Comment" required;
                        label { input type="checkbox" name="internal" value="1"; " internal" }
                        button type="submit" { "Add" }
                    }
                }
            }
        }
    }
}

fn request_block(row: &ChangeRow, req: Option<&ChangeRequest>, can_write: bool) -> Markup {
    let open = matches!(row.status, RequestStatus::Pending | RequestStatus::PartiallyApproved);
    html! {
        tr class="change-request" data-request=(row.request_id) {
            td { (row.request_id) }
            td { (row.record_type.label()) }
            td {
                @if row.record_type == RecordType::Student {
                    a href=(format!("/sevis-user/student-application/{}", row.record_id)) { (row.record_id) }
                } @else {
                    (row.record_id)
                }
            }
            td { (row.requested_by) }
            td { (row.request_date.format("%Y-%m-%d")) }
            td { (row.priority.as_str()) }
            td { (badge(row.status.label(), status_tone(row.status))) }
            td class="item-count" { (row.item_count) }
            td class="pending-count" { (row.pending_count) }
            td class="sevis-count" { (row.pending_sevis_count) }
        }
        @if let Some(req) = req {
            tr class="change-detail" {
                td colspan="10" {
                    table class="items" {
                        thead { tr { th {} th { "Field" } th { "Current" } th { "Proposed" } th { "Type" } th { "Status" } th { "Comments" } } }
                        tbody {
                            @for item in &req.items {
                                (item_row(item, can_write))
                            }
                        }
                    }
                    @if can_write && open {
                        form id=(format!("decide-{}", req.id)) class="inline" method="post"
                            action=(format!("/sevis-user/change-queue/{}/approve", req.id)) {
                            input type="text" name="approver" placeholder="Reviewer" required;
                            input type="text" name="reason" placeholder="Rejection reason";
                            button type="submit" { "Approve selected" }
                            button type="submit" formaction=(format!("/sevis-user/change-queue/{}/reject", req.id)) { "Reject selected" }
                        }
                        form class="inline" method="post" action=(format!("/sevis-user/change-queue/{}/cancel", req.id)) {
                            button type="submit" { "Cancel request" }
                        }
                    }
                }
            }
        }
    }
}

pub fn change_queue_page(
    view: &QueueView,
    requests: &[ChangeRequest],
    fallback: Option<&str>,
    can_write: bool,
) -> Markup {
    let m = &view.metrics;
    desktop_layout(
        "Change Queue",
        "/sevis-user/change-queue",
        fallback,
        html! {
            main class="container" {
                h1 { "Change Queue" }

                div class="metrics" {
                    (metric("Requests", m.total_requests))
                    (metric("Changes", m.total_items))
                    (metric("Pending", m.pending_items))
                    (metric("Pending SEVIS", m.pending_sevis))
                    (metric("Ready for batch", m.sevis_ready))
                }

                (card("Requests", html! {
                    (filters(view))
                    @if view.rows.is_empty() {
                        p class="empty" { "No change requests match these filters." }
                    } @else {
                        table id="change-queue" {
                            thead {
                                tr {
                                    th { "Request" } th { "Record" } th { "Record id" } th { "Requested by" }
                                    th { "Date" } th { "Priority" } th { "Status" } th { "Items" } th { "Pending" } th { "SEVIS" }
                                }
                            }
                            tbody {
                                @for row in &view.rows {
                                    (request_block(row, requests.iter().find(|r| r.id == row.request_id), can_write))
                                }
                            }
                        }
                    }
                }))
            }
        },
    )
}
