use crate::domain::coordinator::{CoordinatorFilter, CoordinatorRow, CoordinatorStatus};
use crate::loaders::CoordinatorCounts;
use crate::templates::components::badge;
use crate::templates::{card, desktop_layout};
use maud::{html, Markup};

pub struct CoordinatorsVm<'a> {
    pub rows: Vec<&'a CoordinatorRow>,
    pub counts: CoordinatorCounts,
    pub filter: CoordinatorFilter,
    pub fallback: Option<&'a str>,
    pub can_write: bool,
}

fn filter_count(counts: &CoordinatorCounts, f: CoordinatorFilter) -> usize {
    match f {
        CoordinatorFilter::All => counts.total,
        CoordinatorFilter::Active => counts.active,
        CoordinatorFilter::Inactive => counts.inactive,
        CoordinatorFilter::Training => counts.training,
        CoordinatorFilter::Unassigned => counts.unassigned,
    }
}

fn status_badge(status: CoordinatorStatus) -> Markup {
    let tone = match status {
        CoordinatorStatus::Active => "ok",
        CoordinatorStatus::Training => "warn",
        CoordinatorStatus::Inactive => "bad",
    };
    badge(status.label(), tone)
}

pub fn coordinators_page(vm: &CoordinatorsVm) -> Markup {
    desktop_layout(
        "Local Coordinators",
        "/sevis-user/local-coordinators",
        vm.fallback,
        html! {
            main class="container" {
                h1 { "Local Coordinators" }

                nav class="filters" {
                    @for f in CoordinatorFilter::ALL {
                        a href=(format!("/sevis-user/local-coordinators?filter={}", f.as_str()))
                            class=[(f == vm.filter).then_some("active")] {
                            (f.as_str()) " (" (filter_count(&vm.counts, f)) ")"
                        }
                        " "
                    }
                }

                (card("Coordinators", html! {
                    @if vm.rows.is_empty() {
                        p class="empty" { "No coordinators match this filter." }
                    } @else {
                        table id="coordinators" {
                            thead {
                                tr { th { "Name" } th { "Email" } th { "Status" } th { "Region" } th { "Host families" } }
                            }
                            tbody {
                                @for row in &vm.rows {
                                    tr class="coordinator" data-user=(row.user_id) {
                                        td { (row.name) }
                                        td { (row.email) }
                                        td { (status_badge(row.status)) }
                                        td class="region" {
                                            @if row.needs_region {
                                                (badge(&row.region, "bad"))
                                                @if vm.can_write {
                                                    form class="inline" method="post"
                                                        action=(format!("/sevis-user/local-coordinators/{}/region", row.user_id)) {
                                                        input type="text" name="region" placeholder="Region" required;
                                                        button type="submit" { "Assign" }
                                                    }
                                                }
                                            } @else {
                                                (row.region)
                                            }
                                        }
                                        td { (row.host_families) }
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
