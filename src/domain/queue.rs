// src/domain/queue.rs

use chrono::{DateTime, Utc};

use crate::domain::change::{ChangeRequest, Priority, RecordType, RequestStatus};

/// Table row for the change queue, one per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRow {
    pub request_id: String,
    pub record_type: RecordType,
    pub record_id: String,
    pub requested_by: String,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
    pub priority: Priority,
    pub item_count: usize,
    pub pending_count: usize,
    pub pending_sevis_count: usize,
    pub field_paths: Vec<String>,
}

impl ChangeRow {
    pub fn from_request(req: &ChangeRequest) -> Self {
        ChangeRow {
            request_id: req.id.clone(),
            record_type: req.record_type,
            record_id: req.record_id.clone(),
            requested_by: req.requested_by.clone(),
            request_date: req.request_date,
            status: req.status,
            priority: req.priority,
            item_count: req.items.len(),
            pending_count: req.pending_items(),
            pending_sevis_count: req.pending_sevis_items(),
            field_paths: req.items.iter().map(|i| i.field_path.clone()).collect(),
        }
    }

    fn matches_search(&self, needle: &str) -> bool {
        let hay = |s: &str| s.to_lowercase().contains(needle);
        hay(&self.request_id)
            || hay(&self.record_id)
            || hay(&self.requested_by)
            || self.field_paths.iter().any(|p| hay(p))
    }
}

/// Aggregates over the whole queue, independent of filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    pub total_requests: usize,
    pub total_items: usize,
    pub pending_items: usize,
    pub pending_sevis: usize,
    pub sevis_ready: usize,
}

impl QueueMetrics {
    pub fn collect(requests: &[ChangeRequest]) -> Self {
        requests.iter().fold(QueueMetrics::default(), |mut m, req| {
            m.total_requests += 1;
            m.total_items += req.items.len();
            m.pending_items += req.pending_items();
            m.pending_sevis += req.pending_sevis_items();
            m.sevis_ready += req.items.iter().filter(|i| i.is_sevis_ready()).count();
            m
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueSort {
    #[default]
    NewestFirst,
    OldestFirst,
    Priority,
    MostItems,
}

impl QueueSort {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("oldest") => QueueSort::OldestFirst,
            Some("priority") => QueueSort::Priority,
            Some("items") => QueueSort::MostItems,
            _ => QueueSort::NewestFirst,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueSort::NewestFirst => "newest",
            QueueSort::OldestFirst => "oldest",
            QueueSort::Priority => "priority",
            QueueSort::MostItems => "items",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueQuery {
    pub status: Option<RequestStatus>,
    pub record_type: Option<RecordType>,
    pub search: Option<String>,
    pub sort: QueueSort,
}

impl QueueQuery {
    pub fn from_params(params: &std::collections::HashMap<String, String>) -> Self {
        let non_empty = |k: &str| params.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());
        QueueQuery {
            status: non_empty("status").and_then(RequestStatus::parse),
            record_type: non_empty("record_type").and_then(RecordType::parse),
            search: non_empty("q").map(str::to_string),
            sort: QueueSort::parse(non_empty("sort")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueView {
    pub metrics: QueueMetrics,
    pub rows: Vec<ChangeRow>,
    pub query: QueueQuery,
}

/// Projects requests into table rows: one pass for metrics, then filter,
/// search and a stable sort (ties keep arrival order).
pub fn build_queue_view(requests: &[ChangeRequest], query: &QueueQuery) -> QueueView {
    let metrics = QueueMetrics::collect(requests);
    let needle = query.search.as_ref().map(|s| s.to_lowercase());

    let mut rows: Vec<ChangeRow> = requests
        .iter()
        .filter(|r| query.status.map_or(true, |s| r.status == s))
        .filter(|r| query.record_type.map_or(true, |t| r.record_type == t))
        .map(ChangeRow::from_request)
        .filter(|row| needle.as_deref().map_or(true, |n| row.matches_search(n)))
        .collect();

    match query.sort {
        QueueSort::NewestFirst => rows.sort_by(|a, b| b.request_date.cmp(&a.request_date)),
        QueueSort::OldestFirst => rows.sort_by(|a, b| a.request_date.cmp(&b.request_date)),
        QueueSort::Priority => rows.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.request_date.cmp(&a.request_date))
        }),
        QueueSort::MostItems => rows.sort_by(|a, b| b.item_count.cmp(&a.item_count)),
    }

    QueueView {
        metrics,
        rows,
        query: query.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::tests::{item, request};
    use crate::domain::change::ItemStatus;
    use chrono::{Duration, TimeZone};

    fn three_requests() -> Vec<ChangeRequest> {
        use ItemStatus::*;
        vec![
            request("r1", vec![item("a", Pending, true)]),
            request("r2", vec![item("b", Approved, true)]),
            request("r3", vec![item("c", Pending, false), item("d", Rejected, false)]),
        ]
    }

    #[test]
    fn metrics_over_three_requests() {
        let view = build_queue_view(&three_requests(), &QueueQuery::default());
        assert_eq!(view.metrics.total_requests, 3);
        assert_eq!(view.metrics.total_items, 4);
        assert_eq!(view.metrics.pending_items, 2);
        assert_eq!(view.metrics.pending_sevis, 1);
        assert_eq!(view.metrics.sevis_ready, 1);

        let counts: Vec<(usize, usize)> = three_requests()
            .iter()
            .map(|r| (r.items.len(), r.pending_items()))
            .collect();
        assert_eq!(counts, vec![(1, 1), (1, 0), (2, 1)]);
    }

    #[test]
    fn newest_first_is_stable_on_ties() {
        let mut reqs = three_requests();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        reqs[0].request_date = base;
        reqs[1].request_date = base + Duration::days(1);
        reqs[2].request_date = base;

        let view = build_queue_view(&reqs, &QueueQuery::default());
        let ids: Vec<&str> = view.rows.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn filters_do_not_change_metrics() {
        let query = QueueQuery {
            status: Some(RequestStatus::FullyApproved),
            ..QueueQuery::default()
        };
        let view = build_queue_view(&three_requests(), &query);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].request_id, "r2");
        assert_eq!(view.metrics.total_items, 4);
    }

    #[test]
    fn search_matches_field_paths_case_insensitively() {
        let mut reqs = three_requests();
        reqs[2].items[0].field_path = "data.hostFamily.Address".to_string();
        let query = QueueQuery {
            search: Some("HOSTFAMILY".to_string()),
            ..QueueQuery::default()
        };
        let view = build_queue_view(&reqs, &query);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].request_id, "r3");
    }

    #[test]
    fn query_from_params_ignores_blank_and_unknown() {
        let mut params = std::collections::HashMap::new();
        params.insert("status".to_string(), "nonsense".to_string());
        params.insert("q".to_string(), "  ".to_string());
        params.insert("sort".to_string(), "priority".to_string());
        let q = QueueQuery::from_params(&params);
        assert_eq!(q.status, None);
        assert_eq!(q.search, None);
        assert_eq!(q.sort, QueueSort::Priority);
    }
}
