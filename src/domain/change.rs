// src/domain/change.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Which kind of record a change request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Student,
    HostFamily,
    Coordinator,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [
        RecordType::Student,
        RecordType::HostFamily,
        RecordType::Coordinator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Student => "student",
            RecordType::HostFamily => "host_family",
            RecordType::Coordinator => "coordinator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(RecordType::Student),
            "host_family" => Some(RecordType::HostFamily),
            "coordinator" => Some(RecordType::Coordinator),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordType::Student => "Student",
            RecordType::HostFamily => "Host Family",
            RecordType::Coordinator => "Coordinator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    PartiallyApproved,
    FullyApproved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::PartiallyApproved,
        RequestStatus::FullyApproved,
        RequestStatus::Rejected,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::PartiallyApproved => "partially_approved",
            RequestStatus::FullyApproved => "fully_approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::PartiallyApproved => "Partially Approved",
            RequestStatus::FullyApproved => "Fully Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Cancelled => "Cancelled",
        }
    }

    /// Closed requests accept no further item decisions.
    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Approved => "approved",
            ItemStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemStatus::Pending),
            "approved" => Some(ItemStatus::Approved),
            "rejected" => Some(ItemStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ChangeType::Create),
            "update" => Some(ChangeType::Update),
            "delete" => Some(ChangeType::Delete),
            _ => None,
        }
    }
}

/// Ordered from least to most urgent so `Ord` sorts by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Unknown priorities are treated as normal.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeComment {
    pub id: String,
    pub item_id: String,
    pub author: String,
    pub body: String,
    /// Internal comments are only shown to staff, never sent with notifications.
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// A single field-level proposed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeItem {
    pub id: String,
    pub request_id: String,
    /// Dotted path into the target record, e.g. `data.address`.
    pub field_path: String,
    pub previous_value: Value,
    pub new_value: Value,
    pub change_type: ChangeType,
    pub is_sevis_related: bool,
    pub status: ItemStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub sevis_batch_id: Option<String>,
    pub comments: Vec<ChangeComment>,
}

impl ChangeItem {
    pub fn is_pending_sevis(&self) -> bool {
        self.is_sevis_related && self.status == ItemStatus::Pending
    }

    /// Approved, SEVIS-related and not yet claimed by any batch.
    pub fn is_sevis_ready(&self) -> bool {
        self.is_sevis_related && self.status == ItemStatus::Approved && self.sevis_batch_id.is_none()
    }

    pub fn approve(&mut self, by: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_pending()?;
        self.status = ItemStatus::Approved;
        self.approved_by = Some(by.to_string());
        self.approved_at = Some(at);
        self.rejection_reason = None;
        Ok(())
    }

    pub fn reject(&mut self, by: &str, at: DateTime<Utc>, reason: &str) -> Result<(), TransitionError> {
        if reason.trim().is_empty() {
            return Err(TransitionError::MissingReason);
        }
        self.check_pending()?;
        self.status = ItemStatus::Rejected;
        self.approved_by = Some(by.to_string());
        self.approved_at = Some(at);
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Attach this item to a SEVIS batch. An item is claimed at most once.
    pub fn claim_for_batch(&mut self, batch_id: &str) -> Result<(), TransitionError> {
        if let Some(existing) = &self.sevis_batch_id {
            return Err(TransitionError::AlreadyClaimed {
                item: self.id.clone(),
                batch: existing.clone(),
            });
        }
        if !self.is_sevis_related || self.status != ItemStatus::Approved {
            return Err(TransitionError::NotSevisReady(self.id.clone()));
        }
        self.sevis_batch_id = Some(batch_id.to_string());
        Ok(())
    }

    fn check_pending(&self) -> Result<(), TransitionError> {
        if self.status != ItemStatus::Pending {
            return Err(TransitionError::ItemDecided {
                item: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: String,
    pub record_type: RecordType,
    pub record_id: String,
    pub requested_by: String,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
    pub priority: Priority,
    /// Kept in insertion order.
    pub items: Vec<ChangeItem>,
}

impl ChangeRequest {
    pub fn pending_items(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .count()
    }

    pub fn pending_sevis_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_pending_sevis()).count()
    }

    /// Recompute `status` from the items. Cancelled requests keep their status.
    pub fn refresh_status(&mut self) {
        if self.status.is_closed() {
            return;
        }
        self.status = derive_request_status(&self.items);
    }

    /// Approve the given items (all pending ones when `item_ids` is empty).
    pub fn approve_items(
        &mut self,
        item_ids: &[String],
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, TransitionError> {
        self.decide(item_ids, |item| item.approve(by, at))
    }

    /// Reject the given items (all pending ones when `item_ids` is empty).
    pub fn reject_items(
        &mut self,
        item_ids: &[String],
        by: &str,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<Vec<String>, TransitionError> {
        if reason.trim().is_empty() {
            return Err(TransitionError::MissingReason);
        }
        self.decide(item_ids, |item| item.reject(by, at, reason))
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.status {
            RequestStatus::Pending | RequestStatus::PartiallyApproved => {
                self.status = RequestStatus::Cancelled;
                Ok(())
            }
            other => Err(TransitionError::RequestClosed {
                request: self.id.clone(),
                status: other,
            }),
        }
    }

    // All-or-nothing: validates every target before mutating any of them.
    fn decide<F>(&mut self, item_ids: &[String], mut apply: F) -> Result<Vec<String>, TransitionError>
    where
        F: FnMut(&mut ChangeItem) -> Result<(), TransitionError>,
    {
        if self.status.is_closed() {
            return Err(TransitionError::RequestClosed {
                request: self.id.clone(),
                status: self.status,
            });
        }

        let targets: Vec<String> = if item_ids.is_empty() {
            self.items
                .iter()
                .filter(|i| i.status == ItemStatus::Pending)
                .map(|i| i.id.clone())
                .collect()
        } else {
            item_ids.to_vec()
        };

        if targets.is_empty() {
            return Err(TransitionError::NothingPending(self.id.clone()));
        }

        let mut staged = self.items.clone();
        for id in &targets {
            let item = staged
                .iter_mut()
                .find(|i| &i.id == id)
                .ok_or_else(|| TransitionError::UnknownItem(id.clone()))?;
            apply(item)?;
        }

        self.items = staged;
        self.refresh_status();
        Ok(targets)
    }
}

/// Derives the aggregate status of a request from its items.
///
/// Precedence: no items or anything still undecided without approvals is
/// `Pending`; every item approved is `FullyApproved`; at least one approval is
/// `PartiallyApproved`; every item rejected is `Rejected`.
pub fn derive_request_status(items: &[ChangeItem]) -> RequestStatus {
    if items.is_empty() {
        return RequestStatus::Pending;
    }
    let approved = items
        .iter()
        .filter(|i| i.status == ItemStatus::Approved)
        .count();
    let rejected = items
        .iter()
        .filter(|i| i.status == ItemStatus::Rejected)
        .count();

    if approved == items.len() {
        RequestStatus::FullyApproved
    } else if approved > 0 {
        RequestStatus::PartiallyApproved
    } else if rejected == items.len() {
        RequestStatus::Rejected
    } else {
        RequestStatus::Pending
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("item {item} was already {}", .status.as_str())]
    ItemDecided { item: String, status: ItemStatus },
    #[error("request {request} is {} and can no longer change", .status.as_str())]
    RequestClosed { request: String, status: RequestStatus },
    #[error("item {0} does not belong to this request")]
    UnknownItem(String),
    #[error("request {0} has no pending items")]
    NothingPending(String),
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("item {item} is already part of SEVIS batch {batch}")]
    AlreadyClaimed { item: String, batch: String },
    #[error("item {0} is not an approved SEVIS-related change")]
    NotSevisReady(String),
}
