// src/domain/sevis.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::change::{ChangeItem, ChangeRequest, ChangeType, TransitionError};
use crate::domain::profile::StudentProfileData;
use crate::domain::resolver::PrioritizedResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Draft,
    Submitted,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Draft => "draft",
            BatchStatus::Submitted => "submitted",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(BatchStatus::Draft),
            "submitted" => Some(BatchStatus::Submitted),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantResult {
    Pending,
    Success,
    Failed,
}

impl ParticipantResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantResult::Pending => "pending",
            ParticipantResult::Success => "success",
            ParticipantResult::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ParticipantResult::Pending),
            "success" => Some(ParticipantResult::Success),
            "failed" => Some(ParticipantResult::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SevisBatch {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    pub total_records: i64,
    pub successful_records: i64,
    pub failed_records: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SevisBatchParticipant {
    pub id: String,
    pub batch_id: String,
    pub item_id: String,
    pub student_id: String,
    pub result: ParticipantResult,
    pub message: Option<String>,
}

/// A batch joined with its participants.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub batch: SevisBatch,
    pub participants: Vec<SevisBatchParticipant>,
    pub successful: usize,
    pub failed: usize,
    pub pending: usize,
}

impl BatchSummary {
    /// Stored counters disagree with the participant rows.
    pub fn counts_drifted(&self) -> bool {
        self.batch.successful_records != self.successful as i64
            || self.batch.failed_records != self.failed as i64
    }
}

/// Client-side join of participants onto their batches. Participants whose
/// batch is missing are dropped; batch order is preserved.
pub fn group_batches(
    batches: Vec<SevisBatch>,
    participants: &[SevisBatchParticipant],
) -> Vec<BatchSummary> {
    batches
        .into_iter()
        .map(|batch| {
            let mine: Vec<SevisBatchParticipant> = participants
                .iter()
                .filter(|p| p.batch_id == batch.id)
                .cloned()
                .collect();
            let count = |r: ParticipantResult| mine.iter().filter(|p| p.result == r).count();
            BatchSummary {
                successful: count(ParticipantResult::Success),
                failed: count(ParticipantResult::Failed),
                pending: count(ParticipantResult::Pending),
                participants: mine,
                batch,
            }
        })
        .collect()
}

/// Claims every SEVIS-ready item across `requests` for `batch_id` and returns
/// the participant rows to insert. Items already in a batch are skipped.
pub fn plan_batch(
    batch_id: &str,
    requests: &mut [ChangeRequest],
    mut next_id: impl FnMut() -> String,
) -> Result<Vec<SevisBatchParticipant>, TransitionError> {
    let mut out = Vec::new();
    for req in requests.iter_mut() {
        let student_id = req.record_id.clone();
        for item in req.items.iter_mut().filter(|i| i.is_sevis_ready()) {
            item.claim_for_batch(batch_id)?;
            out.push(SevisBatchParticipant {
                id: next_id(),
                batch_id: batch_id.to_string(),
                item_id: item.id.clone(),
                student_id: student_id.clone(),
                result: ParticipantResult::Pending,
                message: None,
            });
        }
    }
    Ok(out)
}

pub const DEFAULT_PROCESSING_TYPE: &str = "general_update";

/// Inputs for deciding how SEVIS should process a single change.
pub struct ProcessingSources<'a> {
    pub item: &'a ChangeItem,
    pub student: Option<&'a StudentProfileData>,
}

// Most specific key first: "schoolName" is a site change, not a name change.
const PATH_PROCESSING_TYPES: &[(&str, &str)] = &[
    ("school", "site_of_activity"),
    ("address", "address_update"),
    ("program", "program_extension"),
    ("enddate", "program_extension"),
    ("birth", "biographical_update"),
    ("name", "biographical_update"),
];

fn processing_type_for_path(path: &str) -> Option<&'static str> {
    let path = path.to_ascii_lowercase();
    PATH_PROCESSING_TYPES
        .iter()
        .find(|(key, _)| path.contains(key))
        .map(|(_, kind)| *kind)
}

/// Explicit override on the student profile, then new records, then the
/// field being changed.
pub fn processing_type(sources: &ProcessingSources) -> String {
    PrioritizedResolver::<ProcessingSources, String>::new(DEFAULT_PROCESSING_TYPE.to_string())
        .source("profile.sevisProcessingType", |s| {
            s.student
                .and_then(|st| st.extra.get("sevisProcessingType"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .source("item.change_type", |s| {
            (s.item.change_type == ChangeType::Create).then(|| "initial_registration".to_string())
        })
        .source("item.field_path", |s| {
            processing_type_for_path(&s.item.field_path).map(str::to_string)
        })
        .resolve(sources)
        .value
}
