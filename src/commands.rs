// src/commands.rs
//
// Every state-changing action in the app goes through `CommandHandler::execute`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{change_queue, people, sevis, AdminDatabase, StoreClients};
use crate::domain::change::{ChangeComment, ChangeRequest, TransitionError};
use crate::domain::profile::{Relationship, UserRole};
use crate::domain::sevis::{
    plan_batch, processing_type, BatchStatus, ParticipantResult, ProcessingSources, SevisBatch,
};
use crate::errors::ServerError;
use crate::sevis_gateway::{SevisError, SevisGateway, SevisRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Approve items; an empty `item_ids` means every pending item.
    ApproveItems {
        request_id: String,
        item_ids: Vec<String>,
        approver: String,
    },
    RejectItems {
        request_id: String,
        item_ids: Vec<String>,
        approver: String,
        reason: String,
    },
    /// Reject every item still pending on the request.
    RejectRequest {
        request_id: String,
        approver: String,
        reason: String,
    },
    CancelRequest {
        request_id: String,
    },
    AssignRegion {
        user_id: String,
        region: String,
    },
    AddComment {
        item_id: String,
        author: String,
        body: String,
        is_internal: bool,
    },
    CreateSevisBatch {
        name: String,
    },
    SubmitSevisBatch {
        batch_id: String,
    },
    LinkProfiles {
        from_id: String,
        to_id: String,
        kind: String,
        payload: Option<Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    ItemsDecided {
        request_id: String,
        items: Vec<String>,
        status: crate::domain::change::RequestStatus,
    },
    RequestCancelled {
        request_id: String,
    },
    RegionAssigned {
        user_id: String,
        region: String,
    },
    CommentAdded {
        comment_id: String,
        request_id: String,
    },
    BatchCreated {
        batch_id: String,
        participants: usize,
    },
    BatchSubmitted {
        batch_id: String,
        successful: usize,
        failed: usize,
    },
    ProfilesLinked {
        relationship_id: String,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("write access is not configured")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Sevis(#[from] SevisError),
    #[error(transparent)]
    Store(#[from] ServerError),
}

pub fn new_id(prefix: &str) -> String {
    let n: u64 = rand::thread_rng().gen();
    format!("{prefix}-{:012x}", n & 0xffff_ffff_ffff)
}

fn required(field: &str, value: &str) -> Result<String, CommandError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(CommandError::Invalid(format!("{field} is required")));
    }
    Ok(v.to_string())
}

pub struct CommandHandler<'a> {
    clients: &'a StoreClients,
    gateway: Option<&'a dyn SevisGateway>,
}

impl<'a> CommandHandler<'a> {
    pub fn new(clients: &'a StoreClients, gateway: Option<&'a dyn SevisGateway>) -> Self {
        Self { clients, gateway }
    }

    fn admin(&self) -> Result<&'a AdminDatabase, CommandError> {
        self.clients.admin.as_ref().ok_or(CommandError::Unauthorized)
    }

    pub fn execute(&self, cmd: Command, now: DateTime<Utc>) -> Result<CommandOutcome, CommandError> {
        let admin = self.admin()?;
        let outcome: Result<CommandOutcome, CommandError> = match cmd {
            Command::ApproveItems {
                request_id,
                item_ids,
                approver,
            } => {
                let approver = required("approver", &approver)?;
                decide(admin, &request_id, |req| req.approve_items(&item_ids, &approver, now))
            }
            Command::RejectItems {
                request_id,
                item_ids,
                approver,
                reason,
            } => {
                let approver = required("approver", &approver)?;
                decide(admin, &request_id, |req| {
                    req.reject_items(&item_ids, &approver, now, &reason)
                })
            }
            Command::RejectRequest {
                request_id,
                approver,
                reason,
            } => {
                let approver = required("approver", &approver)?;
                decide(admin, &request_id, |req| req.reject_items(&[], &approver, now, &reason))
            }
            Command::CancelRequest { request_id } => admin.with_tx(|tx| {
                let mut req = change_queue::load_change_request(tx, &request_id)?
                    .ok_or_else(|| CommandError::NotFound(format!("change request {request_id}")))?;
                req.cancel()?;
                change_queue::save_decisions(tx, &req)?;
                Ok(CommandOutcome::RequestCancelled { request_id })
            }),
            Command::AssignRegion { user_id, region } => {
                let region = required("region", &region)?;
                admin.with_tx(|tx| {
                    let user = people::load_user(tx, &user_id)?
                        .ok_or_else(|| CommandError::NotFound(format!("user {user_id}")))?;
                    if user.role != UserRole::Coordinator {
                        return Err(CommandError::Invalid(format!("{} is not a coordinator", user.name)));
                    }
                    people::set_user_metadata(tx, &user_id, "region", Value::String(region.clone()))?;
                    Ok(CommandOutcome::RegionAssigned { user_id, region })
                })
            }
            Command::AddComment {
                item_id,
                author,
                body,
                is_internal,
            } => {
                let author = required("author", &author)?;
                let body = required("comment", &body)?;
                admin.with_tx(|tx| {
                    let request_id = change_queue::request_id_for_item(tx, &item_id)?
                        .ok_or_else(|| CommandError::NotFound(format!("change item {item_id}")))?;
                    let comment = ChangeComment {
                        id: new_id("cc"),
                        item_id,
                        author,
                        body,
                        is_internal,
                        created_at: now,
                    };
                    change_queue::insert_comment(tx, &comment)?;
                    Ok(CommandOutcome::CommentAdded {
                        comment_id: comment.id,
                        request_id,
                    })
                })
            }
            Command::CreateSevisBatch { name } => create_batch(admin, &name, now),
            Command::SubmitSevisBatch { batch_id } => {
                let gateway = self.gateway.ok_or(SevisError::NotConfigured)?;
                submit_batch(admin, gateway, &batch_id, now)
            }
            Command::LinkProfiles {
                from_id,
                to_id,
                kind,
                payload,
            } => {
                let kind = required("relationship type", &kind)?;
                admin.with_tx(|tx| {
                    for id in [&from_id, &to_id] {
                        if !people::profile_exists(tx, id)? {
                            return Err(CommandError::NotFound(format!("profile {id}")));
                        }
                    }
                    let rel = Relationship {
                        id: new_id("rel"),
                        from_id,
                        to_id,
                        kind,
                        payload,
                    };
                    people::upsert_relationship(tx, &rel)?;
                    Ok(CommandOutcome::ProfilesLinked {
                        relationship_id: rel.id,
                    })
                })
            }
        };

        match &outcome {
            Ok(o) => info!(?o, "command applied"),
            Err(e) => warn!("command rejected: {e}"),
        }
        outcome
    }
}

/// Loads a request, applies `f`, and writes the decisions plus the re-derived
/// status back in the same transaction.
fn decide<F>(admin: &AdminDatabase, request_id: &str, f: F) -> Result<CommandOutcome, CommandError>
where
    F: FnOnce(&mut ChangeRequest) -> Result<Vec<String>, TransitionError>,
{
    admin.with_tx(|tx| {
        let mut req = change_queue::load_change_request(tx, request_id)?
            .ok_or_else(|| CommandError::NotFound(format!("change request {request_id}")))?;
        let items = f(&mut req)?;
        change_queue::save_decisions(tx, &req)?;
        Ok(CommandOutcome::ItemsDecided {
            request_id: req.id,
            items,
            status: req.status,
        })
    })
}

fn create_batch(admin: &AdminDatabase, name: &str, now: DateTime<Utc>) -> Result<CommandOutcome, CommandError> {
    let name = match name.trim() {
        "" => format!("SEVIS batch {}", now.format("%Y-%m-%d %H:%M")),
        n => n.to_string(),
    };
    let batch_id = new_id("sb");

    admin.with_tx(|tx| {
        let mut requests = change_queue::load_change_requests(tx)?;
        let participants = plan_batch(&batch_id, &mut requests, || new_id("sp"))?;
        if participants.is_empty() {
            return Err(CommandError::Invalid(
                "no approved SEVIS changes are waiting for a batch".to_string(),
            ));
        }

        sevis::upsert_batch(
            tx,
            &SevisBatch {
                id: batch_id.clone(),
                name,
                created_at: now,
                submitted_at: None,
                status: BatchStatus::Draft,
                total_records: participants.len() as i64,
                successful_records: 0,
                failed_records: 0,
            },
        )?;
        for p in &participants {
            sevis::upsert_participant(tx, p)?;
        }
        for req in requests
            .iter()
            .filter(|r| r.items.iter().any(|i| i.sevis_batch_id.as_deref() == Some(batch_id.as_str())))
        {
            change_queue::save_decisions(tx, req)?;
        }

        Ok(CommandOutcome::BatchCreated {
            batch_id: batch_id.clone(),
            participants: participants.len(),
        })
    })
}

fn submit_batch(
    admin: &AdminDatabase,
    gateway: &dyn SevisGateway,
    batch_id: &str,
    now: DateTime<Utc>,
) -> Result<CommandOutcome, CommandError> {
    let (mut batch, mut participants, records) = admin.reader().with_conn(|conn| {
        let batch = sevis::load_batch(conn, batch_id)?.ok_or(ServerError::NotFound)?;
        let participants: Vec<_> = sevis::load_participants(conn)?
            .into_iter()
            .filter(|p| p.batch_id == batch.id)
            .collect();

        let mut records = Vec::with_capacity(participants.len());
        for p in &participants {
            let Some(request_id) = change_queue::request_id_for_item(conn, &p.item_id)? else {
                warn!(item = %p.item_id, "participant points at a missing change item");
                continue;
            };
            let Some(req) = change_queue::load_change_request(conn, &request_id)? else {
                continue;
            };
            let Some(item) = req.items.iter().find(|i| i.id == p.item_id) else {
                continue;
            };
            let student = match people::load_user(conn, &p.student_id)? {
                Some(u) => match people::load_profile_for_user(conn, &u) {
                    Ok(profile) => profile,
                    Err(e) => {
                        warn!(student = %u.id, "sending without profile data: {e}");
                        None
                    }
                },
                None => None,
            };
            let student_data = student.as_ref().and_then(|s| s.data.as_student());
            records.push(SevisRecord {
                participant_id: p.id.clone(),
                student_id: p.student_id.clone(),
                sevis_id: student_data.and_then(|s| s.sevis_id.clone()),
                processing_type: processing_type(&ProcessingSources {
                    item,
                    student: student_data,
                }),
                field_path: item.field_path.clone(),
                new_value: item.new_value.clone(),
            });
        }
        Ok((batch, participants, records))
    })
    .map_err(|e| match e {
        ServerError::NotFound => CommandError::NotFound(format!("SEVIS batch {batch_id}")),
        other => CommandError::Store(other),
    })?;

    // Claimed in its own transaction so a concurrent submit sees it as taken
    // before anything goes over the network.
    if !admin.with_tx(|tx| sevis::claim_for_submission(tx, &batch.id, now))? {
        return Err(CommandError::Invalid(format!(
            "batch {} was already submitted",
            batch.id
        )));
    }
    batch.status = BatchStatus::Submitted;
    batch.submitted_at = Some(now);

    // The network call happens outside any transaction.
    let outcomes = match gateway.submit(&batch, &records) {
        Ok(o) => o,
        Err(e) => {
            batch.status = BatchStatus::Failed;
            admin.with_tx(|tx| sevis::upsert_batch(tx, &batch))?;
            return Err(e.into());
        }
    };

    for p in participants.iter_mut() {
        match outcomes.iter().find(|o| o.participant_id == p.id) {
            Some(o) => {
                p.result = if o.success {
                    ParticipantResult::Success
                } else {
                    ParticipantResult::Failed
                };
                p.message = o.message.clone();
            }
            None => {
                p.result = ParticipantResult::Failed;
                p.message = Some("no result returned by SEVIS".to_string());
            }
        }
    }

    let successful = participants
        .iter()
        .filter(|p| p.result == ParticipantResult::Success)
        .count();
    let failed = participants.len() - successful;
    batch.status = BatchStatus::Completed;
    batch.submitted_at = Some(now);
    batch.total_records = participants.len() as i64;
    batch.successful_records = successful as i64;
    batch.failed_records = failed as i64;

    admin.with_tx(|tx| {
        sevis::upsert_batch(tx, &batch)?;
        for p in &participants {
            sevis::upsert_participant(tx, p)?;
        }
        Ok::<_, ServerError>(())
    })?;

    Ok(CommandOutcome::BatchSubmitted {
        batch_id: batch.id,
        successful,
        failed,
    })
}
