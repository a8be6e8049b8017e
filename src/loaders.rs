// src/loaders.rs
//
// Read models for the pages. When the store is missing or a query fails, the
// page still renders from the deterministic fallback dataset, with a banner.

use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::db::{change_queue, people, sevis, StoreClients};
use crate::domain::change::{ChangeRequest, RecordType};
use crate::domain::coordinator::{coordinator_row, CoordinatorRow, CoordinatorStatus};
use crate::domain::profile::{record_document, Profile, Relationship, User, UserRole};
use crate::domain::queue::QueueMetrics;
use crate::domain::sevis::{group_batches, BatchSummary};
use crate::errors::ServerError;
use crate::mock::{fallback_dataset, Dataset};

pub const COORDINATOR_HOST: &str = "coordinator_host";
pub const HOST_STUDENT: &str = "host_student";

/// Page data plus, when the store could not be used, the reason it was replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub data: T,
    pub fallback: Option<String>,
}

impl<T> Loaded<T> {
    pub fn live(data: T) -> Self {
        Self { data, fallback: None }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

fn load_or<T>(
    clients: &StoreClients,
    what: &str,
    read: impl FnOnce(&Connection) -> Result<T, ServerError>,
    fallback: impl FnOnce() -> T,
) -> Loaded<T> {
    let result = clients
        .reader()
        .and_then(|db| db.with_conn(|conn| read(conn)));
    match result {
        Ok(data) => Loaded::live(data),
        Err(e) => {
            warn!("{what}: store read failed, showing fallback data: {e}");
            Loaded {
                data: fallback(),
                fallback: Some(e.to_string()),
            }
        }
    }
}

pub fn load_change_queue(clients: &StoreClients) -> Loaded<Vec<ChangeRequest>> {
    load_or(clients, "change queue", change_queue::load_change_requests, || {
        fallback_dataset().requests
    })
}

fn coordinator_rows(
    people: &[(User, Option<Profile>)],
    relationships: &[Relationship],
) -> Vec<CoordinatorRow> {
    let mut hosts: HashMap<&str, usize> = HashMap::new();
    for rel in relationships.iter().filter(|r| r.kind == COORDINATOR_HOST) {
        *hosts.entry(rel.from_id.as_str()).or_default() += 1;
    }
    people
        .iter()
        .filter(|(u, _)| u.role == UserRole::Coordinator)
        .map(|(user, profile)| {
            let count = profile
                .as_ref()
                .and_then(|p| hosts.get(p.id.as_str()))
                .copied()
                .unwrap_or(0);
            coordinator_row(user, profile.as_ref(), count)
        })
        .collect()
}

fn people_from(ds: &Dataset, role: UserRole) -> Vec<(User, Option<Profile>)> {
    ds.users
        .iter()
        .filter(|u| u.role == role)
        .map(|u| {
            let profile = ds.profiles.iter().find(|p| p.user_id == u.id).cloned();
            (u.clone(), profile)
        })
        .collect()
}

pub fn load_coordinators(clients: &StoreClients) -> Loaded<Vec<CoordinatorRow>> {
    load_or(
        clients,
        "local coordinators",
        |conn| {
            let people = people::load_people(conn, UserRole::Coordinator)?;
            let rels = people::load_relationships(conn, COORDINATOR_HOST)?;
            Ok(coordinator_rows(&people, &rels))
        },
        || {
            let ds = fallback_dataset();
            coordinator_rows(&people_from(&ds, UserRole::Coordinator), &ds.relationships)
        },
    )
}

/// Batches never fall back to synthetic rows; an empty list is shown instead.
pub fn load_batches(clients: &StoreClients) -> Loaded<Vec<BatchSummary>> {
    load_or(
        clients,
        "sevis batches",
        |conn| {
            let batches = sevis::load_batches(conn)?;
            let participants = sevis::load_participants(conn)?;
            Ok(group_batches(batches, &participants))
        },
        Vec::new,
    )
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinatorCounts {
    pub total: usize,
    pub active: usize,
    pub training: usize,
    pub inactive: usize,
    pub unassigned: usize,
}

impl CoordinatorCounts {
    pub fn collect(rows: &[CoordinatorRow]) -> Self {
        let status = |s: CoordinatorStatus| rows.iter().filter(|r| r.status == s).count();
        Self {
            total: rows.len(),
            active: status(CoordinatorStatus::Active),
            training: status(CoordinatorStatus::Training),
            inactive: status(CoordinatorStatus::Inactive),
            unassigned: rows.iter().filter(|r| r.needs_region).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub metrics: QueueMetrics,
    pub coordinators: CoordinatorCounts,
    pub recent_batches: Vec<BatchSummary>,
    /// Relationships pointing at a profile that no longer exists.
    pub dangling_relationships: Vec<String>,
    pub can_write: bool,
}

fn dangling_in(ds: &Dataset) -> Vec<String> {
    let known = |id: &str| ds.profiles.iter().any(|p| p.id == id);
    ds.relationships
        .iter()
        .filter(|r| !known(r.from_id.as_str()) || !known(r.to_id.as_str()))
        .map(|r| r.id.clone())
        .collect()
}

pub fn load_dashboard(clients: &StoreClients) -> Loaded<Dashboard> {
    let queue = load_change_queue(clients);
    let coordinators = load_coordinators(clients);
    let dangling = load_or(
        clients,
        "relationship check",
        people::dangling_relationships,
        || dangling_in(&fallback_dataset()),
    );
    let mut batches = load_batches(clients).data;
    batches.truncate(5);

    Loaded {
        fallback: queue
            .fallback
            .clone()
            .or(coordinators.fallback.clone())
            .or(dangling.fallback),
        data: Dashboard {
            metrics: QueueMetrics::collect(&queue.data),
            coordinators: CoordinatorCounts::collect(&coordinators.data),
            recent_batches: batches,
            dangling_relationships: dangling.data,
            can_write: clients.admin.is_some(),
        },
    }
}

/// Everything the student application page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentApplication {
    pub user: User,
    pub profile: Option<Profile>,
    /// The record field paths are resolved against.
    pub record: Value,
    pub requests: Vec<ChangeRequest>,
    pub host_family: Option<String>,
}

impl StudentApplication {
    fn new(user: User, profile: Option<Profile>, requests: Vec<ChangeRequest>, host_family: Option<String>) -> Self {
        let record = record_document(&user, profile.as_ref());
        Self {
            user,
            profile,
            record,
            requests,
            host_family,
        }
    }
}

fn application_from(ds: Dataset, student_id: &str) -> Option<StudentApplication> {
    let user = ds
        .users
        .iter()
        .find(|u| u.id == student_id && u.role == UserRole::Student)?
        .clone();
    let profile = ds.profiles.iter().find(|p| p.user_id == user.id).cloned();
    let host_family = profile.as_ref().and_then(|p| {
        ds.relationships
            .iter()
            .find(|r| r.kind == HOST_STUDENT && r.to_id == p.id)
            .map(|r| r.from_id.clone())
    });
    let requests = ds
        .requests
        .into_iter()
        .filter(|r| r.record_type == RecordType::Student && r.record_id == user.id)
        .collect();
    Some(StudentApplication::new(user, profile, requests, host_family))
}

fn read_application(conn: &Connection, student_id: &str) -> Result<Option<StudentApplication>, ServerError> {
    let Some(user) = people::load_user(conn, student_id)? else {
        return Ok(None);
    };
    if user.role != UserRole::Student {
        return Ok(None);
    }
    let profile = people::load_profile_for_user(conn, &user)?;
    let host_family = match &profile {
        Some(p) => people::load_relationships(conn, HOST_STUDENT)?
            .into_iter()
            .find(|r| r.to_id == p.id)
            .map(|r| r.from_id),
        None => None,
    };
    let requests = change_queue::load_requests_for_record(conn, &user.id)?
        .into_iter()
        .filter(|r| r.record_type == RecordType::Student)
        .collect();
    Ok(Some(StudentApplication::new(user, profile, requests, host_family)))
}

/// `NotFound` when the student exists in neither the store nor the fallback data.
pub fn load_student_application(
    clients: &StoreClients,
    student_id: &str,
) -> Result<Loaded<StudentApplication>, ServerError> {
    let loaded = load_or(
        clients,
        "student application",
        |conn| read_application(conn, student_id),
        || application_from(fallback_dataset(), student_id),
    );
    match loaded.data {
        Some(app) => Ok(Loaded {
            data: app,
            fallback: loaded.fallback,
        }),
        None => Err(ServerError::NotFound),
    }
}
