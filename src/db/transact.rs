// src/db/transact.rs
use rusqlite::Connection;

use crate::db::connection::AdminDatabase;
use crate::db::{change_queue, people, sevis};
use crate::domain::change::ChangeRequest;
use crate::domain::profile::{Profile, Relationship, User};
use crate::domain::sevis::{SevisBatch, SevisBatchParticipant};
use crate::errors::ServerError;

/// One full-record write. A slice of these is applied atomically by [`transact`].
#[derive(Debug, Clone)]
pub enum Upsert {
    User(User),
    Profile(Profile),
    Relationship(Relationship),
    ChangeRequest(ChangeRequest),
    Batch(SevisBatch),
    Participant(SevisBatchParticipant),
}

impl Upsert {
    pub fn apply(&self, conn: &Connection) -> Result<(), ServerError> {
        match self {
            Upsert::User(u) => people::upsert_user(conn, u),
            Upsert::Profile(p) => people::upsert_profile(conn, p),
            Upsert::Relationship(r) => people::upsert_relationship(conn, r),
            Upsert::ChangeRequest(req) => change_queue::upsert_change_request(conn, req),
            Upsert::Batch(b) => sevis::upsert_batch(conn, b),
            Upsert::Participant(p) => sevis::upsert_participant(conn, p),
        }
    }

    /// Write order within a transaction: parents before children.
    fn rank(&self) -> u8 {
        match self {
            Upsert::User(_) => 0,
            Upsert::Profile(_) => 1,
            Upsert::Relationship(_) => 2,
            Upsert::Batch(_) => 3,
            Upsert::ChangeRequest(_) => 4,
            Upsert::Participant(_) => 5,
        }
    }
}

/// Applies every operation in one transaction; any failure rolls back all of them.
pub fn transact(admin: &AdminDatabase, ops: &[Upsert]) -> Result<usize, ServerError> {
    let mut ordered: Vec<&Upsert> = ops.iter().collect();
    ordered.sort_by_key(|op| op.rank());

    admin.with_tx(|tx| {
        for op in &ordered {
            op.apply(tx)?;
        }
        Ok(ordered.len())
    })
}
