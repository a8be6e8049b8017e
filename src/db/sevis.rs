// src/db/sevis.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::change_queue::decoded_rows;
use crate::domain::sevis::{BatchStatus, ParticipantResult, SevisBatch, SevisBatchParticipant};
use crate::errors::ServerError;

const BATCH_COLUMNS: &str = "id, name, created_at, submitted_at, status, total_records, \
     successful_records, failed_records";

fn batch_from_row(row: &Row) -> rusqlite::Result<SevisBatch> {
    let status: String = row.get(4)?;
    Ok(SevisBatch {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        submitted_at: row.get(3)?,
        // unknown states were written by hand; show them as drafts
        status: BatchStatus::parse(&status).unwrap_or(BatchStatus::Draft),
        total_records: row.get(5)?,
        successful_records: row.get(6)?,
        failed_records: row.get(7)?,
    })
}

fn participant_from_row(row: &Row) -> rusqlite::Result<SevisBatchParticipant> {
    let result: String = row.get(4)?;
    Ok(SevisBatchParticipant {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        item_id: row.get(2)?,
        student_id: row.get(3)?,
        result: ParticipantResult::parse(&result).unwrap_or(ParticipantResult::Pending),
        message: row.get(5)?,
    })
}

/// Newest batches first.
pub fn load_batches(conn: &Connection) -> Result<Vec<SevisBatch>, ServerError> {
    let mut stmt = conn.prepare(&format!(
        "select {BATCH_COLUMNS} from sevis_batches order by created_at desc, rowid desc"
    ))?;
    let rows = stmt.query_map([], batch_from_row)?;
    Ok(decoded_rows(rows, "sevis batch"))
}

pub fn load_batch(conn: &Connection, batch_id: &str) -> Result<Option<SevisBatch>, ServerError> {
    Ok(conn
        .query_row(
            &format!("select {BATCH_COLUMNS} from sevis_batches where id = ?"),
            params![batch_id],
            batch_from_row,
        )
        .optional()?)
}

/// All participants; callers join them to batches in memory.
pub fn load_participants(conn: &Connection) -> Result<Vec<SevisBatchParticipant>, ServerError> {
    let mut stmt = conn.prepare(
        "select id, batch_id, item_id, student_id, result, message
         from sevis_batch_participants order by rowid",
    )?;
    let rows = stmt.query_map([], participant_from_row)?;
    Ok(decoded_rows(rows, "sevis participant"))
}

/// Moves a draft or failed batch to `submitted`. Returns false when another
/// submission already holds it.
pub fn claim_for_submission(conn: &Connection, batch_id: &str, at: DateTime<Utc>) -> Result<bool, ServerError> {
    let changed = conn.execute(
        "update sevis_batches set status = 'submitted', submitted_at = ?
         where id = ? and status in ('draft', 'failed')",
        params![at, batch_id],
    )?;
    Ok(changed == 1)
}

pub fn upsert_batch(conn: &Connection, batch: &SevisBatch) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into sevis_batches (id, name, created_at, submitted_at, status, total_records,
            successful_records, failed_records)
        values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        on conflict(id) do update set
            name = excluded.name,
            submitted_at = excluded.submitted_at,
            status = excluded.status,
            total_records = excluded.total_records,
            successful_records = excluded.successful_records,
            failed_records = excluded.failed_records
        "#,
        params![
            batch.id,
            batch.name,
            batch.created_at,
            batch.submitted_at,
            batch.status.as_str(),
            batch.total_records,
            batch.successful_records,
            batch.failed_records,
        ],
    )?;
    Ok(())
}

pub fn upsert_participant(conn: &Connection, p: &SevisBatchParticipant) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into sevis_batch_participants (id, batch_id, item_id, student_id, result, message)
        values (?1, ?2, ?3, ?4, ?5, ?6)
        on conflict(id) do update set
            result = excluded.result,
            message = excluded.message
        "#,
        params![p.id, p.batch_id, p.item_id, p.student_id, p.result.as_str(), p.message],
    )?;
    Ok(())
}
