// src/db/change_queue.rs
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::domain::change::{
    ChangeComment, ChangeItem, ChangeRequest, ChangeType, ItemStatus, Priority, RecordType,
    RequestStatus,
};
use crate::errors::ServerError;

const REQUEST_COLUMNS: &str =
    "id, record_type, record_id, requested_by, request_date, status, priority";
const ITEM_COLUMNS: &str = "id, request_id, field_path, previous_value, new_value, change_type, \
     is_sevis_related, status, approved_by, approved_at, rejection_reason, sevis_batch_id";

pub(crate) fn json_from_column(raw: Option<String>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
    }
}

pub(crate) fn json_to_column(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Keeps the rows that decode; each one that doesn't is logged and dropped so
/// one bad record can't take a whole list down.
pub(crate) fn decoded_rows<T>(rows: impl Iterator<Item = rusqlite::Result<T>>, what: &str) -> Vec<T> {
    rows.filter_map(|row| match row {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("skipping {what} row: {e}");
            None
        }
    })
    .collect()
}

fn bad(what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unknown {what} '{value}'").into(),
    )
}

fn request_from_row(row: &Row) -> rusqlite::Result<ChangeRequest> {
    let record_type: String = row.get(1)?;
    let status: String = row.get(5)?;
    let priority: String = row.get(6)?;
    Ok(ChangeRequest {
        id: row.get(0)?,
        record_type: RecordType::parse(&record_type).ok_or_else(|| bad("record type", &record_type))?,
        record_id: row.get(2)?,
        requested_by: row.get(3)?,
        request_date: row.get(4)?,
        status: RequestStatus::parse(&status).ok_or_else(|| bad("request status", &status))?,
        priority: Priority::parse_lossy(&priority),
        items: Vec::new(),
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<ChangeItem> {
    let change_type: String = row.get(5)?;
    let status: String = row.get(7)?;
    Ok(ChangeItem {
        id: row.get(0)?,
        request_id: row.get(1)?,
        field_path: row.get(2)?,
        previous_value: json_from_column(row.get(3)?),
        new_value: json_from_column(row.get(4)?),
        change_type: ChangeType::parse(&change_type).ok_or_else(|| bad("change type", &change_type))?,
        is_sevis_related: row.get(6)?,
        status: ItemStatus::parse(&status).ok_or_else(|| bad("item status", &status))?,
        approved_by: row.get(8)?,
        approved_at: row.get(9)?,
        rejection_reason: row.get(10)?,
        sevis_batch_id: row.get(11)?,
        comments: Vec::new(),
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<ChangeComment> {
    Ok(ChangeComment {
        id: row.get(0)?,
        item_id: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        is_internal: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Attaches items (and their comments) to requests, preserving the request
/// order given and item positions.
fn assemble(
    conn: &Connection,
    mut requests: Vec<ChangeRequest>,
    where_clause: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ChangeRequest>, ServerError> {
    let mut stmt = conn.prepare(&format!(
        "select {ITEM_COLUMNS} from change_items {where_clause} order by request_id, position"
    ))?;
    let items = decoded_rows(stmt.query_map(args, item_from_row)?, "change item");

    let mut stmt = conn.prepare(&format!(
        "select c.id, c.item_id, c.author, c.body, c.is_internal, c.created_at
         from change_comments c
         join change_items i on i.id = c.item_id
         {}
         order by c.created_at, c.rowid",
        where_clause.replace("request_id", "i.request_id")
    ))?;
    let comments = decoded_rows(stmt.query_map(args, comment_from_row)?, "change comment");

    let mut by_item: HashMap<String, Vec<ChangeComment>> = HashMap::new();
    for c in comments {
        by_item.entry(c.item_id.clone()).or_default().push(c);
    }

    let mut by_request: HashMap<String, Vec<ChangeItem>> = HashMap::new();
    for mut item in items {
        item.comments = by_item.remove(&item.id).unwrap_or_default();
        by_request.entry(item.request_id.clone()).or_default().push(item);
    }

    for req in requests.iter_mut() {
        req.items = by_request.remove(&req.id).unwrap_or_default();
    }
    Ok(requests)
}

/// Every change request with its items, in arrival order.
pub fn load_change_requests(conn: &Connection) -> Result<Vec<ChangeRequest>, ServerError> {
    let mut stmt = conn.prepare(&format!(
        "select {REQUEST_COLUMNS} from change_requests order by rowid"
    ))?;
    let requests = decoded_rows(stmt.query_map([], request_from_row)?, "change request");
    assemble(conn, requests, "", &[])
}

pub fn load_change_request(
    conn: &Connection,
    request_id: &str,
) -> Result<Option<ChangeRequest>, ServerError> {
    let request = conn
        .query_row(
            &format!("select {REQUEST_COLUMNS} from change_requests where id = ?"),
            params![request_id],
            request_from_row,
        )
        .optional()?;

    match request {
        None => Ok(None),
        Some(req) => {
            let mut loaded = assemble(conn, vec![req], "where request_id = ?1", &[&request_id])?;
            Ok(loaded.pop())
        }
    }
}

/// Change requests targeting one record, newest first.
pub fn load_requests_for_record(
    conn: &Connection,
    record_id: &str,
) -> Result<Vec<ChangeRequest>, ServerError> {
    let mut stmt = conn.prepare(&format!(
        "select {REQUEST_COLUMNS} from change_requests where record_id = ?1 \
         order by request_date desc, rowid"
    ))?;
    let requests = decoded_rows(stmt.query_map(params![record_id], request_from_row)?, "change request");
    assemble(
        conn,
        requests,
        "where request_id in (select id from change_requests where record_id = ?1)",
        &[&record_id],
    )
}

/// Request id owning an item.
pub fn request_id_for_item(conn: &Connection, item_id: &str) -> Result<Option<String>, ServerError> {
    Ok(conn
        .query_row(
            "select request_id from change_items where id = ?",
            params![item_id],
            |r| r.get(0),
        )
        .optional()?)
}

/// Inserts or fully overwrites a request together with its items and comments.
pub fn upsert_change_request(conn: &Connection, req: &ChangeRequest) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into change_requests (id, record_type, record_id, requested_by, request_date, status, priority)
        values (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        on conflict(id) do update set
            record_type = excluded.record_type,
            record_id = excluded.record_id,
            requested_by = excluded.requested_by,
            request_date = excluded.request_date,
            status = excluded.status,
            priority = excluded.priority
        "#,
        params![
            req.id,
            req.record_type.as_str(),
            req.record_id,
            req.requested_by,
            req.request_date,
            req.status.as_str(),
            req.priority.as_str(),
        ],
    )?;

    for (position, item) in req.items.iter().enumerate() {
        conn.execute(
            r#"
            insert into change_items (id, request_id, position, field_path, previous_value, new_value,
                change_type, is_sevis_related, status, approved_by, approved_at, rejection_reason, sevis_batch_id)
            values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            on conflict(id) do update set
                position = excluded.position,
                field_path = excluded.field_path,
                previous_value = excluded.previous_value,
                new_value = excluded.new_value,
                change_type = excluded.change_type,
                is_sevis_related = excluded.is_sevis_related,
                status = excluded.status,
                approved_by = excluded.approved_by,
                approved_at = excluded.approved_at,
                rejection_reason = excluded.rejection_reason,
                sevis_batch_id = excluded.sevis_batch_id
            "#,
            params![
                item.id,
                req.id,
                position as i64,
                item.field_path,
                json_to_column(&item.previous_value),
                json_to_column(&item.new_value),
                item.change_type.as_str(),
                item.is_sevis_related,
                item.status.as_str(),
                item.approved_by,
                item.approved_at,
                item.rejection_reason,
                item.sevis_batch_id,
            ],
        )?;

        for comment in &item.comments {
            insert_comment(conn, comment)?;
        }
    }
    Ok(())
}

/// Persists the decision fields of every item plus the request status.
pub fn save_decisions(conn: &Connection, req: &ChangeRequest) -> Result<(), ServerError> {
    conn.execute(
        "update change_requests set status = ? where id = ?",
        params![req.status.as_str(), req.id],
    )?;
    for item in &req.items {
        conn.execute(
            "update change_items
             set status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?, sevis_batch_id = ?
             where id = ? and request_id = ?",
            params![
                item.status.as_str(),
                item.approved_by,
                item.approved_at,
                item.rejection_reason,
                item.sevis_batch_id,
                item.id,
                req.id,
            ],
        )?;
    }
    Ok(())
}

pub fn insert_comment(conn: &Connection, comment: &ChangeComment) -> Result<(), ServerError> {
    conn.execute(
        "insert or ignore into change_comments (id, item_id, author, body, is_internal, created_at)
         values (?, ?, ?, ?, ?, ?)",
        params![
            comment.id,
            comment.item_id,
            comment.author,
            comment.body,
            comment.is_internal,
            comment.created_at,
        ],
    )?;
    Ok(())
}
