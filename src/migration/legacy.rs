// src/migration/legacy.rs
//
// Backfills users and profiles from a legacy SQL dump.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::db::Upsert;
use crate::domain::profile::{Profile, ProfileData, User, UserRole};
use crate::migration::sql_values::{parse_insert, InsertStatement, TokenizeError};

/// Splits a dump into statements on `;` outside string literals and drops
/// `--` comment lines.
pub fn statements(dump: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for line in dump.lines() {
        if !in_string && line.trim_start().starts_with("--") {
            continue;
        }
        for c in line.chars() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    // a doubled quote toggles twice and stays inside the string
                    in_string = false;
                }
            } else if c == '\'' {
                in_string = true;
            } else if c == ';' {
                let stmt = current.trim().to_string();
                if !stmt.is_empty() {
                    out.push(stmt);
                }
                current.clear();
                continue;
            }
            current.push(c);
        }
        current.push('\n');
    }

    let tail = current.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

fn role_for_table(table: &str) -> Option<UserRole> {
    match table.to_ascii_lowercase().as_str() {
        "students" | "student_applications" => Some(UserRole::Student),
        "host_families" | "hosts" => Some(UserRole::HostFamily),
        "coordinators" | "local_coordinators" => Some(UserRole::Coordinator),
        _ => None,
    }
}

/// Parses a JSON column, substituting an empty object when it is missing or malformed.
pub fn json_or_empty(raw: Option<&str>, context: &str) -> Value {
    let empty = || Value::Object(Map::new());
    match raw.map(str::trim) {
        None | Some("") => empty(),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(v @ Value::Object(_)) => v,
            Ok(other) => {
                warn!("{context}: expected a JSON object, got {other}; using empty object");
                empty()
            }
            Err(e) => {
                warn!("{context}: unparseable JSON ({e}); using empty object");
                empty()
            }
        },
    }
}

fn display_name(stmt: &InsertStatement, row: &[Option<String>], data: &Value) -> String {
    if let Some(name) = stmt.get(row, "name").filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }
    let first = stmt
        .get(row, "first_name")
        .or_else(|| data.get("firstName").and_then(Value::as_str))
        .unwrap_or_default();
    let last = stmt
        .get(row, "last_name")
        .or_else(|| data.get("lastName").and_then(Value::as_str))
        .or_else(|| data.get("familyName").and_then(Value::as_str))
        .unwrap_or_default();
    format!("{first} {last}").trim().to_string()
}

#[derive(Debug, Default)]
pub struct LegacyImport {
    /// User and profile writes, each user directly followed by its profile.
    pub records: Vec<Upsert>,
    pub skipped_statements: usize,
    pub skipped_rows: usize,
}

impl LegacyImport {
    pub fn users(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, Upsert::User(_)))
            .count()
    }
}

fn import_row(stmt: &InsertStatement, role: UserRole, row: &[Option<String>]) -> Option<[Upsert; 2]> {
    let id = stmt.get(row, "id").map(str::trim).filter(|s| !s.is_empty())?;
    let context = format!("{}.{id}", stmt.table);

    let raw = json_or_empty(stmt.get(row, "data"), &context);
    let data = match ProfileData::decode(role, raw.clone()) {
        Ok(d) => d,
        Err(e) => {
            warn!("{context}: profile does not fit the {} shape ({e}); using empty profile", role.as_str());
            ProfileData::decode(role, Value::Object(Map::new())).ok()?
        }
    };

    let user = User {
        id: id.to_string(),
        email: stmt.get(row, "email").unwrap_or_default().trim().to_string(),
        name: display_name(stmt, row, &raw),
        role,
        metadata: json_or_empty(stmt.get(row, "metadata"), &context),
    };
    let profile = Profile {
        id: format!("{id}-profile"),
        user_id: user.id.clone(),
        data,
    };
    Some([Upsert::User(user), Upsert::Profile(profile)])
}

pub fn import_legacy(dump: &str) -> LegacyImport {
    let mut out = LegacyImport::default();

    for text in statements(dump) {
        let stmt = match parse_insert(&text) {
            Ok(s) => s,
            Err(TokenizeError::NotInsert(head)) => {
                debug!("ignoring non-insert statement: {head}");
                continue;
            }
            Err(e) => {
                warn!("skipping unparseable statement: {e}");
                out.skipped_statements += 1;
                continue;
            }
        };

        let Some(role) = role_for_table(&stmt.table) else {
            debug!(table = %stmt.table, "no mapping for legacy table");
            out.skipped_statements += 1;
            continue;
        };

        for row in &stmt.rows {
            match import_row(&stmt, role, row) {
                Some(pair) => out.records.extend(pair),
                None => {
                    warn!(table = %stmt.table, "skipping row without an id");
                    out.skipped_rows += 1;
                }
            }
        }
    }

    tracing::info!(
        users = out.users(),
        skipped_statements = out.skipped_statements,
        skipped_rows = out.skipped_rows,
        at = %Utc::now(),
        "legacy dump parsed"
    );
    out
}
