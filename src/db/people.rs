// src/db/people.rs
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::warn;

use crate::db::change_queue::{decoded_rows, json_from_column, json_to_column};
use crate::domain::profile::{Profile, ProfileData, Relationship, User, UserRole};
use crate::errors::ServerError;

struct RawUser {
    id: String,
    email: String,
    name: String,
    role: String,
    metadata: Option<String>,
}

impl RawUser {
    fn decode(self) -> Result<User, ServerError> {
        let role = UserRole::parse(&self.role)
            .ok_or_else(|| ServerError::BadData(format!("user {} has unknown role '{}'", self.id, self.role)))?;
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            metadata: json_from_column(self.metadata),
        })
    }
}

fn raw_user(r: &rusqlite::Row) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: r.get(0)?,
        email: r.get(1)?,
        name: r.get(2)?,
        role: r.get(3)?,
        metadata: r.get(4)?,
    })
}

fn query_users(conn: &Connection, sql: &str, arg: Option<&str>) -> Result<Vec<User>, ServerError> {
    let mut stmt = conn.prepare(sql)?;
    let raws = match arg {
        Some(a) => stmt.query_map(params![a], raw_user)?.collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt.query_map([], raw_user)?.collect::<rusqlite::Result<Vec<_>>>()?,
    };

    // Undecodable rows are skipped so one bad record can't blank a page.
    Ok(raws
        .into_iter()
        .filter_map(|raw| match raw.decode() {
            Ok(u) => Some(u),
            Err(e) => {
                warn!("skipping user row: {e}");
                None
            }
        })
        .collect())
}

pub fn load_users_by_role(conn: &Connection, role: UserRole) -> Result<Vec<User>, ServerError> {
    // legacy aliases are accepted by UserRole::parse, so filter after decoding
    let users = query_users(
        conn,
        "select id, email, name, role, metadata from users order by name, id",
        None,
    )?;
    Ok(users.into_iter().filter(|u| u.role == role).collect())
}

pub fn load_user(conn: &Connection, user_id: &str) -> Result<Option<User>, ServerError> {
    let mut users = query_users(
        conn,
        "select id, email, name, role, metadata from users where id = ?",
        Some(user_id),
    )?;
    Ok(users.pop())
}

fn decode_profile(
    id: String,
    user_id: String,
    data: Option<String>,
    role: UserRole,
) -> Result<Profile, ServerError> {
    let data = ProfileData::decode(role, json_from_column(data))
        .map_err(|e| ServerError::BadData(format!("profile {id}: {e}")))?;
    Ok(Profile { id, user_id, data })
}

pub fn load_profile_for_user(conn: &Connection, user: &User) -> Result<Option<Profile>, ServerError> {
    let raw: Option<(String, String, Option<String>)> = conn
        .query_row(
            "select id, user_id, data from profiles where user_id = ? order by updated_at desc limit 1",
            params![user.id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;

    match raw {
        None => Ok(None),
        Some((id, user_id, data)) => decode_profile(id, user_id, data, user.role).map(Some),
    }
}

/// Every profile owned by a user with `role`, paired with its user.
pub fn load_people(conn: &Connection, role: UserRole) -> Result<Vec<(User, Option<Profile>)>, ServerError> {
    let users = load_users_by_role(conn, role)?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        let profile = match load_profile_for_user(conn, &user) {
            Ok(p) => p,
            Err(ServerError::BadData(msg)) => {
                warn!("ignoring undecodable profile: {msg}");
                None
            }
            Err(e) => return Err(e),
        };
        out.push((user, profile));
    }
    Ok(out)
}

pub fn upsert_user(conn: &Connection, user: &User) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into users (id, email, name, role, metadata, created_at)
        values (?1, ?2, ?3, ?4, ?5, ?6)
        on conflict(id) do update set
            email = excluded.email,
            name = excluded.name,
            role = excluded.role,
            metadata = excluded.metadata
        "#,
        params![
            user.id,
            user.email,
            user.name,
            user.role.as_str(),
            json_to_column(&user.metadata).unwrap_or_else(|| "{}".to_string()),
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn upsert_profile(conn: &Connection, profile: &Profile) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into profiles (id, user_id, data, updated_at)
        values (?1, ?2, ?3, ?4)
        on conflict(id) do update set
            user_id = excluded.user_id,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
        params![
            profile.id,
            profile.user_id,
            profile.data.to_value().to_string(),
            Utc::now(),
        ],
    )?;
    Ok(())
}

/// Overwrites one key of a user's metadata document.
pub fn set_user_metadata(conn: &Connection, user_id: &str, key: &str, value: Value) -> Result<bool, ServerError> {
    let Some(mut user) = load_user(conn, user_id)? else {
        return Ok(false);
    };
    crate::domain::field_path::set_path(&mut user.metadata, key, value);
    upsert_user(conn, &user)?;
    Ok(true)
}

pub fn profile_exists(conn: &Connection, profile_id: &str) -> Result<bool, ServerError> {
    Ok(conn
        .query_row(
            "select 1 from profiles where id = ?",
            params![profile_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub fn upsert_relationship(conn: &Connection, rel: &Relationship) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into relationships (id, from_id, to_id, kind, payload, created_at)
        values (?1, ?2, ?3, ?4, ?5, ?6)
        on conflict(id) do update set
            from_id = excluded.from_id,
            to_id = excluded.to_id,
            kind = excluded.kind,
            payload = excluded.payload
        "#,
        params![
            rel.id,
            rel.from_id,
            rel.to_id,
            rel.kind,
            rel.payload.as_ref().and_then(json_to_column),
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn load_relationships(conn: &Connection, kind: &str) -> Result<Vec<Relationship>, ServerError> {
    let mut stmt = conn.prepare(
        "select id, from_id, to_id, kind, payload from relationships where kind = ? order by rowid",
    )?;
    let rows = stmt.query_map(params![kind], |r| {
        let payload: Option<String> = r.get(4)?;
        Ok(Relationship {
            id: r.get(0)?,
            from_id: r.get(1)?,
            to_id: r.get(2)?,
            kind: r.get(3)?,
            payload: payload.map(|p| json_from_column(Some(p))),
        })
    })?;
    Ok(decoded_rows(rows, "relationship"))
}

/// Relationships whose endpoints don't resolve to a stored profile.
pub fn dangling_relationships(conn: &Connection) -> Result<Vec<String>, ServerError> {
    let mut stmt = conn.prepare(
        "select r.id from relationships r
         left join profiles a on a.id = r.from_id
         left join profiles b on b.id = r.to_id
         where a.id is null or b.id is null
         order by r.rowid",
    )?;
    let rows = stmt.query_map([], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
