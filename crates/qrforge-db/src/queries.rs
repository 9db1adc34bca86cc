use crate::Database;
use crate::models::{QrCodeRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::ToSql;

/// Optional bounds applied to a user's QR code listing.
///
/// Timestamps are RFC 3339 UTC strings. Rows are written in one uniform
/// format, so lexicographic comparison in SQL matches chronological order.
/// Both bounds are inclusive.
#[derive(Debug, Default, Clone)]
pub struct QrCodeFilter {
    pub start: Option<String>,
    pub end: Option<String>,
    pub qr_type: Option<String>,
}

impl Database {
    // -- Users --

    /// Insert a user unless the email is already registered.
    /// Returns false when the email is taken; check and insert run under the
    /// same connection lock, so concurrent signups cannot both succeed.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
                    row.get(0)
                })
                .optional()?;
            if existing.is_some() {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO users (id, name, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, name, email, password_hash, created_at),
            )?;
            Ok(true)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- QR codes --

    pub fn insert_qrcode(&self, row: &QrCodeRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO qrcodes (id, user_id, text, title, type, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    &row.id,
                    &row.user_id,
                    &row.text,
                    &row.title,
                    &row.qr_type,
                    &row.image_url,
                    &row.created_at,
                ),
            )?;
            Ok(())
        })
    }

    /// Fetch a record only if it belongs to the given user. A record owned by
    /// someone else comes back as None, same as a missing one.
    pub fn get_qrcode_for_user(&self, id: &str, user_id: &str) -> Result<Option<QrCodeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, text, title, type, image_url, created_at
                 FROM qrcodes WHERE id = ?1 AND user_id = ?2",
            )?;
            let row = stmt.query_row([id, user_id], map_qrcode_row).optional()?;
            Ok(row)
        })
    }

    /// Delete a record under the same ownership rule as [`get_qrcode_for_user`].
    /// Returns false when nothing was deleted.
    pub fn delete_qrcode(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM qrcodes WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn count_qrcodes(&self, user_id: &str, filter: &QrCodeFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (clause, owned) = filter_clause(user_id, filter);
            let params: Vec<&dyn ToSql> = owned.iter().map(|s| s as &dyn ToSql).collect();
            let sql = format!("SELECT COUNT(*) FROM qrcodes WHERE {}", clause);
            let total: i64 = conn.query_row(&sql, params.as_slice(), |row| row.get(0))?;
            Ok(total as u64)
        })
    }

    /// One page of a user's records, newest first. Ties on `created_at` break
    /// by id so repeated queries page deterministically.
    pub fn list_qrcodes(
        &self,
        user_id: &str,
        filter: &QrCodeFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<QrCodeRow>> {
        self.with_conn(|conn| {
            let (clause, owned) = filter_clause(user_id, filter);
            let params: Vec<&dyn ToSql> = owned.iter().map(|s| s as &dyn ToSql).collect();
            let sql = format!(
                "SELECT id, user_id, text, title, type, image_url, created_at
                 FROM qrcodes WHERE {}
                 ORDER BY created_at DESC, id DESC
                 LIMIT {} OFFSET {}",
                clause, limit, offset
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_qrcode_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// WHERE clause + positional params for the owner scope and optional filters.
fn filter_clause(user_id: &str, filter: &QrCodeFilter) -> (String, Vec<String>) {
    let mut conds = vec!["user_id = ?".to_string()];
    let mut params = vec![user_id.to_string()];

    if let Some(start) = &filter.start {
        conds.push("created_at >= ?".to_string());
        params.push(start.clone());
    }
    if let Some(end) = &filter.end {
        conds.push("created_at <= ?".to_string());
        params.push(end.clone());
    }
    if let Some(qr_type) = &filter.qr_type {
        conds.push("type = ?".to_string());
        params.push(qr_type.clone());
    }

    (conds.join(" AND "), params)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, name, email, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_qrcode_row(row: &rusqlite::Row<'_>) -> std::result::Result<QrCodeRow, rusqlite::Error> {
    Ok(QrCodeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        title: row.get(3)?,
        qr_type: row.get(4)?,
        image_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
