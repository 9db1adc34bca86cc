use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS qrcodes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            text        TEXT NOT NULL,
            title       TEXT NOT NULL DEFAULT 'Untitled QR Code',
            type        TEXT NOT NULL DEFAULT 'URL',
            image_url   TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_qrcodes_owner
            ON qrcodes(user_id, created_at DESC);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
