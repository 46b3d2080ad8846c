use crate::error::Result;
use crate::models::ConversionRecord;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub fn open_or_create(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("../db/schema.sql"))?;
    Ok(())
}

/// Save raw token JSON for a provider ("spotify" or "youtube"), with optional
/// client_id/client_secret. Upserts so a refresh overwrites the stored token.
pub fn save_credential_raw(
    conn: &Connection,
    provider: &str,
    token_json: &str,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO credentials (provider, token_json, client_id, client_secret, last_refreshed) VALUES (?1, ?2, ?3, ?4, strftime('%s','now')) ON CONFLICT(provider) DO UPDATE SET token_json = excluded.token_json, client_id = excluded.client_id, client_secret = excluded.client_secret, last_refreshed = strftime('%s','now')",
        params![provider, token_json, client_id, client_secret],
    )?;
    Ok(())
}

/// Load raw token JSON and client_id/client_secret for a provider.
pub fn load_credential_with_client(
    conn: &Connection,
    provider: &str,
) -> Result<Option<(String, Option<String>, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT token_json, client_id, client_secret FROM credentials WHERE provider = ?1 LIMIT 1",
    )?;
    let row = stmt
        .query_row(params![provider], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, Option<String>>(1)?,
                r.get::<_, Option<String>>(2)?,
            ))
        })
        .optional()?;
    Ok(row)
}

/// Drop a provider's stored credentials (explicit disconnect).
/// Returns true if a row was removed.
pub fn delete_credential(conn: &Connection, provider: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM credentials WHERE provider = ?1",
        params![provider],
    )?;
    Ok(removed > 0)
}

/// Append one conversion run to the history table.
pub fn record_conversion(conn: &Connection, rec: &ConversionRecord) -> Result<()> {
    let failed_json = serde_json::to_string(&rec.failed_songs)?;
    conn.execute(
        "INSERT INTO conversions (id, created_at, source_playlist_id, source_playlist_name, target_playlist_id, total_songs, added_count, failed_songs) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rec.id,
            rec.created_at,
            rec.source_playlist_id,
            rec.source_playlist_name,
            rec.target_playlist_id,
            rec.total_songs as i64,
            rec.added_count as i64,
            failed_json
        ],
    )?;
    Ok(())
}

/// Most recent conversion runs, newest first.
pub fn list_conversions(conn: &Connection, limit: usize) -> Result<Vec<ConversionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, source_playlist_id, source_playlist_name, target_playlist_id, total_songs, added_count, failed_songs FROM conversions ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, i64>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, String>(7)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, created_at, src_id, src_name, target_id, total, added, failed_json) = row?;
        let failed_songs: Vec<String> = serde_json::from_str(&failed_json).unwrap_or_default();
        out.push(ConversionRecord {
            id,
            created_at,
            source_playlist_id: src_id,
            source_playlist_name: src_name,
            target_playlist_id: target_id,
            total_songs: total as usize,
            added_count: added as usize,
            failed_songs,
        });
    }
    Ok(out)
}
