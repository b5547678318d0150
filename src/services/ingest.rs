use crate::db::models::{NewStagingEvent, NewStagingSong};
use crate::db::schema;
use diesel::prelude::*;
use diesel::PgConnection;

/// Rows per INSERT. 18 columns × 1000 rows stays well under PostgreSQL's
/// 65535 bind-parameter limit.
pub const INSERT_CHUNK_ROWS: usize = 1000;

pub fn insert_staging_events(conn: &mut PgConnection, rows: &[NewStagingEvent]) -> Result<usize, String> {
    use schema::staging_events::dsl as E;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(E::staging_events)
            .values(chunk)
            .execute(conn)
            .map_err(|e| format!("insert staging_events rows failed: {}", e))?;
    }
    Ok(inserted)
}

pub fn insert_staging_songs(conn: &mut PgConnection, rows: &[NewStagingSong]) -> Result<usize, String> {
    use schema::staging_songs::dsl as S;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(S::staging_songs)
            .values(chunk)
            .execute(conn)
            .map_err(|e| format!("insert staging_songs rows failed: {}", e))?;
    }
    Ok(inserted)
}
