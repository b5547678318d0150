//! Populates the fact and dimension tables from staging.
//!
//! Every statement reads staging tables only. Dimensions collapse duplicates
//! with `GROUP BY` on their natural key and `MIN()` for the other columns,
//! which is arbitrary but deterministic since the sources carry no ordering.

use crate::db::warehouse::{execute_all, Warehouse};
use crate::error::EtlError;
use crate::sql::{quote_ident, Statement};
use crate::tables::{self, Table, TableRole, TABLES};
use log::info;

/// Plays (`page = 'NextSong'`) joined to the song catalog by (artist name,
/// title). Plays without a catalog match keep NULL song and artist ids.
const SONGPLAY_SELECT: &str = "\
SELECT e.ts AS start_time,
       CAST(e.userid AS integer) AS user_id,
       e.level,
       s.song_id,
       s.artist_id,
       e.sessionid AS session_id,
       e.location,
       e.useragent AS user_agent
FROM \"staging_events\" e
LEFT OUTER JOIN \"staging_songs\" s
  ON e.artist = s.artist_name
 AND e.song = s.title
WHERE e.page = 'NextSong'";

const USERS_SELECT: &str = "\
SELECT CAST(userid AS integer) AS user_id,
       MIN(firstname) AS first_name,
       MIN(lastname) AS last_name,
       MIN(gender) AS gender,
       MIN(level) AS level
FROM \"staging_events\"
GROUP BY userid
HAVING userid IS NOT NULL";

const SONG_SELECT: &str = "\
SELECT song_id,
       MIN(title) AS title,
       MIN(artist_id) AS artist_id,
       MIN(year) AS year,
       MIN(duration) AS duration
FROM \"staging_songs\"
GROUP BY song_id
HAVING song_id IS NOT NULL";

const ARTIST_SELECT: &str = "\
SELECT artist_id,
       MIN(artist_name) AS name,
       MIN(artist_location) AS location,
       MIN(artist_latitude) AS latitude,
       MIN(artist_longitude) AS longitude
FROM \"staging_songs\"
GROUP BY artist_id
HAVING artist_id IS NOT NULL";

// ts is epoch milliseconds; integer division by 1000 truncates to seconds
// before the calendar conversion. week is ISO-8601, weekday 0 = Sunday.
const TIME_SELECT: &str = "\
SELECT start_time,
       EXTRACT(hour FROM played_at) AS hour,
       EXTRACT(day FROM played_at) AS day,
       EXTRACT(week FROM played_at) AS week,
       EXTRACT(month FROM played_at) AS month,
       EXTRACT(year FROM played_at) AS year,
       EXTRACT(dow FROM played_at) AS weekday
FROM (
    SELECT ts AS start_time,
           timestamp 'epoch' + ts / 1000 * interval '1 second' AS played_at
    FROM \"staging_events\"
    GROUP BY ts
    HAVING ts IS NOT NULL
) AS plays";

/// The SELECT feeding a fact or dimension table.
pub fn source_query(table: &Table) -> Option<&'static str> {
    match table.name {
        "songplay" => Some(SONGPLAY_SELECT),
        "users" => Some(USERS_SELECT),
        "song" => Some(SONG_SELECT),
        "artist" => Some(ARTIST_SELECT),
        "time" => Some(TIME_SELECT),
        _ => None,
    }
}

/// INSERT … SELECT for every fact/dimension table, ordered so each table is
/// filled after the tables it references (dimensions before `songplay`).
pub fn insert_statements() -> Result<Vec<Statement>, EtlError> {
    let order = tables::creation_order(TABLES).map_err(EtlError::Config)?;
    let mut statements = Vec::new();
    for table in order.into_iter().filter(|t| t.role != TableRole::Staging) {
        let select = source_query(table)
            .ok_or_else(|| EtlError::Config(format!("no transformation defined for table {}", table.name)))?;
        let sql = format!(
            "INSERT INTO {} ({})\n{};",
            quote_ident(table.name),
            table.column_names().join(", "),
            select
        );
        statements.push(Statement::new(format!("insert {}", table.name), sql));
    }
    Ok(statements)
}

pub fn populate_warehouse(warehouse: &mut dyn Warehouse) -> Result<usize, EtlError> {
    let statements = insert_statements()?;
    info!("Populating {} fact/dimension table(s)", statements.len());
    let rows = execute_all(warehouse, &statements)?;
    info!("Transform complete: {} row(s) inserted", rows);
    Ok(rows)
}

/// Row count per fact/dimension table, in registry order.
pub fn table_counts(warehouse: &mut dyn Warehouse) -> Result<Vec<(&'static str, i64)>, EtlError> {
    let mut counts = Vec::new();
    for table in TABLES.iter().filter(|t| t.role != TableRole::Staging) {
        counts.push((table.name, warehouse.count_rows(table.name)?));
    }
    Ok(counts)
}
