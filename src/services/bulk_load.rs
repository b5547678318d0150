use crate::config::{Config, Dialect};
use crate::db::models::NewStagingEvent;
use crate::db::warehouse::Warehouse;
use crate::error::EtlError;
use crate::services::source;
use crate::sql::{quote_ident, quote_literal, Statement};
use crate::tables::{Table, STAGING_EVENTS, STAGING_SONGS};
use chrono::{DateTime, SecondsFormat};
use log::{debug, info, warn};
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub events: usize,
    pub songs: usize,
}

/// Redshift `COPY` commands, one per staging table.
///
/// The activity log needs the jsonpaths file because its keys are camelCase
/// while the columns are lower case; song keys already match the columns.
pub fn copy_statements(cfg: &Config) -> Result<Vec<(&'static Table, Statement)>, EtlError> {
    let role = quote_literal(cfg.iam_role()?);
    let region = quote_literal(&cfg.region);

    let events = format!(
        "COPY {} FROM {} IAM_ROLE {} REGION {} FORMAT AS JSON {};",
        quote_ident(STAGING_EVENTS.name),
        quote_literal(&cfg.storage.log_data),
        role,
        region,
        quote_literal(&cfg.storage.log_jsonpath)
    );
    let songs = format!(
        "COPY {} FROM {} IAM_ROLE {} REGION {} FORMAT AS JSON 'auto';",
        quote_ident(STAGING_SONGS.name),
        quote_literal(&cfg.storage.song_data),
        role,
        region
    );

    Ok(vec![
        (&STAGING_EVENTS, Statement::new("copy staging_events", events)),
        (&STAGING_SONGS, Statement::new("copy staging_songs", songs)),
    ])
}

/// Fill both staging tables. Rows are appended; the tables are expected to be
/// empty (freshly created). The first failing table aborts the phase.
pub fn load_staging(warehouse: &mut dyn Warehouse, cfg: &Config) -> Result<LoadSummary, EtlError> {
    info!("Loading staging tables ({} dialect)", cfg.dialect.as_str());
    let summary = match cfg.dialect {
        Dialect::Redshift => copy_from_object_store(warehouse, cfg)?,
        Dialect::Postgres => load_local_files(warehouse, cfg)?,
    };
    info!(
        "Staging load complete: staging_events={} staging_songs={}",
        summary.events, summary.songs
    );
    Ok(summary)
}

fn copy_from_object_store(warehouse: &mut dyn Warehouse, cfg: &Config) -> Result<LoadSummary, EtlError> {
    let mut summary = LoadSummary::default();
    for (table, statement) in copy_statements(cfg)? {
        debug!("SQL [{}]:\n{}", statement.label, statement.sql);
        let started = Instant::now();
        let rows = warehouse.execute(&statement).map_err(|e| EtlError::Load {
            table: table.name.to_string(),
            message: match e {
                EtlError::Statement { message, .. } => message,
                other => other.to_string(),
            },
        })?;
        info!(
            "{} ok ({} row(s), {} ms)",
            statement.label,
            rows,
            started.elapsed().as_millis()
        );
        if table.name == STAGING_EVENTS.name {
            summary.events = rows;
        } else {
            summary.songs = rows;
        }
    }
    Ok(summary)
}

fn load_local_files(warehouse: &mut dyn Warehouse, cfg: &Config) -> Result<LoadSummary, EtlError> {
    let storage = &cfg.storage;
    for path in [&storage.log_data, &storage.log_jsonpath, &storage.song_data] {
        if source::is_object_store_uri(path) {
            return Err(EtlError::Config(format!(
                "{} is an object-storage path; the postgres dialect loads local files only",
                path
            )));
        }
    }

    let events = source::read_events(storage)?;
    log_event_span(&events);
    let inserted_events = warehouse.insert_staging_events(&events)?;

    let songs = source::read_songs(storage)?;
    let inserted_songs = warehouse.insert_staging_songs(&songs)?;

    Ok(LoadSummary {
        events: inserted_events,
        songs: inserted_songs,
    })
}

fn log_event_span(events: &[NewStagingEvent]) {
    let first = events.iter().map(|e| e.ts).min();
    let last = events.iter().map(|e| e.ts).max();
    let (Some(first), Some(last)) = (first, last) else {
        warn!("No event records found under the log data path");
        return;
    };

    let fmt = |ms: i64| {
        DateTime::from_timestamp_millis(ms)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| format!("{}ms", ms))
    };
    info!("Event records span {} to {}", fmt(first), fmt(last));
}
