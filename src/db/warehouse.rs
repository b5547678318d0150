//! The seam between the pipeline and the warehouse.
//!
//! Services only talk to [`Warehouse`]. [`PgWarehouse`] holds the single
//! connection for a run; [`DryRun`] logs statements instead of executing them.

use crate::config::Config;
use crate::db::models::{NewStagingEvent, NewStagingSong};
use crate::error::EtlError;
use crate::services::ingest;
use crate::sql::{quote_ident, Statement};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::PgConnection;
use log::{debug, info};
use std::time::Instant;

pub trait Warehouse {
    /// Run one statement to completion. Each statement commits on its own.
    fn execute(&mut self, statement: &Statement) -> Result<usize, EtlError>;

    fn insert_staging_events(&mut self, rows: &[NewStagingEvent]) -> Result<usize, EtlError>;

    fn insert_staging_songs(&mut self, rows: &[NewStagingSong]) -> Result<usize, EtlError>;

    fn count_rows(&mut self, table: &str) -> Result<i64, EtlError>;
}

/// Run statements strictly in order; the first failure aborts the rest.
pub fn execute_all(warehouse: &mut dyn Warehouse, statements: &[Statement]) -> Result<usize, EtlError> {
    let mut affected = 0;
    for (index, statement) in statements.iter().enumerate() {
        debug!("SQL [{}]:\n{}", statement.label, statement.sql);
        let started = Instant::now();
        let rows = warehouse.execute(statement)?;
        info!(
            "[{}/{}] {} ok ({} row(s), {} ms)",
            index + 1,
            statements.len(),
            statement.label,
            rows,
            started.elapsed().as_millis()
        );
        affected += rows;
    }
    Ok(affected)
}

/// One held connection to the warehouse, closed when dropped.
pub struct PgWarehouse {
    conn: PgConnection,
    host: String,
}

impl PgWarehouse {
    pub fn connect(cfg: &Config) -> Result<Self, EtlError> {
        let warehouse = Self::establish(&cfg.conninfo(), &cfg.cluster.host)?;
        info!(
            "Connected to {} warehouse {}:{}/{} as {}",
            cfg.dialect.as_str(),
            cfg.cluster.host,
            cfg.cluster.port,
            cfg.cluster.db_name,
            cfg.cluster.user
        );
        Ok(warehouse)
    }

    /// Connect with a libpq conninfo string or `postgres://` URL.
    pub fn establish(database_url: &str, host: &str) -> Result<Self, EtlError> {
        let conn = PgConnection::establish(database_url)?;
        Ok(PgWarehouse {
            conn,
            host: host.to_string(),
        })
    }
}

impl Drop for PgWarehouse {
    fn drop(&mut self) {
        info!("Closing warehouse connection to {}", self.host);
    }
}

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

impl Warehouse for PgWarehouse {
    fn execute(&mut self, statement: &Statement) -> Result<usize, EtlError> {
        diesel::sql_query(statement.sql.as_str())
            .execute(&mut self.conn)
            .map_err(|e| EtlError::Statement {
                label: statement.label.clone(),
                message: e.to_string(),
            })
    }

    fn insert_staging_events(&mut self, rows: &[NewStagingEvent]) -> Result<usize, EtlError> {
        ingest::insert_staging_events(&mut self.conn, rows).map_err(|message| EtlError::Load {
            table: "staging_events".to_string(),
            message,
        })
    }

    fn insert_staging_songs(&mut self, rows: &[NewStagingSong]) -> Result<usize, EtlError> {
        ingest::insert_staging_songs(&mut self.conn, rows).map_err(|message| EtlError::Load {
            table: "staging_songs".to_string(),
            message,
        })
    }

    fn count_rows(&mut self, table: &str) -> Result<i64, EtlError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(table));
        diesel::sql_query(sql)
            .get_result::<RowCount>(&mut self.conn)
            .map(|r| r.count)
            .map_err(|e| EtlError::Statement {
                label: format!("count {}", table),
                message: e.to_string(),
            })
    }
}

/// Logs every statement at info level without touching a database.
#[derive(Debug, Default)]
pub struct DryRun {
    pub statements: usize,
}

impl Warehouse for DryRun {
    fn execute(&mut self, statement: &Statement) -> Result<usize, EtlError> {
        self.statements += 1;
        info!("dry-run [{}]:\n{}", statement.label, statement.sql);
        Ok(0)
    }

    fn insert_staging_events(&mut self, rows: &[NewStagingEvent]) -> Result<usize, EtlError> {
        info!("dry-run: would insert {} row(s) into staging_events", rows.len());
        Ok(0)
    }

    fn insert_staging_songs(&mut self, rows: &[NewStagingSong]) -> Result<usize, EtlError> {
        info!("dry-run: would insert {} row(s) into staging_songs", rows.len());
        Ok(0)
    }

    fn count_rows(&mut self, _table: &str) -> Result<i64, EtlError> {
        Ok(0)
    }
}
