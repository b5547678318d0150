use crate::config::Dialect;
use crate::db::warehouse::{execute_all, Warehouse};
use crate::error::EtlError;
use crate::sql::Statement;
use crate::tables::{self, TABLES};
use log::{info, warn};

/// `DROP TABLE IF EXISTS` for every table, referencing tables first.
pub fn drop_statements() -> Result<Vec<Statement>, EtlError> {
    let order = tables::drop_order(TABLES).map_err(EtlError::Config)?;
    Ok(order
        .into_iter()
        .map(|t| Statement::new(format!("drop {}", t.name), t.drop_sql()))
        .collect())
}

/// `CREATE TABLE IF NOT EXISTS` for every table, referenced tables first.
pub fn create_statements(dialect: Dialect) -> Result<Vec<Statement>, EtlError> {
    let order = tables::creation_order(TABLES).map_err(EtlError::Config)?;
    Ok(order
        .into_iter()
        .map(|t| Statement::new(format!("create {}", t.name), t.create_sql(dialect)))
        .collect())
}

/// Drop and recreate every table. All existing data is lost.
///
/// Statements commit one by one: a failure leaves whatever ran before it in
/// place and skips the rest.
pub fn rebuild_schema(warehouse: &mut dyn Warehouse, dialect: Dialect) -> Result<(), EtlError> {
    let drops = drop_statements()?;
    let creates = create_statements(dialect)?;

    warn!("Dropping {} table(s); existing warehouse data will be lost", drops.len());
    execute_all(warehouse, &drops)?;

    info!("Creating {} table(s) ({} dialect)", creates.len(), dialect.as_str());
    execute_all(warehouse, &creates)?;

    info!("Schema rebuilt");
    Ok(())
}
