//! Process bootstrap shared by the `create_tables` and `etl` binaries.

use crate::config::{Config, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
use crate::db::warehouse::{DryRun, PgWarehouse, Warehouse};
use crate::error::EtlError;
use crate::services::{bulk_load, schema_manager, transform};
use log::{error, info};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config_path: PathBuf,
    /// Where the config path came from, for the startup log.
    pub config_origin: &'static str,
    pub dry_run: bool,
}

pub type Job = fn(&Config, &Options) -> Result<(), EtlError>;

/// Parse arguments (program name already skipped). `env_config` is the value
/// of `DWH_CONFIG`, if set.
pub fn parse_args<I>(args: I, env_config: Option<OsString>) -> Result<Options, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut config_path: Option<PathBuf> = None;
    let mut dry_run = false;

    while let Some(arg) = args.next() {
        let arg = arg
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (arg.as_str(), None),
        };
        match (flag, inline) {
            ("--config", Some(value)) => set_config_path(&mut config_path, OsString::from(value))?,
            ("--config", None) => set_config_path(&mut config_path, args.next().unwrap_or_default())?,
            ("--dry-run", None) => dry_run = true,
            ("--", None) => break,
            _ => return Err(format!("unrecognised argument: {}", arg)),
        }
    }

    let (config_path, config_origin) = match (config_path, env_config) {
        (Some(path), _) => (path, "CLI-specified"),
        (None, Some(env)) if !env.is_empty() => (PathBuf::from(env), CONFIG_PATH_ENV),
        _ => (PathBuf::from(DEFAULT_CONFIG_FILE), "default"),
    };

    Ok(Options {
        config_path,
        config_origin,
        dry_run,
    })
}

fn set_config_path(slot: &mut Option<PathBuf>, value: OsString) -> Result<(), String> {
    if slot.is_some() {
        return Err("`--config` given more than once".to_string());
    }
    if value.is_empty() {
        return Err("`--config` needs a path".to_string());
    }
    *slot = Some(PathBuf::from(value));
    Ok(())
}

fn open_warehouse(cfg: &Config, opts: &Options) -> Result<Box<dyn Warehouse>, EtlError> {
    if opts.dry_run {
        info!("Dry run: statements are logged, not executed");
        Ok(Box::new(DryRun::default()))
    } else {
        Ok(Box::new(PgWarehouse::connect(cfg)?))
    }
}

/// Drop and recreate every warehouse table.
pub fn create_tables(cfg: &Config, opts: &Options) -> Result<(), EtlError> {
    let mut warehouse = open_warehouse(cfg, opts)?;
    schema_manager::rebuild_schema(warehouse.as_mut(), cfg.dialect)
}

/// Load staging from the sources, then populate the fact and dimension tables.
pub fn etl(cfg: &Config, opts: &Options) -> Result<(), EtlError> {
    let mut warehouse = open_warehouse(cfg, opts)?;

    // 1) Staging
    bulk_load::load_staging(warehouse.as_mut(), cfg)?;

    // 2) Fact + dimensions
    transform::populate_warehouse(warehouse.as_mut())?;

    // 3) Summary
    if !opts.dry_run {
        for (table, count) in transform::table_counts(warehouse.as_mut())? {
            info!("{:>10}: {} row(s)", table, count);
        }
    }
    Ok(())
}

/// Entry point for both binaries: parse arguments, initialise logging, read
/// the config and run `job`. Exits with status 1 on any failure.
pub fn main_with(command: &str, job: Job) {
    let env_config = std::env::var_os(CONFIG_PATH_ENV);
    let opts = match parse_args(std::env::args_os().skip(1), env_config) {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("fatal: {}", err);
            eprintln!("usage: {} [--config <path>] [--dry-run]", command);
            std::process::exit(1);
        }
    };

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    info!(
        "{} {} (git {}) starting",
        command,
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );

    // The job owns the warehouse connection, so it is closed before exit().
    let result = Config::from_file(&opts.config_path).and_then(|cfg| {
        info!(
            "Config loaded from {} file {} (dialect={}, region={}, dry_run={})",
            opts.config_origin,
            opts.config_path.display(),
            cfg.dialect.as_str(),
            cfg.region,
            opts.dry_run
        );
        job(&cfg, &opts)
    });

    match result {
        Ok(()) => info!("{} finished", command),
        Err(e) => {
            error!("fatal: {}", e);
            std::process::exit(1);
        }
    }
}
