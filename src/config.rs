//! Runtime configuration read from an INI-style `dwh.cfg`.
//!
//! Layout matches the settings file the cluster was provisioned with:
//!
//! ```text
//! [CLUSTER]
//! HOST=example.abc123.us-west-2.redshift.amazonaws.com
//! DB_NAME=dwh
//! DB_USER=dwhuser
//! DB_PASSWORD=secret
//! DB_PORT=5439
//!
//! [IAM_ROLE]
//! ARN='arn:aws:iam::123456789012:role/dwhRole'
//!
//! [S3]
//! LOG_DATA='s3://udacity-dend/log_data'
//! LOG_JSONPATH='s3://udacity-dend/log_json_path.json'
//! SONG_DATA='s3://udacity-dend/song_data'
//!
//! # optional
//! [ETL]
//! DIALECT=redshift
//! REGION=us-west-2
//! ```

use crate::error::EtlError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "dwh.cfg";
pub const CONFIG_PATH_ENV: &str = "DWH_CONFIG";
pub const DEFAULT_REGION: &str = "us-west-2";

/// SQL flavour of the target warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Amazon Redshift: layout hints are emitted and staging is loaded with `COPY`.
    Redshift,
    /// Plain PostgreSQL: layout hints are dropped and staging is loaded client-side.
    Postgres,
}

impl Dialect {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "redshift" => Ok(Dialect::Redshift),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(format!("unknown DIALECT `{}` (expected redshift or postgres)", other)),
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Dialect::Redshift => 5439,
            Dialect::Postgres => 5432,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Redshift => "redshift",
            Dialect::Postgres => "postgres",
        }
    }
}

#[derive(Clone)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

/// Source locations. For Redshift these are object-storage URIs; for
/// PostgreSQL they are local files or directories.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub log_data: String,
    /// Positional field mapping for the activity log (`jsonpaths` document).
    pub log_jsonpath: String,
    pub song_data: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    /// Role the warehouse assumes to read the bucket. Only required for Redshift.
    pub iam_role_arn: Option<String>,
    pub storage: StorageConfig,
    pub region: String,
    pub dialect: Dialect,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, EtlError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_ini_str(&text).map_err(|e| EtlError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_ini_str(text: &str) -> Result<Self, String> {
        let ini = Ini::parse(text)?;

        let dialect = match ini.get("ETL", "DIALECT") {
            Some(v) if !v.is_empty() => Dialect::parse(v)?,
            _ => Dialect::Redshift,
        };

        let port = match ini.get("CLUSTER", "DB_PORT") {
            Some(v) if !v.is_empty() => v
                .parse::<u16>()
                .map_err(|_| format!("[CLUSTER] DB_PORT must be a port number, got `{}`", v))?,
            _ => dialect.default_port(),
        };

        let cluster = ClusterConfig {
            host: ini.require("CLUSTER", "HOST")?,
            db_name: ini.require("CLUSTER", "DB_NAME")?,
            user: ini.require("CLUSTER", "DB_USER")?,
            password: ini.get("CLUSTER", "DB_PASSWORD").unwrap_or_default().to_string(),
            port,
        };

        let iam_role_arn = ini
            .get("IAM_ROLE", "ARN")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if dialect == Dialect::Redshift && iam_role_arn.is_none() {
            return Err("missing [IAM_ROLE] ARN (required for the redshift dialect)".to_string());
        }

        let storage = StorageConfig {
            log_data: ini.require("S3", "LOG_DATA")?,
            log_jsonpath: ini.require("S3", "LOG_JSONPATH")?,
            song_data: ini.require("S3", "SONG_DATA")?,
        };

        let region = ini
            .get("ETL", "REGION")
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        Ok(Config {
            cluster,
            iam_role_arn,
            storage,
            region,
            dialect,
        })
    }

    /// libpq keyword/value connection string.
    pub fn conninfo(&self) -> String {
        let c = &self.cluster;
        format!(
            "host={} dbname={} user={} password={} port={}",
            conninfo_value(&c.host),
            conninfo_value(&c.db_name),
            conninfo_value(&c.user),
            conninfo_value(&c.password),
            c.port
        )
    }

    pub fn iam_role(&self) -> Result<&str, EtlError> {
        self.iam_role_arn
            .as_deref()
            .ok_or_else(|| EtlError::Config("missing [IAM_ROLE] ARN".to_string()))
    }
}

fn conninfo_value(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Sections and keys are case-insensitive; both are stored upper-cased.
#[derive(Debug, Default)]
struct Ini {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Ini {
    fn parse(text: &str) -> Result<Self, String> {
        let mut ini = Ini::default();
        let mut current: Option<String> = None;

        for (index, line) in text.lines().enumerate() {
            let lineno = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| format!("line {}: unterminated section header", lineno))?
                    .trim();
                if name.is_empty() {
                    return Err(format!("line {}: empty section name", lineno));
                }
                let name = name.to_ascii_uppercase();
                ini.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let section = current
                .as_ref()
                .ok_or_else(|| format!("line {}: key outside of any section", lineno))?;
            let split_at = trimmed
                .find(['=', ':'])
                .ok_or_else(|| format!("line {}: missing '=' in assignment", lineno))?;
            let key = trimmed[..split_at].trim();
            if key.is_empty() {
                return Err(format!("line {}: key cannot be empty", lineno));
            }
            let value = parse_value(&trimmed[split_at + 1..]).map_err(|e| format!("line {}: {}", lineno, e))?;

            if let Some(keys) = ini.sections.get_mut(section) {
                keys.insert(key.to_ascii_uppercase(), value);
            }
        }

        Ok(ini)
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_ascii_uppercase())
            .and_then(|keys| keys.get(&key.to_ascii_uppercase()))
            .map(String::as_str)
    }

    fn require(&self, section: &str, key: &str) -> Result<String, String> {
        match self.get(section, key) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(format!("missing [{}] {}", section, key)),
        }
    }
}

fn parse_value(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('"') {
        parse_quoted(rest, '"')
    } else if let Some(rest) = trimmed.strip_prefix('\'') {
        parse_quoted(rest, '\'')
    } else {
        // Unquoted values are taken verbatim: passwords may contain '#' or ';'.
        Ok(trimmed.to_string())
    }
}

fn parse_quoted(input: &str, quote: char) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch == quote {
            let remainder = chars.as_str().trim();
            if remainder.is_empty() || remainder.starts_with('#') || remainder.starts_with(';') {
                return Ok(result);
            }
            return Err(format!("unexpected characters after closing {} quote", quote));
        }
        result.push(ch);
    }

    Err(format!("unterminated {}-quoted value", quote))
}
