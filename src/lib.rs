//! Provisions the sparkify star-schema warehouse and fills it from the song
//! catalog and the listening activity log.

pub mod app;
pub mod config;
pub mod db {
    pub mod models;
    pub mod schema;
    pub mod warehouse;
}
pub mod error;
pub mod services {
    pub mod bulk_load;
    pub mod ingest;
    pub mod schema_manager;
    pub mod source;
    pub mod transform;
}
pub mod sql;
pub mod tables;
