//! Staging row structs. They deserialize from JSON objects keyed by column
//! name and insert through diesel.
//!
//! Decoding mirrors what `COPY … FORMAT AS JSON` does with a record: unknown
//! keys are ignored, missing keys load as NULL, and text columns accept JSON
//! numbers as well as strings.

use diesel::prelude::*;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Insertable, Deserialize)]
#[diesel(table_name = schema::staging_events)]
pub struct NewStagingEvent {
    #[serde(default, deserialize_with = "text")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub auth: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub firstname: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub gender: Option<String>,
    #[serde(default)]
    pub iteminsession: Option<i32>,
    #[serde(default, deserialize_with = "text")]
    pub lastname: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "text")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub page: Option<String>,
    #[serde(default)]
    pub registration: Option<f64>,
    #[serde(default)]
    pub sessionid: Option<i32>,
    #[serde(default, deserialize_with = "text")]
    pub song: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    #[serde(default, deserialize_with = "text")]
    pub useragent: Option<String>,
    /// Logged-out activity carries an empty user id; it is stored as NULL so
    /// the integer casts in the transform never see a blank string.
    #[serde(default, deserialize_with = "identifier")]
    pub userid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Insertable, Deserialize)]
#[diesel(table_name = schema::staging_songs)]
pub struct NewStagingSong {
    #[serde(default)]
    pub num_songs: Option<i32>,
    #[serde(default, deserialize_with = "text")]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
    #[serde(default, deserialize_with = "text")]
    pub artist_location: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub song_id: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub year: Option<i32>,
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(TextVisitor)
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_any(TextVisitor)
}

fn identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text(deserializer)?.filter(|s| !s.trim().is_empty()))
}
