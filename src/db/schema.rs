//! Diesel declarations for the two staging tables.
//!
//! Only staging rows are written through diesel (client-side loading on
//! PostgreSQL); the DDL itself lives in `crate::tables`. Staging tables have no
//! primary key, so `ts` / `song_id` stand in for diesel's required key column.

diesel::table! {
    staging_events (ts) {
        artist -> Nullable<Text>,
        auth -> Nullable<Text>,
        firstname -> Nullable<Text>,
        gender -> Nullable<Text>,
        iteminsession -> Nullable<Integer>,
        lastname -> Nullable<Text>,
        length -> Nullable<Double>,
        level -> Nullable<Text>,
        location -> Nullable<Text>,
        method -> Nullable<Text>,
        page -> Nullable<Text>,
        registration -> Nullable<Double>,
        sessionid -> Nullable<Integer>,
        song -> Nullable<Text>,
        status -> Nullable<Integer>,
        ts -> BigInt,
        useragent -> Nullable<Text>,
        userid -> Nullable<Text>,
    }
}

diesel::table! {
    staging_songs (song_id) {
        num_songs -> Nullable<Integer>,
        artist_id -> Nullable<Text>,
        artist_latitude -> Nullable<Double>,
        artist_longitude -> Nullable<Double>,
        artist_location -> Nullable<Text>,
        artist_name -> Nullable<Text>,
        song_id -> Nullable<Text>,
        title -> Nullable<Text>,
        duration -> Nullable<Double>,
        year -> Nullable<Integer>,
    }
}
