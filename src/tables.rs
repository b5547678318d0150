//! Registry of every warehouse table: columns, constraints, layout hints and
//! the references between them.
//!
//! DROP, CREATE and INSERT ordering is derived from the `references` of each
//! column instead of being sequenced by hand, so the fact table is always
//! created and populated after the dimensions it points at.

use crate::config::Dialect;
use crate::sql::quote_ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    /// Transient landing table filled by the bulk loader.
    Staging,
    /// Deduplicated descriptive entities.
    Dimension,
    /// One row per song play.
    Fact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub not_null: bool,
    pub primary_key: bool,
    /// Redshift `SORTKEY`.
    pub sort_key: bool,
    /// Redshift `DISTKEY`.
    pub dist_key: bool,
    /// `(table, column)` this column references.
    pub references: Option<(&'static str, &'static str)>,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Column {
            name,
            sql_type,
            not_null: false,
            primary_key: false,
            sort_key: false,
            dist_key: false,
            references: None,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Primary keys are also declared NOT NULL.
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub const fn sort_key(mut self) -> Self {
        self.sort_key = true;
        self
    }

    pub const fn dist_key(mut self) -> Self {
        self.dist_key = true;
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    fn definition(&self, dialect: Dialect) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        if dialect == Dialect::Redshift {
            if self.dist_key {
                def.push_str(" DISTKEY");
            }
            if self.sort_key {
                def.push_str(" SORTKEY");
            }
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if let Some((table, column)) = self.references {
            def.push_str(&format!(" REFERENCES {} ({})", quote_ident(table), column));
        }
        def
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub role: TableRole,
    pub columns: &'static [Column],
    /// Redshift `DISTSTYLE ALL`: replicate the table on every node.
    pub dist_all: bool,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Tables this one references, in column order, without duplicates.
    pub fn dependencies(&self) -> Vec<&'static str> {
        let mut deps = Vec::new();
        for (table, _) in self.columns.iter().filter_map(|c| c.references) {
            if table != self.name && !deps.contains(&table) {
                deps.push(table);
            }
        }
        deps
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", quote_ident(self.name))
    }

    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.definition(dialect)))
            .collect::<Vec<_>>()
            .join(",\n");
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", quote_ident(self.name), columns);
        if dialect == Dialect::Redshift && self.dist_all {
            sql.push_str(" DISTSTYLE ALL");
        }
        sql.push(';');
        sql
    }
}

pub const STAGING_EVENTS: Table = Table {
    name: "staging_events",
    role: TableRole::Staging,
    columns: &[
        Column::new("artist", "text"),
        Column::new("auth", "text"),
        Column::new("firstname", "text"),
        Column::new("gender", "char(1)"),
        Column::new("iteminsession", "integer"),
        Column::new("lastname", "text"),
        Column::new("length", "float"),
        Column::new("level", "text"),
        Column::new("location", "text"),
        Column::new("method", "char(3)"),
        Column::new("page", "text"),
        Column::new("registration", "float"),
        Column::new("sessionid", "integer"),
        Column::new("song", "text"),
        Column::new("status", "integer"),
        Column::new("ts", "bigint").not_null(),
        Column::new("useragent", "text"),
        Column::new("userid", "text"),
    ],
    dist_all: false,
};

pub const STAGING_SONGS: Table = Table {
    name: "staging_songs",
    role: TableRole::Staging,
    columns: &[
        Column::new("num_songs", "integer"),
        Column::new("artist_id", "text"),
        Column::new("artist_latitude", "float"),
        Column::new("artist_longitude", "float"),
        Column::new("artist_location", "text"),
        Column::new("artist_name", "text"),
        Column::new("song_id", "text"),
        Column::new("title", "text"),
        Column::new("duration", "float"),
        Column::new("year", "integer"),
    ],
    dist_all: false,
};

pub const SONGPLAY: Table = Table {
    name: "songplay",
    role: TableRole::Fact,
    columns: &[
        Column::new("start_time", "bigint").not_null().references("time", "start_time"),
        Column::new("user_id", "integer").not_null().references("users", "user_id"),
        Column::new("level", "text").not_null(),
        Column::new("song_id", "text").sort_key().dist_key().references("song", "song_id"),
        Column::new("artist_id", "text").references("artist", "artist_id"),
        Column::new("session_id", "integer").not_null(),
        Column::new("location", "text"),
        Column::new("user_agent", "text"),
    ],
    dist_all: false,
};

pub const USERS: Table = Table {
    name: "users",
    role: TableRole::Dimension,
    columns: &[
        Column::new("user_id", "integer").sort_key().primary_key(),
        Column::new("first_name", "text").not_null(),
        Column::new("last_name", "text").not_null(),
        Column::new("gender", "char(1)").not_null(),
        Column::new("level", "text").not_null(),
    ],
    dist_all: true,
};

pub const SONG: Table = Table {
    name: "song",
    role: TableRole::Dimension,
    columns: &[
        Column::new("song_id", "text").dist_key().primary_key(),
        Column::new("title", "text").not_null(),
        Column::new("artist_id", "text").not_null(),
        Column::new("year", "integer").not_null(),
        Column::new("duration", "float").not_null(),
    ],
    dist_all: false,
};

pub const ARTIST: Table = Table {
    name: "artist",
    role: TableRole::Dimension,
    columns: &[
        Column::new("artist_id", "text").sort_key().primary_key(),
        Column::new("name", "text").not_null(),
        Column::new("location", "text").not_null(),
        Column::new("latitude", "float"),
        Column::new("longitude", "float"),
    ],
    dist_all: true,
};

pub const TIME: Table = Table {
    name: "time",
    role: TableRole::Dimension,
    columns: &[
        Column::new("start_time", "bigint").sort_key().primary_key(),
        Column::new("hour", "integer").not_null(),
        Column::new("day", "integer").not_null(),
        Column::new("week", "integer").not_null(),
        Column::new("month", "integer").not_null(),
        Column::new("year", "integer").not_null(),
        Column::new("weekday", "integer").not_null(),
    ],
    dist_all: true,
};

/// Every table the warehouse owns. Order here is cosmetic; execution order
/// comes from [`creation_order`].
pub const TABLES: &[Table] = &[STAGING_EVENTS, STAGING_SONGS, SONGPLAY, USERS, SONG, ARTIST, TIME];

/// Topological order over `references`: every table comes after the tables it
/// references. Ties keep registry order.
pub fn creation_order(tables: &[Table]) -> Result<Vec<&Table>, String> {
    for table in tables {
        for dep in table.dependencies() {
            if !tables.iter().any(|t| t.name == dep) {
                return Err(format!("table {} references unknown table {}", table.name, dep));
            }
        }
    }

    let mut ordered: Vec<&Table> = Vec::with_capacity(tables.len());
    while ordered.len() < tables.len() {
        let next = tables.iter().find(|t| {
            !ordered.iter().any(|o| o.name == t.name)
                && t.dependencies().iter().all(|dep| ordered.iter().any(|o| o.name == *dep))
        });
        match next {
            Some(table) => ordered.push(table),
            None => {
                let stuck = tables
                    .iter()
                    .filter(|t| !ordered.iter().any(|o| o.name == t.name))
                    .map(|t| t.name)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(format!("circular table references between: {}", stuck));
            }
        }
    }
    Ok(ordered)
}

/// Reverse of [`creation_order`]: referencing tables are dropped first.
pub fn drop_order(tables: &[Table]) -> Result<Vec<&Table>, String> {
    let mut order = creation_order(tables)?;
    order.reverse();
    Ok(order)
}
