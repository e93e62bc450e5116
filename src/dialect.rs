//! SQL dialect dispatch.
//!
//! A [`Dialect`] owns everything that differs between MySQL and PostgreSQL:
//! identifier quoting, the system-schema exclusion set, literal escaping,
//! and the preamble/epilogue wrapped around a dump. Connection strings are
//! the single authoritative config shape (spec.md §9's open question);
//! `Dialect::from_url` and `ConnectionInfo::parse` are the one parsing path.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BackupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Infer the dialect from a JDBC-style URL prefix (`jdbc:mysql://...` or
    /// `jdbc:postgresql://...`, the `jdbc:` prefix itself is optional).
    pub fn from_url(url: &str) -> Result<Self, BackupError> {
        let lower = url.to_ascii_lowercase();
        let body = lower.strip_prefix("jdbc:").unwrap_or(&lower);
        if body.starts_with("mysql:") {
            Ok(Dialect::MySql)
        } else if body.starts_with("postgresql:") || body.starts_with("postgres:") {
            Ok(Dialect::Postgres)
        } else {
            Err(BackupError::ConfigInvalid(format!(
                "cannot infer dialect from database.url: {url}"
            )))
        }
    }

    /// Identifier quote character: backtick for MySQL, double quote for PostgreSQL.
    pub fn quote_char(&self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres => '"',
        }
    }

    /// Quote a schema-unqualified identifier, doubling any embedded quote char.
    pub fn quote_ident(&self, ident: &str) -> String {
        let q = self.quote_char();
        let escaped = ident.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quote a schema-qualified identifier (`schema.table`).
    pub fn quote_qualified(&self, schema: &str, name: &str) -> String {
        format!("{}.{}", self.quote_ident(schema), self.quote_ident(name))
    }

    /// Escape a string literal's body (the caller adds surrounding quotes).
    pub fn escape_literal(&self, s: &str) -> String {
        match self {
            // MySQL allows backslash escapes in string literals.
            Dialect::MySql => s.replace('\\', "\\\\").replace('\'', "\\'"),
            // PostgreSQL (standard_conforming_strings) only doubles quotes.
            Dialect::Postgres => s.replace('\'', "''"),
        }
    }

    /// Preamble emitted before any per-table statements.
    pub fn preamble(&self) -> &'static str {
        match self {
            Dialect::MySql => "SET FOREIGN_KEY_CHECKS=0;",
            Dialect::Postgres => "BEGIN;\nSET CONSTRAINTS ALL DEFERRED;",
        }
    }

    /// Epilogue restoring whatever the preamble toggled.
    pub fn epilogue(&self) -> &'static str {
        match self {
            Dialect::MySql => "SET FOREIGN_KEY_CHECKS=1;",
            Dialect::Postgres => "COMMIT;",
        }
    }

    /// Human-readable name used in the dump's header comment and artifact metadata.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dialect::MySql => "MySQL",
            Dialect::Postgres => "PostgreSQL",
        }
    }

    /// Fixed system-schema exclusion globs, applied when `excludeSystemTables` is set.
    pub fn system_table_patterns(&self) -> &'static [&'static str] {
        match self {
            Dialect::MySql => &[
                "information_schema.*",
                "mysql.*",
                "performance_schema.*",
                "sys.*",
                "flyway_*",
                "liquibase*",
                "__*",
            ],
            Dialect::Postgres => &[
                "information_schema.*",
                "pg_*",
                "spatial_ref_sys",
                "geometry_columns",
                "geography_columns",
                "raster_columns",
                "raster_overviews",
                "flyway_*",
                "liquibase*",
                "__*",
            ],
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Parsed connection parameters plus the originating dialect.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub dialect: Dialect,
    pub url: String,
    pub database: String,
    pub schema: Option<String>,
}

static DB_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:jdbc:)?(?:mysql|postgresql|postgres)://[^/]+/([^?;]+)").unwrap()
});

static QUERY_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[?&;](currentSchema|searchPath)=([^&;]+)").unwrap());

impl ConnectionInfo {
    /// Parse a JDBC-style URL, extracting the dialect, database segment, and
    /// an optional schema from `currentSchema`/`searchPath` (PostgreSQL).
    pub fn parse(url: &str) -> Result<Self, BackupError> {
        let dialect = Dialect::from_url(url)?;

        let database = DB_SEGMENT_RE
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                BackupError::ConfigInvalid(format!("database.url is missing a database name: {url}"))
            })?;

        let schema = QUERY_PARAM_RE
            .captures(url)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().split(',').next().unwrap_or("").to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            dialect,
            url: url.to_string(),
            database,
            schema,
        })
    }

    /// Build a `ConnectionInfo` from the older host/port/name/type shape
    /// (spec.md §9's second open question) by composing the equivalent JDBC
    /// URL and delegating to [`ConnectionInfo::parse`], so there remains
    /// exactly one place that interprets connection parameters.
    pub fn from_host_port(
        dialect: Dialect,
        host: &str,
        port: u16,
        database: &str,
    ) -> Result<Self, BackupError> {
        let scheme = match dialect {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgresql",
        };
        let url = format!("jdbc:{scheme}://{host}:{port}/{database}");
        Self::parse(&url)
    }
}
