//! `BackupConfig` and validation.
//!
//! File loading (Properties/YAML with `${VAR[:default]}` interpolation) is
//! an external collaborator per spec.md §1/§6 — this module only defines
//! the typed shape a loader hands us, plus the validation invariants from
//! spec.md §3, plus thin `from_yaml_str`/`from_properties_str` helpers for
//! embedding hosts and tests that don't want to write their own loader.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dialect::{ConnectionInfo, Dialect};
use crate::error::BackupError;
use crate::scheduler::cron::CronSchedule;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "excludeSystemTables")]
    pub exclude_system_tables: ExcludeSystemTables,
    #[serde(rename = "includeTablePatterns")]
    pub include_table_patterns: Vec<String>,
    #[serde(rename = "excludeTablePatterns")]
    pub exclude_table_patterns: Vec<String>,
}

/// Wrapper so the default can be `true` without hand-writing a free function
/// for every `#[serde(default = "...")]` site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ExcludeSystemTables(pub bool);

impl Default for ExcludeSystemTables {
    fn default() -> Self {
        ExcludeSystemTables(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LocalDestinationConfig {
    pub enabled: bool,
    pub path: String,
    pub retention: u32,
    pub compress: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct S3DestinationConfig {
    pub enabled: bool,
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    #[serde(rename = "accessKey")]
    pub access_key: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub cron: String,
    pub timezone: Option<String>,
}

/// The `backup.*` key group: destination settings, nested under `backup`
/// the way spec.md §6's table lists `backup.local.*`/`backup.s3.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BackupDestinationsConfig {
    pub local: LocalDestinationConfig,
    pub s3: S3DestinationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BackupConfig {
    pub database: DatabaseConfig,
    pub backup: BackupDestinationsConfig,
    pub schedule: ScheduleConfig,
}

impl BackupConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BackupError> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| BackupError::ConfigInvalid(format!("invalid YAML config: {e}")))
    }

    /// Parse a flat Java-Properties-style `key=value` document (one entry per
    /// line, `#`/`!`-prefixed comments ignored) into the nested shape. Keys
    /// are dotted (`backup.local.enabled`, `backup.s3.bucket`), the same
    /// keys as spec.md §6's table.
    pub fn from_properties_str(props: &str) -> Result<Self, BackupError> {
        let mut map = serde_yaml_ng::Mapping::new();
        for line in props.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            insert_dotted(&mut map, key.trim(), value.trim());
        }
        serde_yaml_ng::from_value(serde_yaml_ng::Value::Mapping(map))
            .map_err(|e| BackupError::ConfigInvalid(format!("invalid properties config: {e}")))
    }

    /// Validate every invariant from spec.md §3, aggregating all violations
    /// rather than failing on the first one (so `Orchestrator::validate_config`
    /// can surface the complete list per spec.md §4.G).
    pub fn validate(&self) -> Vec<BackupError> {
        let mut errors = Vec::new();

        if self.database.url.is_empty() {
            errors.push(BackupError::ConfigInvalid(
                "database.url must not be empty".into(),
            ));
        } else if let Err(e) = ConnectionInfo::parse(&self.database.url) {
            errors.push(e);
        }

        if !self.backup.local.enabled && !self.backup.s3.enabled {
            errors.push(BackupError::ConfigInvalid(
                "at least one destination must be enabled".into(),
            ));
        }

        if self.backup.local.enabled && self.backup.local.path.is_empty() {
            errors.push(BackupError::ConfigInvalid(
                "backup.local.path must not be empty when backup.local.enabled is true".into(),
            ));
        }

        if self.backup.s3.enabled {
            for (field, value) in [
                ("backup.s3.bucket", &self.backup.s3.bucket),
                ("backup.s3.region", &self.backup.s3.region),
                ("backup.s3.accessKey", &self.backup.s3.access_key),
                ("backup.s3.secretKey", &self.backup.s3.secret_key),
            ] {
                if value.is_empty() {
                    errors.push(BackupError::ConfigInvalid(format!(
                        "{field} must not be empty when backup.s3.enabled is true"
                    )));
                }
            }
        }

        if self.schedule.enabled {
            if let Err(e) = CronSchedule::parse(&self.schedule.cron) {
                errors.push(e);
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub fn dialect(&self) -> Result<Dialect, BackupError> {
        Dialect::from_url(&self.database.url)
    }
}

/// Insert a dotted key (`backup.local.enabled`) as a nested mapping entry.
fn insert_dotted(root: &mut serde_yaml_ng::Mapping, key: &str, value: &str) {
    let parts: Vec<&str> = key.split('.').collect();
    insert_path(root, &parts, value);
}

fn insert_path(map: &mut serde_yaml_ng::Mapping, parts: &[&str], value: &str) {
    use serde_yaml_ng::Value;

    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let key = Value::String((*head).to_string());

    if rest.is_empty() {
        let parsed = parse_scalar(value);
        map.insert(key, parsed);
        return;
    }

    let entry = map
        .entry(key)
        .or_insert_with(|| Value::Mapping(serde_yaml_ng::Mapping::new()));
    if !entry.is_mapping() {
        *entry = Value::Mapping(serde_yaml_ng::Mapping::new());
    }
    if let Value::Mapping(nested) = entry {
        insert_path(nested, rest, value);
    }
}

fn parse_scalar(value: &str) -> serde_yaml_ng::Value {
    match value {
        "true" => serde_yaml_ng::Value::Bool(true),
        "false" => serde_yaml_ng::Value::Bool(false),
        _ => {
            if let Ok(i) = value.parse::<i64>() {
                serde_yaml_ng::Value::Number(i.into())
            } else {
                serde_yaml_ng::Value::String(value.to_string())
            }
        }
    }
}
