use core_types::{CoreError, ObjectKind, StoreErrorKind, TeardownPlan, TeardownTarget};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub script: ScriptSettings,
    pub execution: ExecutionSettings,
    pub verification: VerificationSettings,
    pub teardown: TeardownSettings,
    pub logging: LoggingSettings,
}

/// Where and how to reach the target PostgreSQL database.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// The database name.
    pub name: String,
    /// The working schema: the session `search_path` and the schema whose base
    /// tables are listed during verification.
    pub schema: String,
    /// A full connection URL. When set it takes precedence over the discrete fields.
    pub url: Option<String>,
    pub connect_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "biogas".to_string(),
            password: "biogas".to_string(),
            name: "biogas".to_string(),
            schema: "public".to_string(),
            url: None,
            connect_timeout_secs: 10,
        }
    }
}

// Credentials never reach the logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// The SQL script applied by `apply`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    pub path: PathBuf,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db/db.sql"),
        }
    }
}

/// Parameters for the sequential executor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Per-statement deadline in seconds. `0` disables it.
    pub statement_timeout_secs: u64,
    /// Error kinds that count as expected on a fresh or partially built database.
    pub expected_failures: Vec<StoreErrorKind>,
}

impl ExecutionSettings {
    pub fn statement_timeout(&self) -> Option<Duration> {
        (self.statement_timeout_secs > 0).then(|| Duration::from_secs(self.statement_timeout_secs))
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            statement_timeout_secs: 30,
            expected_failures: vec![
                StoreErrorKind::UndefinedTable,
                StoreErrorKind::UndefinedObject,
            ],
        }
    }
}

/// What the post-apply verification looks at.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Optional pause before verification starts, in milliseconds.
    pub settle_delay_ms: u64,
    /// Tables whose row counts are reported.
    pub expected_tables: Vec<String>,
    pub probes: Vec<ProbeSettings>,
}

impl VerificationSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 0,
            expected_tables: vec![
                "device".to_string(),
                "sensor_parameters".to_string(),
                "user_details".to_string(),
            ],
            probes: vec![ProbeSettings {
                name: "dashboard_data".to_string(),
                query: "SELECT * FROM dashboard_data LIMIT 1".to_string(),
                require_rows: false,
            }],
        }
    }
}

/// A named read query confirming that an object is usable.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    pub name: String,
    pub query: String,
    /// Treat an empty result as `Unavailable`.
    #[serde(default)]
    pub require_rows: bool,
}

/// The ordered list of objects dropped by `teardown`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeardownSettings {
    pub cascade: bool,
    /// Drop order, as written: views first, then child tables, then parents.
    pub targets: Vec<TeardownTarget>,
}

impl TeardownSettings {
    pub fn plan(&self) -> Result<TeardownPlan, CoreError> {
        TeardownPlan::new(self.targets.clone())
    }
}

impl Default for TeardownSettings {
    fn default() -> Self {
        let target = |kind, name: &str| TeardownTarget {
            kind,
            name: name.to_string(),
        };
        Self {
            cascade: true,
            targets: vec![
                target(ObjectKind::View, "dashboard_data"),
                target(ObjectKind::Table, "sensor_value"),
                target(ObjectKind::Table, "sensor_parameters"),
                target(ObjectKind::Table, "device_management"),
                target(ObjectKind::Table, "device"),
                target(ObjectKind::Table, "user_role_management"),
                target(ObjectKind::Table, "user_details"),
                target(ObjectKind::Table, "todo"),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}
