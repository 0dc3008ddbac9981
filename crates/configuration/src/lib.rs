use crate::error::ConfigError;
use core_types::is_plain_identifier;
use std::collections::{HashMap, HashSet};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    DatabaseSettings, ExecutionSettings, LogFormat, LoggingSettings, ProbeSettings,
    ScriptSettings, Settings, TeardownSettings, VerificationSettings,
};

/// The file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "bootstrap.toml";

const ENV_PREFIX: &str = "BOOTSTRAP";

/// Unprefixed variables honoured for compatibility with existing deployments.
/// Each maps onto one `database.*` key and wins over every other layer.
const LEGACY_ENV_KEYS: [(&str, &str); 6] = [
    ("PG_USER", "database.user"),
    ("PG_PASSWORD", "database.password"),
    ("PG_HOST", "database.host"),
    ("PG_PORT", "database.port"),
    ("PG_DB", "database.name"),
    ("DATABASE_URL", "database.url"),
];

/// Loads and validates the application settings.
///
/// Layers, lowest precedence first:
/// 1. built-in defaults,
/// 2. the TOML file at `path`, or `bootstrap.toml` in the working directory if
///    it exists (an explicitly named file must exist),
/// 3. `BOOTSTRAP__<SECTION>__<KEY>` environment variables,
/// 4. the legacy `PG_*` and `DATABASE_URL` variables.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_from(path, std::env::vars().collect())
}

/// Same as [`load_settings`] but reads variables from `env` instead of the
/// process environment.
pub fn load_settings_from(
    path: Option<&Path>,
    env: HashMap<String, String>,
) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => {
            config::File::new(&path.to_string_lossy(), config::FileFormat::Toml).required(true)
        }
        None => config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false),
    };

    let environment = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("execution.expected_failures")
        .with_list_parse_key("verification.expected_tables")
        .source(Some(env.clone().into_iter().collect()));

    let mut builder = config::Config::builder()
        .add_source(file)
        .add_source(environment);
    for (variable, key) in LEGACY_ENV_KEYS {
        builder = builder.set_override_option(key, env.get(variable).cloned())?;
    }

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    validate(&settings)?;
    Ok(settings)
}

/// Rejects settings that would only fail later, half-way through a run.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if settings.database.url.is_none() && settings.database.port == 0 {
        return invalid("database.port must be non-zero".to_string());
    }
    if !is_plain_identifier(&settings.database.schema) {
        return invalid(format!(
            "database.schema '{}' is not a plain identifier",
            settings.database.schema
        ));
    }
    if settings.script.path.as_os_str().is_empty() {
        return invalid("script.path must not be empty".to_string());
    }

    let verification = &settings.verification;
    if let Some(table) = verification
        .expected_tables
        .iter()
        .find(|table| !is_plain_identifier(table))
    {
        return invalid(format!(
            "verification.expected_tables: '{table}' is not a plain identifier"
        ));
    }
    let mut probe_names = HashSet::new();
    for probe in &verification.probes {
        if !is_plain_identifier(&probe.name) {
            return invalid(format!(
                "verification.probes: '{}' is not a plain identifier",
                probe.name
            ));
        }
        if probe.query.trim().is_empty() {
            return invalid(format!(
                "verification.probes: probe '{}' has an empty query",
                probe.name
            ));
        }
        if !probe_names.insert(probe.name.as_str()) {
            return invalid(format!(
                "verification.probes: duplicate probe name '{}'",
                probe.name
            ));
        }
    }

    settings
        .teardown
        .plan()
        .map_err(|e| ConfigError::ValidationError(format!("teardown.targets: {e}")))?;

    Ok(())
}
