use crate::error::DbError;
use crate::pg_store::PgStore;
use async_trait::async_trait;
use configuration::DatabaseSettings;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::time::Duration;
use store::{StoreConnector, StoreError};

const APPLICATION_NAME: &str = "schema-bootstrap";

/// Opens single, scoped PostgreSQL connections.
///
/// Connection options are resolved once, up front, so that a malformed URL is
/// reported before the lifecycle starts rather than on the first connect.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgConnector {
    /// Builds a connector from the resolved database settings.
    ///
    /// `DATABASE_URL` (when set) wins over the discrete host/port/user fields.
    /// The configured schema becomes the session `search_path`, so script
    /// statements, row counts and probes all resolve unqualified names in the
    /// schema the catalog listing reads. A `statement_timeout` is forwarded as
    /// a session parameter so the server cancels runaway statements on its
    /// side as well.
    pub fn from_settings(
        settings: &DatabaseSettings,
        statement_timeout: Option<Duration>,
    ) -> Result<Self, DbError> {
        let options = match settings.url.as_deref() {
            Some(url) => {
                PgConnectOptions::from_str(url).map_err(|e| DbError::InvalidUrl(e.to_string()))?
            }
            None => {
                if settings.host.trim().is_empty() {
                    return Err(DbError::ConnectionConfigError(
                        "database host must not be empty".to_string(),
                    ));
                }
                PgConnectOptions::new()
                    .host(&settings.host)
                    .port(settings.port)
                    .username(&settings.user)
                    .password(&settings.password)
                    .database(&settings.name)
            }
        };

        let mut session = vec![("search_path", settings.schema.clone())];
        if let Some(timeout) = statement_timeout {
            session.push(("statement_timeout", timeout.as_millis().to_string()));
        }
        let options = options.application_name(APPLICATION_NAME).options(session);

        Ok(Self {
            options,
            connect_timeout: settings.connect_timeout(),
        })
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    type Store = PgStore;

    async fn connect(&self) -> Result<PgStore, StoreError> {
        let attempt = PgConnection::connect_with(&self.options);
        let conn = tokio::time::timeout(self.connect_timeout, attempt)
            .await
            .map_err(|_| {
                StoreError::connection(format!(
                    "no connection within {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| StoreError::connection(e.to_string()))?;

        tracing::info!("Connected to PostgreSQL database");
        Ok(PgStore::new(conn))
    }
}
