use crate::error::{BadEnvVarSnafu, CohortToolsResult, ParseOriginSnafu, ParsePortSnafu};
use axum::http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use std::{path::PathBuf, sync::Arc};

pub const DEFAULT_PORT: u16 = 5005;
pub const DEFAULT_DATABASE_URL: &str = "postgres://127.0.0.1:5432/cohort-tools-api";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://example.com";
pub const DEFAULT_PUBLIC_DIR: &str = "public";

///`DATABASE_URL` value that swaps postgres for the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    port: u16,
    db_config: Arc<DbConfig>,
    allowed_origins: Arc<[HeaderValue]>,
    public_dir: PathBuf,
}

impl RuntimeConfiguration {
    pub fn new() -> CohortToolsResult<Self> {
        Self::from_lookup(|name| match dotenvy::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => Ok(None),
            Err(source) => Err(source).context(BadEnvVarSnafu { name }),
        })
    }

    ///builds the configuration from any source of variables, unset ones fall back to the defaults
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> CohortToolsResult<Option<String>>,
    ) -> CohortToolsResult<Self> {
        let port = match lookup("COHORT_TOOLS_PORT")? {
            Some(original) => original
                .trim()
                .parse()
                .context(ParsePortSnafu { original })?,
            None => DEFAULT_PORT,
        };

        let database_url = lookup("DATABASE_URL")?
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let allowed_origins = lookup("COHORT_TOOLS_ALLOWED_ORIGINS")?
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).context(ParseOriginSnafu { original: origin })
            })
            .collect::<CohortToolsResult<Vec<_>>>()?;

        let public_dir = lookup("COHORT_TOOLS_PUBLIC_DIR")?
            .map_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR), PathBuf::from);

        Ok(Self {
            port,
            db_config: Arc::new(DbConfig {
                url: SecretString::from(database_url),
            }),
            allowed_origins: allowed_origins.into(),
            public_dir,
        })
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn db_config(&self) -> Arc<DbConfig> {
        self.db_config.clone()
    }

    pub fn allowed_origins(&self) -> &[HeaderValue] {
        &self.allowed_origins
    }

    pub fn public_dir(&self) -> &PathBuf {
        &self.public_dir
    }
}

#[derive(Debug)]
pub struct DbConfig {
    url: SecretString,
}

impl DbConfig {
    pub const fn get_db_url(&self) -> &SecretString {
        &self.url
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.expose_secret().trim() == MEMORY_DATABASE_URL
    }
}
