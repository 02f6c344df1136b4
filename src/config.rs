//! Destination database settings.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. `DATABASE_URL` wins when present; otherwise the connection is
//! assembled from the individual `POSTGRES_*` variables.

use std::{env, path::Path};

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required when DATABASE_URL is not set")]
    Missing(&'static str),
    #[error("Environment variable {name} must be a port number, got '{value}'")]
    InvalidPort { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    Settings(ConnectionSettings),
}

impl DatabaseTarget {
    /// Resolves the target from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty("DATABASE_URL") {
            return Ok(DatabaseTarget::Url(url));
        }

        let port = match ["POSTGRES_PORT", "LOCAL_DATABASE_PORT"]
            .into_iter()
            .find_map(|name| non_empty(name).map(|value| (name, value)))
        {
            Some((name, value)) => {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort {
                        name,
                        value: value.clone(),
                    })?
            }
            None => DEFAULT_PORT,
        };

        Ok(DatabaseTarget::Settings(ConnectionSettings {
            host: non_empty("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            user: non_empty("POSTGRES_USER").ok_or(ConfigError::Missing("POSTGRES_USER"))?,
            password: lookup("POSTGRES_PASSWORD"),
            database: non_empty("POSTGRES_DB").ok_or(ConfigError::Missing("POSTGRES_DB"))?,
        }))
    }

    /// Loads `env_file` (or `./.env` when present) into the environment and
    /// resolves the target from it. An explicit URL skips the environment.
    pub fn resolve(url_override: Option<&str>, env_file: Option<&Path>) -> Result<Self> {
        if let Some(url) = url_override {
            return Ok(DatabaseTarget::Url(url.to_string()));
        }
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("Loading environment file {path:?}"))?;
                debug!("Loaded environment from {path:?}");
            }
            None => match dotenvy::dotenv() {
                Ok(path) => debug!("Loaded environment from {path:?}"),
                Err(err) if err.not_found() => {}
                Err(err) => return Err(err).context("Loading .env file"),
            },
        }
        Ok(Self::from_lookup(|name| env::var(name).ok())?)
    }

    /// Human-readable target without credentials.
    pub fn describe(&self) -> String {
        match self {
            DatabaseTarget::Url(url) => redact_url(url),
            DatabaseTarget::Settings(settings) => format!(
                "postgresql://{}@{}:{}/{}",
                settings.user, settings.host, settings.port, settings.database
            ),
        }
    }
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}@{host}")
        }
        None => url.to_string(),
    }
}
