//! Statement consumers.
//!
//! An [`Executor`] applies one statement at a time, in the order given. Any
//! error it returns is fatal for the import; statements already applied stay
//! applied.

use std::{io::Write, str::FromStr};

use anyhow::{Context, Result};
use log::{debug, info};
use sqlx::{
    Connection, Executor as _, PgConnection,
    postgres::{PgArguments, PgConnectOptions},
    query::Query,
};
use tokio::runtime::{Builder, Runtime};

use crate::{
    config::DatabaseTarget,
    sql::{SqlValue, Statement},
};

pub trait Executor {
    /// Applies `statement`, returning the number of affected rows.
    fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Called once after the last statement of a file.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes statements as a standalone SQL script instead of running them.
pub struct ScriptExecutor<W: Write> {
    out: W,
}

impl<W: Write> ScriptExecutor<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Executor for ScriptExecutor<W> {
    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        writeln!(self.out, "{}", statement.render()).context("Writing SQL script")?;
        Ok(u64::from(statement.sql.starts_with("INSERT")))
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("Flushing SQL script")
    }
}

/// Runs statements against PostgreSQL over a single connection with bound
/// parameters. Owns a current-thread runtime so callers stay synchronous.
pub struct PgExecutor {
    runtime: Runtime,
    connection: PgConnection,
}

impl PgExecutor {
    pub fn connect(target: &DatabaseTarget) -> Result<Self> {
        let options = connect_options(target)?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Starting database runtime")?;
        let connection = runtime
            .block_on(PgConnection::connect_with(&options))
            .with_context(|| format!("Connecting to {}", target.describe()))?;
        info!("Connected to {}", target.describe());
        Ok(Self {
            runtime,
            connection,
        })
    }
}

fn connect_options(target: &DatabaseTarget) -> Result<PgConnectOptions> {
    let options = match target {
        DatabaseTarget::Url(url) => {
            PgConnectOptions::from_str(url).context("Parsing database URL")?
        }
        DatabaseTarget::Settings(settings) => {
            let options = PgConnectOptions::new()
                .host(&settings.host)
                .port(settings.port)
                .username(&settings.user)
                .database(&settings.database);
            match &settings.password {
                Some(password) => options.password(password),
                None => options,
            }
        }
    };
    Ok(options)
}

fn bind_params<'q>(
    mut query: Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, sqlx::Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Integer(value) => query.bind(*value),
            SqlValue::Float(value) => query.bind(*value),
            SqlValue::Timestamp(value) | SqlValue::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

impl Executor for PgExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!("Executing: {statement}");
        let connection = &mut self.connection;
        let result = if statement.params.is_empty() {
            self.runtime
                .block_on(connection.execute(statement.sql.as_str()))
        } else {
            let query = bind_params(sqlx::query(&statement.sql), &statement.params);
            self.runtime.block_on(query.execute(connection))
        };
        let result = result.with_context(|| format!("Executing [{}]", statement.sql))?;
        Ok(result.rows_affected())
    }
}
