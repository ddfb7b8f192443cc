//! CLI module for cypher-ogm.
//!
//! Subcommands:
//! - `ping`: Check that the database answers a trivial statement
//! - `query`: Run one Cypher statement and print its rows as JSON

mod ping;
mod query;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use crate::config::Config;
use crate::execution::BatchExecutor;
use crate::graph::backends::http::HttpDriver;

/// cypher-ogm - object-graph mapper for Cypher databases
#[derive(Parser)]
#[command(name = "cypher-ogm")]
#[command(about = "Run Cypher statements through the batching executor")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check connectivity with `RETURN 1 AS x`
    Ping,

    /// Run a single statement and print each row as JSON
    Query {
        /// Cypher statement text
        statement: String,

        /// Parameter as name=json (repeatable); non-JSON values are strings
        #[arg(short, long = "param", value_name = "NAME=JSON")]
        params: Vec<String>,

        /// Database to run against (overrides configuration)
        #[arg(long)]
        database: Option<String>,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Ping => self.run_ping().await,
            Command::Query {
                ref statement,
                ref params,
                ref database,
            } => self.run_query(statement, params, database.as_deref()).await,
        }
    }

    /// Loads configuration and builds an executor over the HTTP driver.
    fn executor(&self, database: Option<&str>) -> Result<BatchExecutor<HttpDriver>> {
        let mut config = Config::load()?;
        if let Some(database) = database {
            config.execution.database = Some(database.to_string());
        }

        tracing::info!("Using database endpoint {}", config.connection.uri);
        let driver = HttpDriver::new(&config.connection)?;
        Ok(BatchExecutor::new(driver, config.execution))
    }
}
