pub mod command;
pub mod config;
pub mod logging_system;

pub use command::Command;
pub use config::{Cli, Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{InitializationError, LoggingSystem, setup_logging};

use crate::buffer::BufferedConsumer;
use crate::sender::StdConsumer;
use crate::tracker::Mixpanel;
use anyhow::{Context, bail};
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Auto-flush failures kept for the end-of-run report.
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// One invocation of the `mixpanel-sender` binary.
#[derive(Debug)]
pub struct App {
    config: Config,
    command: Command,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        let config = cli.resolve_config()?;
        Ok(Self::new(config, cli.command))
    }

    pub fn new(config: Config, command: Command) -> Self {
        Self { config, command }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Sends the command's record, flushing buffered batches before returning.
    pub async fn run(self) -> anyhow::Result<()> {
        let token = self.config.require_token()?.to_string();
        let endpoints = self.config.endpoint_map()?;
        let consumer = StdConsumer::with_client_config(endpoints, self.config.client_config())
            .context("failed to build HTTP client")?;

        info!(
            command = self.command.name(),
            api_host = %self.config.api_host,
            buffer_size = ?self.config.buffer_size,
            "Running command"
        );

        let Some(buffer_size) = self.config.buffer_size else {
            let mixpanel = Mixpanel::new(token, Arc::new(consumer));
            return self.command.execute(&mixpanel).await;
        };

        let (buffered, mut failures) = BufferedConsumer::with_failure_channel(
            consumer,
            buffer_size,
            FAILURE_CHANNEL_CAPACITY,
        )?;
        let buffered = Arc::new(buffered);
        let mixpanel = Mixpanel::new(token, buffered.clone());

        let outcome = self.command.execute(&mixpanel).await;
        let flushed = buffered.flush_all().await;

        let mut dropped_batches = 0usize;
        while let Ok(failure) = failures.try_recv() {
            warn!(
                endpoint = %failure.endpoint,
                batch_id = %failure.batch_id,
                messages = failure.message_count,
                "Batch dropped: {}",
                failure.error
            );
            dropped_batches += 1;
        }

        outcome?;
        flushed?;
        let dropped_messages = buffered.dropped_messages();
        if dropped_batches > 0 || dropped_messages > 0 {
            bail!(
                "{dropped_messages} message(s) in {dropped_batches} reported batch(es) were dropped during delivery"
            );
        }
        Ok(())
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = match App::from_args(std::env::args_os()) {
        Ok(app) => app,
        // Help and version requests also arrive here.
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    let config = app.config();
    if let Err(e) = setup_logging(config.log_level, config.log_format, &config.log_directives) {
        eprintln!("Warning: {e}");
    }
    info!("Starting mixpanel-sender v{}", get_version());

    if let Err(e) = app.run().await {
        error!("Command failed: {e:#}");
        process::exit(1);
    }

    Ok(())
}
