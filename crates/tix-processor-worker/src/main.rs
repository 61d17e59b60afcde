//! TiX report-processing worker.
//!
//! This binary consumes report-batch messages from a durable AMQP queue,
//! drives the `tix-processor-core` analysis pipeline and posts condensed
//! results to the reporting API. One message is fully processed before the
//! next is pulled (prefetch = 1); the ack/reject policy is decided by
//! [`worker::process_message`].
//!
//! Configuration comes from `TIX_*` environment variables (broker, queue
//! name, API endpoint and credentials, log level). The process exits zero
//! on a clean shutdown signal and nonzero on a fatal broker failure, so a
//! supervisor can restart it.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod worker;

use api::ApiClient;
use config::Config;
use worker::{Disposition, process_message};

#[derive(Parser, Debug)]
#[command(name = "tix-processor")]
#[command(version)]
#[command(about = "Queue worker condensing TiX probe reports into link-quality results.")]
struct Cli {
    /// Stop after N messages (tests only).
    #[arg(long, hide = true)]
    max_messages: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_filter()))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = format!("{err:#}"), "fatal");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let sink = ApiClient::new(config.api.clone())?;

    let connection = Connection::connect(
        &config.broker.amqp_uri(),
        ConnectionProperties::default(),
    )
    .await
    .with_context(|| {
        format!(
            "failed to connect to broker at {}:{}",
            config.broker.host, config.broker.port
        )
    })?;
    let channel = connection
        .create_channel()
        .await
        .context("failed to open broker channel")?;

    channel
        .queue_declare(
            &config.broker.queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .context("queue declare failed")?;
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .context("basic_qos failed")?;

    let mut consumer = channel
        .basic_consume(
            &config.broker.queue,
            "tix-processor",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("basic_consume failed")?;

    info!(queue = %config.broker.queue, "consuming");
    let mut processed = 0u64;
    loop {
        let delivery = tokio::select! {
            delivery = consumer.next() => match delivery {
                Some(delivery) => delivery.context("broker channel dropped")?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        };

        match process_message(&delivery.data, &sink).await {
            Disposition::Ack => delivery
                .ack(BasicAckOptions::default())
                .await
                .context("ack failed")?,
            Disposition::Reject { requeue } => delivery
                .reject(BasicRejectOptions { requeue })
                .await
                .context("reject failed")?,
        }

        processed += 1;
        if cli.max_messages.is_some_and(|max| processed >= max) {
            info!(processed, "message limit reached");
            break;
        }
    }

    Ok(())
}
