//! sol-ctl - control plane CLI for sol telemetry
//!
//! Drives the command stream that connected applications replay:
//!   sol-ctl enable svc.worker     Switch a logger on, everywhere
//!   sol-ctl disable svc.worker    Switch it off
//!   sol-ctl tail                  Follow a stream from its earliest offset

use std::time::Duration;

use clap::{Parser, Subcommand};

use sol::constants::{
    DEFAULT_COMMANDS_TOPIC, DEFAULT_LOG_TOPIC, STATUS_DISABLED, STATUS_ENABLED,
    STREAM_REPLICATION,
};
use sol::{
    init_tracing, CommandKey, CommandStatus, EventSink, KafkaSink, Record, StreamSpec,
};

// =============================================================================
// CLI Definition
// =============================================================================

/// Control plane CLI for sol telemetry
#[derive(Parser, Debug)]
#[command(name = "sol-ctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Broker list, comma-separated host:port pairs
    #[arg(long, value_name = "BROKERS", default_value = "localhost:9092", global = true)]
    brokers: String,

    /// Stream carrying enable/disable commands
    #[arg(long, value_name = "TOPIC", default_value = DEFAULT_COMMANDS_TOPIC, global = true)]
    commands_topic: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Switch a logger on in every connected application
    Enable {
        /// Logger name, e.g. svc.worker
        logger: String,
    },

    /// Switch a logger off in every connected application
    Disable {
        /// Logger name, e.g. svc.worker
        logger: String,
    },

    /// Print a stream's records as they arrive
    Tail {
        /// Stream to follow
        #[arg(long, value_name = "TOPIC", default_value = DEFAULT_LOG_TOPIC)]
        topic: String,
    },
}

// =============================================================================
// Entry point
// =============================================================================

#[tokio::main]
async fn main() -> sol::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let sink = KafkaSink::new(&cli.brokers)?;
    match cli.command {
        Command::Enable { logger } => {
            send_command(&sink, &cli.commands_topic, &logger, STATUS_ENABLED).await
        }
        Command::Disable { logger } => {
            send_command(&sink, &cli.commands_topic, &logger, STATUS_DISABLED).await
        }
        Command::Tail { topic } => tail(&sink, &topic).await,
    }
}

async fn send_command(
    sink: &KafkaSink,
    topic: &str,
    logger: &str,
    status: &str,
) -> sol::Result<()> {
    sink.ensure_stream(&StreamSpec::single(topic, STREAM_REPLICATION))
        .await?;

    let key = CommandKey {
        logger_name: logger.to_string(),
    };
    let value = CommandStatus {
        status: status.to_string(),
    };
    let record = Record {
        stream: topic.to_string(),
        partition: None,
        // Two plain structs of strings; serialization cannot fail.
        key: serde_json::to_vec(&key)
            .expect("Command key serialization failed")
            .into(),
        value: serde_json::to_vec(&value)
            .expect("Command status serialization failed")
            .into(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    };
    sink.publish(record)?;
    // The process exits right after; without a flush the command dies in
    // the local producer queue.
    sink.flush(Duration::from_secs(5))?;
    println!("{status} {logger}");
    Ok(())
}

async fn tail(sink: &KafkaSink, topic: &str) -> sol::Result<()> {
    let group = format!("sol-ctl-tail-{}", chrono::Utc::now().timestamp_millis());
    let mut consumer = sink.subscribe(topic, &group).await?;
    eprintln!("Tailing '{topic}' from the earliest offset; Ctrl-C stops.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            polled = consumer.poll(Duration::from_millis(500)) => {
                for record in polled? {
                    println!(
                        "[{}@{}] {} {}",
                        record.partition,
                        record.offset,
                        String::from_utf8_lossy(&record.key),
                        String::from_utf8_lossy(&record.value),
                    );
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
