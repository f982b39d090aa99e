#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use ec2dash::app::config::{connection_from_env, ServerConfig};
use ec2dash::app::{persistence, server, InstanceConsole};

fn init_logging() {
    // RUST_LOG wins; otherwise default to info for the app and quiet the
    // chatty AWS SDK internals.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::builder()
            .parse("ec2dash=info,aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,aws_endpoint=warn,hyper=warn")
            .expect("Failed to parse env filter")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!(
        "ec2dash {} ({}@{})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_BRANCH"),
        env!("GIT_COMMIT")
    );

    let config = ServerConfig::from_env();
    let console = Arc::new(InstanceConsole::new());

    match connection_from_env() {
        Some(context) => match console.connect(context.clone()).await {
            Ok(()) => {
                info!("session connected from environment credentials");
                if config.persist_credentials {
                    if let Err(e) = persistence::save(&context) {
                        warn!("failed to persist credentials: {}", e);
                    }
                } else if persistence::remove() {
                    info!("removed previously persisted credentials");
                }
            }
            Err(e) => warn!("environment credentials rejected: {}", e),
        },
        None => match persistence::load() {
            Some(stored) => match console.connect(stored.context).await {
                Ok(()) => info!(
                    "session restored from credentials persisted {}",
                    stored.saved_at
                ),
                Err(e) => warn!("persisted credentials rejected: {}", e),
            },
            None => warn!(
                "no AWS credentials in environment or persisted store; \
                 API requests will fail validation until the server is \
                 restarted with credentials"
            ),
        },
    }

    server::serve(&config, console).await
}
