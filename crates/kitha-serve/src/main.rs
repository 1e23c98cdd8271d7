//! Kitha prediction service entry point.

use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kitha_serve::{server, ServeConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kitha_serve=info,kitha_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServeConfig::default().apply_env(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run(&config).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
