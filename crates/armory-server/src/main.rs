use armory_server::{
    config::{Parser as _, ServerConfig},
    run::run,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ServerConfig::parse();
    if let Err(e) = run(args).await {
        error!("Server failed: {e:#}");
        std::process::exit(1);
    }
}
