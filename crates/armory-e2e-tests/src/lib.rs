use std::{fmt::Display, path::Path, time::Duration};

use anyhow::{Result, anyhow};
use armory_dal::gun::Gun;
use armory_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::{Url, redirect::Policy};
use tempfile::TempDir;
use tracing::info;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &["armory-e2e-tests", "--data-dir", &data_dir, "--port", &port];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Config with fresh data directory under system temp
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir)
}

/// Starts server in background and waits until health check answers
pub async fn spawn_server(args: ServerConfig) -> Result<Url> {
    let base_url = Url::parse(&args.base_url())?;
    tokio::spawn(async move {
        if let Err(e) = armory_server::run::run(args).await {
            tracing::error!("Test server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health = base_url.join("health")?;
    for _ in 0..50 {
        match client.get(health.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Server ready at {base_url}");
                return Ok(base_url);
            }
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    Err(anyhow!("Server did not start"))
}

/// Client that does not follow redirects, so form responses can be checked
pub fn page_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().redirect(Policy::none()).build()?)
}

pub fn extend_url(url: &Url, segment: impl Display) -> Url {
    let mut url = url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&segment.to_string());
    }
    url
}

pub async fn create_gun(
    client: &reqwest::Client,
    base_url: &Url,
    payload: &serde_json::Value,
) -> Result<Gun> {
    let api_url = base_url.join("api/guns")?;
    let response = client.post(api_url).json(payload).send().await?;
    info!("Response: {:#?}", response);
    if response.status().as_u16() != 201 {
        return Err(anyhow!("Unexpected status {}", response.status()));
    }
    Ok(response.json().await?)
}
