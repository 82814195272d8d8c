use std::path::PathBuf;

use armory_app::state::AppConfig;
pub use clap::Parser;

const DATABASE_FILE: &str = "antique_inventory.db";

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 8080,
        env = "ARMORY_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "ARMORY_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "ARMORY_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/antique_inventory.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "ARMORY_DATA_DIR",
        default_value = "./data",
        help = "Data directory, holds database file unless --database-url is given"
    )]
    data_dir: String,

    #[arg(
        long,
        env = "ARMORY_UPLOAD_LIMIT_MB",
        default_value = "20",
        help = "Maximum upload size in MB"
    )]
    pub upload_limit_mb: usize,

    #[arg(long, env = "ARMORY_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/{DATABASE_FILE}", self.data_dir))
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.listen_address, self.port)
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            upload_limit_mb: config.upload_limit_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["armory-server"]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.listen_address, "127.0.0.1");
        assert_eq!(config.upload_limit_mb, 20);
        assert!(!config.cors);
        assert_eq!(config.data_dir(), PathBuf::from("./data"));
        assert_eq!(
            config.database_url(),
            "sqlite://./data/antique_inventory.db"
        );
    }

    #[test]
    fn test_explicit_database_url() {
        let config = ServerConfig::try_parse_from([
            "armory-server",
            "--data-dir",
            "/tmp/guns",
            "--database-url",
            "sqlite://other.db",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(config.database_url(), "sqlite://other.db");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/guns"));
        assert_eq!(config.base_url(), "http://127.0.0.1:9000/");
        let app_config = AppConfig::from(&config);
        assert_eq!(app_config.upload_limit_mb, 20);
    }
}
