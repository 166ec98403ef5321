//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Maximum accepted upload size: 50 MB.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub uploads_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5001".parse().expect("static addr"),
            uploads_dir: PathBuf::from("uploads"),
            db_path: PathBuf::from("articles.db"),
        }
    }
}

impl ServerConfig {
    /// `SCRIBA_ADDR`, `SCRIBA_UPLOADS` and `SCRIBA_DB` override the defaults.
    /// A malformed address is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("SCRIBA_ADDR") {
            match raw.parse() {
                Ok(addr) => config.addr = addr,
                Err(_) => tracing::warn!(value = %raw, "Ignoring malformed SCRIBA_ADDR"),
            }
        }
        if let Ok(dir) = std::env::var("SCRIBA_UPLOADS") {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("SCRIBA_DB") {
            config.db_path = PathBuf::from(path);
        }

        config
    }
}
