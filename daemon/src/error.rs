use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("nix error: {0}")]
    Nix(#[from] nix::Error),
    #[error("logger initialization failed: {0}")]
    Logger(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("seed file error: {0}")]
    Seed(#[from] serde_json::Error),
    #[error("graph error: {0}")]
    Graph(#[from] gremlin_core::GraphError),
    #[error("server error: {0}")]
    Http(#[from] hyper::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
