use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DaemonError, Result};

const DEFAULT_CONFIG_ENV: &str = "GREMLIND_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub working_directory: PathBuf,
    pub pid_file: Option<PathBuf>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub umask: Option<u32>,
    pub log_level: Option<String>,
    pub graph: GraphSettings,
    pub server: ServerSettings,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("/"),
            pid_file: Some(PathBuf::from("gremlind.pid")),
            stdin: None,
            stdout: Some(PathBuf::from("gremlind.log")),
            stderr: None,
            umask: Some(0o027),
            log_level: Some(String::from("info")),
            graph: GraphSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl DaemonConfig {
    pub fn from_sources(cli_path: Option<&str>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let env_path = std::env::var(DEFAULT_CONFIG_ENV).ok();

        if let Some(path) = cli_path {
            if path.is_empty() {
                return Err(DaemonError::Config(
                    "configuration path must not be empty".into(),
                ));
            }
        }

        let config = if let Some(path) = cli_path {
            Self::load_from_path(path)?
        } else if let Some(path) = env_path.as_deref().filter(|p| !p.is_empty()) {
            Self::load_from_path(path)?
        } else {
            let mut cfg = Self::default();
            cfg.normalize_paths(&cwd);
            cfg
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let raw = fs::read_to_string(&absolute_path)?;
        let mut config: DaemonConfig = toml::from_str(&raw)?;
        let base = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.normalize_paths(&base);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.working_directory.as_os_str().is_empty() {
            return Err(DaemonError::Config(
                "working_directory must not be empty".into(),
            ));
        }

        if let Some(seed) = self.graph.seed.as_ref() {
            if seed.as_os_str().is_empty() {
                return Err(DaemonError::Config("graph.seed must not be empty".into()));
            }
        }

        if let Some(limit) = self.server.concurrency_limit {
            if limit == 0 {
                return Err(DaemonError::Config(
                    "server.concurrency_limit must be greater than zero".into(),
                ));
            }
        }

        if let Some(limit) = self.server.body_limit {
            if limit == 0 {
                return Err(DaemonError::Config(
                    "server.body_limit must be greater than zero".into(),
                ));
            }
        }

        if let Some(worker_threads) = self.server.worker_threads {
            if worker_threads == 0 {
                return Err(DaemonError::Config(
                    "server.worker_threads must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn pid_file(&self) -> Option<&Path> {
        self.pid_file.as_deref()
    }

    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }

    pub fn stderr(&self) -> Option<&Path> {
        self.stderr.as_deref()
    }

    pub fn stdin(&self) -> Option<&Path> {
        self.stdin.as_deref()
    }

    pub fn graph(&self) -> &GraphSettings {
        &self.graph
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|err| DaemonError::Config(format!("invalid bind_address: {err}")))?;
        Ok(SocketAddr::new(addr, self.server.port))
    }

    pub fn server(&self) -> &ServerSettings {
        &self.server
    }

    fn normalize_paths(&mut self, base: &Path) {
        if self.working_directory.is_relative() {
            self.working_directory = base.join(&self.working_directory);
        }

        normalize_optional_path(&mut self.pid_file, base);
        normalize_optional_path(&mut self.stdin, base);
        normalize_optional_path(&mut self.stdout, base);
        normalize_optional_path(&mut self.stderr, base);
        self.graph.normalize(base);
    }
}

fn normalize_optional_path(target: &mut Option<PathBuf>, base: &Path) {
    if let Some(path) = target {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Optional JSON file of vertices and edges loaded at startup.
    pub seed: Option<PathBuf>,
}

impl GraphSettings {
    fn normalize(&mut self, base: &Path) {
        normalize_optional_path(&mut self.seed, base);
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub http2_only: bool,
    pub tcp_nodelay: bool,
    pub worker_threads: Option<usize>,
    pub concurrency_limit: Option<usize>,
    pub body_limit: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            port: 8182,
            http2_only: false,
            tcp_nodelay: true,
            worker_threads: None,
            concurrency_limit: None,
            body_limit: None,
        }
    }
}

impl ServerSettings {
    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server().port, 8182);
        assert!(config.graph().seed.is_none());
    }

    #[test]
    fn load_from_path_normalizes_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("gremlind.toml");
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "working_directory = \"work\"\n\n[graph]\nseed = \"seed.json\"\n\n[server]\nport = 9000"
        )
        .unwrap();

        let config = DaemonConfig::load_from_path(&config_path).unwrap();

        assert_eq!(config.working_directory, dir.path().join("work"));
        assert_eq!(
            config.graph().seed.as_deref(),
            Some(dir.path().join("seed.json").as_path())
        );
        assert_eq!(config.server().port, 9000);
    }

    #[test]
    fn zero_concurrency_limit_is_rejected() {
        let mut config = DaemonConfig::default();
        config.server.concurrency_limit = Some(0);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency_limit"));
    }

    #[test]
    fn invalid_bind_address_is_rejected() {
        let mut config = DaemonConfig::default();
        config.server.bind_address = "not-an-address".into();

        assert!(config.socket_addr().is_err());
    }
}
