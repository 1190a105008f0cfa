//! Runtime server configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file named
//! on the command line (optional), then `PLANCAT_*` environment variables.

use std::path::{Path, PathBuf};

use config::{
  Config, ConfigError, Environment, File,
  builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_PATH: &str = "plancat.db";

/// Value of `database_path` that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
}

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
  Memory,
  File(PathBuf),
}

impl ServerConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(
      Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(Environment::with_prefix("PLANCAT").try_parsing(true)),
    )
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .set_default("host", DEFAULT_HOST)?
      .set_default("port", i64::from(DEFAULT_PORT))?
      .set_default("database_path", DEFAULT_DATABASE_PATH)?
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn database(&self) -> Database {
    if self.database_path == Path::new(IN_MEMORY) {
      Database::Memory
    } else {
      Database::File(expand_tilde(&self.database_path))
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    ServerConfig::from_builder(
      Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
    )
    .unwrap()
  }

  #[test]
  fn defaults_apply_without_sources() {
    let cfg = from_toml("");
    assert_eq!(cfg.host, DEFAULT_HOST);
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    assert_eq!(cfg.address(), "127.0.0.1:8080");
  }

  #[test]
  fn file_overrides_defaults() {
    let cfg = from_toml("host = \"0.0.0.0\"\nport = 9000\n");
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/plancat.toml")).unwrap();
    assert!(!cfg.host.is_empty());
  }

  #[test]
  fn memory_database() {
    let cfg = from_toml("database_path = \":memory:\"");
    assert_eq!(cfg.database(), Database::Memory);
  }

  #[test]
  fn relative_database_path_is_kept() {
    let cfg = from_toml("database_path = \"data/catalog.db\"");
    assert_eq!(cfg.database(), Database::File(PathBuf::from("data/catalog.db")));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/plancat.db")),
      PathBuf::from(home).join("plancat.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
