//! Logging setup
//!
//! The library only emits through the `log` facade. Binaries and tests
//! call [`init_logging`] once to install `env_logger`.

use crate::config::LoggingConfig;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Install `env_logger` according to `config`.
///
/// `RUST_LOG` overrides the configured level. Calling this more than
/// once is harmless: later calls keep the first logger.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {:<5} {}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if config.log_to_file {
        if let Some(parent) = config.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file_path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    // Already initialized is not an error
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_file_target_creates_parent() {
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            log_to_file: true,
            file_path: dir.path().join("logs").join("flatdb.log"),
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
        assert!(config.file_path.exists());
    }
}
