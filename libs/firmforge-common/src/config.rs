// Service configuration
// Environment variables override hard-coded defaults

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the compile service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Absolute path of the external compiler binary.
    pub toolchain_path: PathBuf,
    /// Shared toolchain configuration file. Injected as a leading
    /// `--config-file` pair only when the file exists on disk.
    pub toolchain_config: PathBuf,
    /// Root under which per-job workspaces are created.
    pub scratch_root: PathBuf,
    /// Wall-clock budget for one toolchain invocation.
    pub compile_timeout: Duration,
    /// Maximum number of simultaneously running toolchain subprocesses.
    pub max_concurrent_compiles: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            toolchain_path: PathBuf::from("/usr/local/bin/arduino-cli"),
            toolchain_config: PathBuf::from("/usr/local/etc/arduino-cli.yaml"),
            scratch_root: env::temp_dir(),
            compile_timeout: Duration::from_secs(120),
            max_concurrent_compiles: 4,
        }
    }
}

impl ServiceConfig {
    /// Build the configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("FIRMFORGE_BIND").unwrap_or(defaults.bind_addr),
            toolchain_path: env::var("ARDUINO_CLI_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.toolchain_path),
            toolchain_config: env::var("ARDUINO_CLI_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.toolchain_config),
            scratch_root: env::var("FIRMFORGE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_root),
            compile_timeout: env_parse::<u64>("COMPILE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.compile_timeout),
            max_concurrent_compiles: env_parse("MAX_CONCURRENT_COMPILES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_compiles),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.compile_timeout, Duration::from_secs(120));
        assert_eq!(cfg.max_concurrent_compiles, 4);
        assert!(cfg.toolchain_path.is_absolute());
    }
}
