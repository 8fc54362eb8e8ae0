//! Settings loaded from defaults, an optional TOML file and the environment.
//!
//! ```toml
//! command = "netstat"
//! args = ["-I", "{interface}", "-b", "-w", "1"]
//! marker = "bytes"
//! interface = "en0"
//! tick_ms = 250
//! ```
//!
//! Every key can be overridden with a `NETSTAT_METER_` variable, e.g.
//! `NETSTAT_METER_ARGS="-I {interface} -b -w 1"`.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::data::DEFAULT_MARKER;
use crate::source::{DEFAULT_ARGS, DEFAULT_COMMAND};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "NETSTAT_METER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Program producing the statistics.
    pub command: String,
    /// Argument template; `{interface}` is substituted.
    pub args: Vec<String>,
    /// Column title of the byte counters.
    pub marker: String,
    /// Interface to monitor instead of the detected default.
    pub interface: Option<String>,
    /// Redraw interval of the TUI in milliseconds.
    pub tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: DEFAULT_ARGS.iter().map(|arg| arg.to_string()).collect(),
            marker: DEFAULT_MARKER.to_string(),
            interface: None,
            tick_ms: 250,
        }
    }
}

impl Settings {
    /// Load settings, layering `path` (if any) and the environment over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let env = env
            .try_parsing(true)
            .list_separator(" ")
            .with_list_parse_key("args");

        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(config::Map::new()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.command, "netstat");
        assert_eq!(settings.args, vec!["-I", "{interface}", "-b", "-w", "1"]);
        assert_eq!(settings.tick(), Duration::from_millis(250));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            command = "/usr/sbin/netstat"
            args = ["-w", "2", "-I", "{{interface}}"]
            interface = "en1"
            "#
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.command, "/usr/sbin/netstat");
        assert_eq!(settings.args, vec!["-w", "2", "-I", "{interface}"]);
        assert_eq!(settings.interface.as_deref(), Some("en1"));
        assert_eq!(settings.marker, "bytes");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"marker = "octets""#).unwrap();

        let mut vars = config::Map::new();
        vars.insert("NETSTAT_METER_MARKER".to_string(), "bytes".to_string());
        vars.insert("NETSTAT_METER_TICK_MS".to_string(), "500".to_string());
        vars.insert(
            "NETSTAT_METER_ARGS".to_string(),
            "-I {interface} -w 1".to_string(),
        );
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let settings = Settings::load_with_env(Some(file.path()), env).unwrap();
        assert_eq!(settings.marker, "bytes");
        assert_eq!(settings.tick_ms, 500);
        assert_eq!(settings.args, vec!["-I", "{interface}", "-w", "1"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = Settings::load_with_env(Some(Path::new("/nonexistent/meter.toml")), no_env());
        assert!(result.is_err());
    }
}
