use super::{Config, ConfigError, LogFormat, LogLevel};
use crate::app::command::Command;
use clap::Parser;
use std::path::PathBuf;

/// Command-line surface of `mixpanel-sender`.
///
/// Every flag also reads an environment variable. Unset flags fall back to
/// the config file, then to built-in defaults.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Send events and profile updates to Mixpanel", long_about = None)]
pub struct Cli {
    /// Mixpanel project token
    #[arg(long, global = true, env = "MIXPANEL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "MIXPANEL_API_HOST")]
    pub api_host: Option<String>,

    /// API secret, needed for `import`
    #[arg(long, global = true, env = "MIXPANEL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Buffer up to this many records per endpoint and send them as batches
    #[arg(long, global = true, env = "MIXPANEL_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "MIXPANEL_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Connection timeout in seconds
    #[arg(long, global = true, env = "MIXPANEL_CONNECTION_TIMEOUT_SECS")]
    pub connection_timeout_secs: Option<u64>,

    /// Maximum idle HTTP connections per host
    #[arg(long, global = true, env = "MIXPANEL_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Accept gzip-compressed responses (`--enable-compression=false` to disable)
    #[arg(
        long,
        global = true,
        env = "MIXPANEL_ENABLE_COMPRESSION",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_compression: Option<bool>,

    /// Log level
    #[arg(long, global = true, env = "LOG_LEVEL", ignore_case = true)]
    pub log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", ignore_case = true)]
    pub log_format: Option<LogFormat>,

    /// Extra log filter entry as target=level (repeatable)
    #[arg(
        long = "log-directive",
        global = true,
        env = "LOG_DIRECTIVES",
        value_delimiter = ','
    )]
    pub log_directives: Vec<String>,

    /// Configuration file path (TOML)
    #[arg(long, global = true, env = "MIXPANEL_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolves the effective configuration: defaults, then the config file,
    /// then environment and flags.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        // Validated once below, after every layer is applied.
        let mut config = match &self.config_file {
            Some(path) => Config::load_file(path)?,
            None => Config::default(),
        };

        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(api_host) = &self.api_host {
            config.api_host = api_host.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = Some(buffer_size);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(connection_timeout_secs) = self.connection_timeout_secs {
            config.connection_timeout_secs = connection_timeout_secs;
        }
        if let Some(max_connections) = self.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(enable_compression) = self.enable_compression {
            config.enable_compression = enable_compression;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        if !self.log_directives.is_empty() {
            config.log_directives = self.log_directives.clone();
        }

        config.validate()?;
        config.require_token()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mixpanel-sender").chain(args.iter().copied())).unwrap()
    }

    #[test]
    #[serial]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token = \"from-file\"\nbuffer_size = 10\ntimeout_secs = 3").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&[
            "--config-file",
            &path,
            "--token",
            "from-flag",
            "delete",
            "user-1",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.token.as_deref(), Some("from-flag"));
        assert_eq!(config.buffer_size, Some(10));
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    #[serial]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["delete", "user-1", "--token", "t", "--log-level", "DEBUG"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    #[serial]
    fn test_missing_token() {
        let cli = Cli {
            token: None,
            ..parse(&["--token", "x", "delete", "user-1"])
        };
        assert!(matches!(cli.resolve_config(), Err(ConfigError::MissingToken)));
    }

    #[test]
    #[serial]
    fn test_zero_buffer_size_is_rejected() {
        let cli = parse(&["--token", "t", "--buffer-size", "0", "delete", "user-1"]);
        assert!(matches!(cli.resolve_config(), Err(ConfigError::InvalidConfig(_))));
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{contents}").unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_compression_flag_overrides_file_both_ways() {
        let enabled = config_file("token = \"t\"\nenable_compression = true");
        let enabled_path = enabled.path().to_str().unwrap();
        let disabled = config_file("token = \"t\"\nenable_compression = false");
        let disabled_path = disabled.path().to_str().unwrap();

        let from_file = parse(&["--config-file", enabled_path, "delete", "u"]);
        assert!(from_file.resolve_config().unwrap().enable_compression);

        let turned_off = parse(&["--config-file", enabled_path, "--enable-compression=false", "delete", "u"]);
        assert!(!turned_off.resolve_config().unwrap().enable_compression);

        let turned_on = parse(&["--config-file", disabled_path, "--enable-compression", "delete", "u"]);
        assert!(turned_on.resolve_config().unwrap().enable_compression);
    }

    #[test]
    #[serial]
    fn test_compression_env_overrides_file() {
        let enabled = config_file("token = \"t\"\nenable_compression = true");
        let path = enabled.path().to_str().unwrap().to_string();

        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("MIXPANEL_ENABLE_COMPRESSION", "false");
        }
        let cli = Cli::try_parse_from(["mixpanel-sender", "--config-file", path.as_str(), "delete", "u"]);
        unsafe {
            std::env::remove_var("MIXPANEL_ENABLE_COMPRESSION");
        }

        assert!(!cli.unwrap().resolve_config().unwrap().enable_compression);
    }

    #[test]
    #[serial]
    fn test_invalid_file_value_can_be_replaced_by_flag() {
        let file = config_file("token = \"t\"\ntimeout_secs = 0");
        let path = file.path().to_str().unwrap();

        let without_flag = parse(&["--config-file", path, "delete", "u"]);
        assert!(matches!(without_flag.resolve_config(), Err(ConfigError::InvalidConfig(_))));

        let with_flag = parse(&["--config-file", path, "--timeout-secs", "5", "delete", "u"]);
        assert_eq!(with_flag.resolve_config().unwrap().timeout_secs, 5);
    }

    #[test]
    #[serial]
    fn test_log_directive_flags_replace_file_list() {
        let file = config_file("token = \"t\"\nlog_directives = [\"hyper=debug\"]");
        let path = file.path().to_str().unwrap();

        let from_file = parse(&["--config-file", path, "delete", "u"]);
        assert_eq!(from_file.resolve_config().unwrap().log_directives, vec!["hyper=debug"]);

        let cli = parse(&[
            "--config-file",
            path,
            "--log-directive",
            "reqwest=trace",
            "--log-directive",
            "h2=info,rustls=error",
            "delete",
            "u",
        ]);
        assert_eq!(
            cli.resolve_config().unwrap().log_directives,
            vec!["reqwest=trace", "h2=info", "rustls=error"]
        );
    }
}
