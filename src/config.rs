use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::chat::ContinuationPolicy;

/// Default htmx build loaded by the page.
pub const DEFAULT_HTMX_SRC: &str = "https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Loan backend base URL
    #[arg(long, env = "LOAN_API_BASE")]
    pub api_base: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for document uploads.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub max_continuations: usize,
    pub sanction_delay_ms: u64,
    pub status_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub htmx_src: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("backend.base_url", "http://localhost:5000")?
            .set_default("chat.max_continuations", 10)?
            .set_default("chat.sanction_delay_ms", 500)?
            .set_default("chat.status_delay_ms", 1000)?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("session.sweep_interval_secs", 60)?
            .set_default("ui.htmx_src", DEFAULT_HTMX_SRC)?
            .set_default("logging.format", "pretty")?;

        // 2. Optional config.yaml next to the binary's working directory
        builder = builder.add_source(File::new("config.yaml", FileFormat::Yaml).required(false));

        // 3. Explicit config file
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // 4. LOAN_UI_SERVER__PORT=8000 and friends
        builder = builder.add_source(
            Environment::with_prefix("LOAN_UI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 5. CLI flags. `--api-base` also reads LOAN_API_BASE.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(api_base) = cli.api_base {
            builder = builder.set_override("backend.base_url", api_base)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Continuation limits for chat exchanges.
    pub fn continuation_policy(&self) -> ContinuationPolicy {
        ContinuationPolicy {
            max_continuations: self.chat.max_continuations,
            sanction_delay: Duration::from_millis(self.chat.sanction_delay_ms),
            status_delay: Duration::from_millis(self.chat.status_delay_ms),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    /// Sweep interval, never below one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs.max(1))
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_policy_from_config() {
        let cfg = AppConfig::load_from_args(["loan-advisor-ui", "--port", "4100"]).unwrap();
        let policy = cfg.continuation_policy();
        assert_eq!(cfg.server.port, 4100);
        assert_eq!(policy.max_continuations, cfg.chat.max_continuations);
        assert_eq!(
            policy.status_delay,
            Duration::from_millis(cfg.chat.status_delay_ms)
        );
    }

    #[test]
    fn test_unknown_flag_is_an_error() {
        let err = AppConfig::load_from_args(["loan-advisor-ui", "--bogus"]).unwrap_err();
        assert!(err.to_string().contains("--bogus"));
    }
}
