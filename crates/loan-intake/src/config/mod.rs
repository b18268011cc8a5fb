use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub i18n: I18nConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let base_url = non_blank("APP_BASE_URL");

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match non_blank("APP_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            None => LogFormat::default_for(environment),
        };

        let encryption_key =
            non_blank("APPLICATION_ENCRYPTION_KEY").ok_or(ConfigError::MissingEncryptionKey)?;

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                base_url,
            },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            security: SecurityConfig {
                encryption_key: EncryptionSecret(encryption_key),
            },
            storage: StorageConfig {
                valkey_url: non_blank("VALKEY_URL"),
            },
            uploads: UploadConfig {
                directory: PathBuf::from(
                    env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string()),
                ),
                public_path: env::var("UPLOAD_PUBLIC_PATH")
                    .unwrap_or_else(|_| "/uploads".to_string()),
            },
            i18n: I18nConfig {
                locales_dir: PathBuf::from(
                    env::var("LOCALES_DIR").unwrap_or_else(|_| "locales".to_string()),
                ),
                default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            },
            mail: MailConfig {
                admin_email: env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@localhost".to_string()),
                smtp_host: non_blank("SMTP_HOST"),
                smtp_port,
                smtp_from: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@localhost".to_string()),
                smtp_username: non_blank("SMTP_USERNAME"),
                smtp_password: non_blank("SMTP_PASSWORD"),
            },
        })
    }
}

fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }

    /// Address the service uses to call its own email endpoints.
    pub fn public_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Line format for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Production logs are shipped as JSON; elsewhere they are read by people.
    pub fn default_for(environment: AppEnvironment) -> Self {
        match environment {
            AppEnvironment::Production => Self::Json,
            AppEnvironment::Development | AppEnvironment::Test => Self::Compact,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub encryption_key: EncryptionSecret,
}

/// Symmetric secret for application payloads. Never printed.
#[derive(Clone)]
pub struct EncryptionSecret(String);

impl EncryptionSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionSecret(<redacted>)")
    }
}

/// Backing store selection. No URL means the in-process store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub valkey_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub directory: PathBuf,
    pub public_path: String,
}

#[derive(Debug, Clone)]
pub struct I18nConfig {
    pub locales_dir: PathBuf,
    pub default_locale: String,
}

/// Outbound email settings. Without `smtp_host` messages are logged and dropped.
#[derive(Clone)]
pub struct MailConfig {
    pub admin_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_from: String,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("admin_email", &self.admin_email)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_from", &self.smtp_from)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidLogFormat(String),
    InvalidHost { source: std::net::AddrParseError },
    MissingEncryptionKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingEncryptionKey => write!(
                f,
                "APPLICATION_ENCRYPTION_KEY must be set; refusing to start without it"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::MissingEncryptionKey => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_BASE_URL",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APPLICATION_ENCRYPTION_KEY",
            "VALKEY_URL",
            "UPLOAD_DIR",
            "UPLOAD_PUBLIC_PATH",
            "LOCALES_DIR",
            "DEFAULT_LOCALE",
            "ADMIN_EMAIL",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_FROM",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APPLICATION_ENCRYPTION_KEY", "test-secret");
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.public_base_url(), "http://127.0.0.1:3000");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(config.storage.valkey_url.is_none());
        assert_eq!(config.uploads.directory, PathBuf::from("public/uploads"));
        assert_eq!(config.i18n.default_locale, "en");
        assert_eq!(config.mail.smtp_port, 587);
    }

    #[test]
    fn missing_encryption_key_is_fatal() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        match AppConfig::load() {
            Err(ConfigError::MissingEncryptionKey) => {}
            other => panic!("expected missing key error, got {other:?}"),
        }

        env::set_var("APPLICATION_ENCRYPTION_KEY", "   ");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingEncryptionKey)
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APPLICATION_ENCRYPTION_KEY", "test-secret");
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APPLICATION_ENCRYPTION_KEY", "test-secret");
        env::set_var("APP_BASE_URL", "https://loans.example.org/");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.server.public_base_url(), "https://loans.example.org");
    }

    #[test]
    fn production_defaults_to_json_logs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APPLICATION_ENCRYPTION_KEY", "test-secret");
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.format, LogFormat::Json);

        env::set_var("APP_LOG_FORMAT", "compact");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.format, LogFormat::Compact);

        env::set_var("APP_LOG_FORMAT", "xml");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLogFormat(value)) if value == "xml"
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let secret = EncryptionSecret::new("super-secret");
        assert!(!format!("{secret:?}").contains("super-secret"));
    }
}
