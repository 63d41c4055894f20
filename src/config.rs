/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, REDIS_URL, OAuth2 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 読み込み後は read-only として扱う
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// External OAuth2 authorization server settings.
///
/// Mode selection:
/// - `enabled == false`                      → trusted-header mode (X-User-Id)
/// - `enabled && introspection_enabled`      → remote introspection mode
/// - `enabled && !introspection_enabled`     → local HS256 JWT mode
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub enabled: bool,
    pub introspection_enabled: bool,
    pub jwt_secret: String,
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_path: String,
    pub introspection_path: String,
    pub revocation_path: String,
    pub scopes: Vec<String>,
    pub refresh_buffer: f64,
}

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_seconds: u64,

    pub notification_service_url: String,

    pub oauth2: OAuth2Config,
}

fn env_bool(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let redis_url =
            std::env::var("REDIS_URL").map_err(|_| ConfigError::Missing("REDIS_URL"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let notification_service_url = std::env::var("NOTIFICATION_SERVICE_URL")
            .map_err(|_| ConfigError::Missing("NOTIFICATION_SERVICE_URL"))?;

        let oauth2 = OAuth2Config::from_env()?;

        Ok(Self {
            addr,
            database_url,
            redis_url,
            app_env,
            cors_allowed_origins,
            request_timeout_seconds,
            notification_service_url,
            oauth2,
        })
    }
}

impl OAuth2Config {
    fn from_env() -> Result<Self, ConfigError> {
        let enabled = env_bool("OAUTH2_ENABLED");
        let introspection_enabled = env_bool("OAUTH2_INTROSPECTION_ENABLED");

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
        let base_url = std::env::var("OAUTH2_BASE_URL").unwrap_or_default();
        let client_id = std::env::var("OAUTH2_CLIENT_ID").unwrap_or_default();
        let client_secret = std::env::var("OAUTH2_CLIENT_SECRET").unwrap_or_default();

        if enabled {
            if introspection_enabled {
                if base_url.is_empty() {
                    return Err(ConfigError::Missing("OAUTH2_BASE_URL"));
                }
                url::Url::parse(&base_url).map_err(|_| ConfigError::Invalid("OAUTH2_BASE_URL"))?;
                if client_id.is_empty() {
                    return Err(ConfigError::Missing("OAUTH2_CLIENT_ID"));
                }
                if client_secret.is_empty() {
                    return Err(ConfigError::Missing("OAUTH2_CLIENT_SECRET"));
                }
            } else if jwt_secret.is_empty() {
                return Err(ConfigError::Missing("JWT_SECRET"));
            }
        }

        let scopes = std::env::var("OAUTH2_SCOPES")
            .unwrap_or_default()
            .split(' ')
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        // Out-of-range values are replaced by the token manager at
        // construction time, so no validation here.
        let refresh_buffer = std::env::var("SERVICE_TOKEN_REFRESH_BUFFER")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.1);

        Ok(Self {
            enabled,
            introspection_enabled,
            jwt_secret,
            base_url,
            client_id,
            client_secret,
            token_path: env_or("OAUTH2_TOKEN_PATH", "oauth2/token"),
            introspection_path: env_or("OAUTH2_INTROSPECTION_PATH", "oauth2/introspect"),
            revocation_path: env_or("OAUTH2_REVOCATION_PATH", "oauth2/revoke"),
            scopes,
            refresh_buffer,
        })
    }
}
