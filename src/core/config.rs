use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub geocoding: GeocodingConfig,
    pub admin_seed: AdminSeedConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    /// Directory for per-request scratch files (audio uploads)
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Networked store URL; only `postgres://` / `postgresql://` URLs are tried as the primary tier
    pub url: Option<String>,
    /// Path of the embedded single-file store used when the primary tier is unavailable
    pub sqlite_path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Generative AI service configuration
///
/// Each pipeline stage may use its own key; every key falls back to
/// `GOOGLE_API_KEY` when its stage-specific variable is unset.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub model_name: String,
    pub image_api_key: String,
    pub audio_api_key: String,
    pub text_api_key: String,
    pub report_api_key: String,
    pub max_retries: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

/// Credentials for the administrative account seeded on first start
#[derive(Debug, Clone)]
pub struct AdminSeedConfig {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            ai: AiConfig::from_env()?,
            geocoding: GeocodingConfig::from_env()?,
            admin_seed: AdminSeedConfig::from_env(),
            swagger: SwaggerConfig::from_env(),
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 25 * 1024 * 1024; // 25MB (image + audio)

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let scratch_dir = env::var("SCRATCH_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
            scratch_dir,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_SQLITE_PATH: &'static str = "fixmyhyd.db";
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let sqlite_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| Self::DEFAULT_SQLITE_PATH.to_string());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            sqlite_path,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }

    /// Returns the primary-tier URL if one is configured for a networked store
    pub fn postgres_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| u.starts_with("postgres://") || u.starts_with("postgresql://"))
    }
}

impl AiConfig {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const DEFAULT_MODEL: &'static str = "gemini-2.5-flash-lite";
    const DEFAULT_MAX_RETRIES: u32 = 3;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let base_url =
            env::var("AI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        let model_name =
            env::var("AI_MODEL_NAME").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        let shared_key = env::var("GOOGLE_API_KEY").unwrap_or_default();
        let stage_key = |name: &str| {
            env::var(name)
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| shared_key.clone())
        };

        let max_retries = env::var("AI_MAX_RETRIES")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_RETRIES.to_string())
            .parse::<u32>()
            .map_err(|_| "AI_MAX_RETRIES must be a valid number".to_string())?;
        if max_retries == 0 {
            return Err("AI_MAX_RETRIES must be at least 1".to_string());
        }

        let request_timeout_secs = env::var("AI_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "AI_REQUEST_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            base_url,
            model_name,
            image_api_key: stage_key("GOOGLE_API_KEY_IMAGE"),
            audio_api_key: stage_key("GOOGLE_API_KEY_AUDIO"),
            text_api_key: stage_key("GOOGLE_API_KEY_TEXT"),
            report_api_key: stage_key("GOOGLE_API_KEY_REPORT"),
            max_retries,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Names of stage keys that are missing, for the startup check
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("GOOGLE_API_KEY_IMAGE", &self.image_api_key),
            ("GOOGLE_API_KEY_AUDIO", &self.audio_api_key),
            ("GOOGLE_API_KEY_TEXT", &self.text_api_key),
            ("GOOGLE_API_KEY_REPORT", &self.report_api_key),
        ]
        .into_iter()
        .filter(|(_, key)| key.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl GeocodingConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let base_url = env::var("NOMINATIM_BASE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let user_agent =
            env::var("NOMINATIM_USER_AGENT").unwrap_or_else(|_| "fixmyhyd_app".to_string());
        let timeout_secs = env::var("GEOCODING_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "GEOCODING_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            base_url,
            user_agent,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl AdminSeedConfig {
    pub fn from_env() -> Self {
        Self {
            username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
            name: env::var("ADMIN_NAME").unwrap_or_else(|_| "System Administrator".to_string()),
        }
    }
}

impl Default for AdminSeedConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            name: "System Administrator".to_string(),
        }
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Self {
        Self {
            title: env::var("SWAGGER_TITLE").unwrap_or_else(|_| "FixMyHyd API".to_string()),
            version: env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string()),
            description: env::var("SWAGGER_DESCRIPTION")
                .unwrap_or_else(|_| "Civic complaint intake for GHMC".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(String::from),
            sqlite_path: "test.db".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 1,
            idle_timeout_secs: 1,
            max_lifetime_secs: 1,
        }
    }

    #[test]
    fn test_postgres_url_only_for_networked_schemes() {
        assert_eq!(
            db_config(Some("postgresql://u:p@db/fixmyhyd")).postgres_url(),
            Some("postgresql://u:p@db/fixmyhyd")
        );
        assert_eq!(
            db_config(Some("postgres://db/x")).postgres_url(),
            Some("postgres://db/x")
        );
        assert_eq!(db_config(Some("sqlite://local.db")).postgres_url(), None);
        assert_eq!(db_config(None).postgres_url(), None);
    }

    #[test]
    fn test_missing_keys_lists_empty_stage_keys() {
        let config = AiConfig {
            base_url: String::new(),
            model_name: String::new(),
            image_api_key: "key".to_string(),
            audio_api_key: String::new(),
            text_api_key: "key".to_string(),
            report_api_key: String::new(),
            max_retries: 3,
            request_timeout: Duration::from_secs(1),
        };
        assert_eq!(
            config.missing_keys(),
            vec!["GOOGLE_API_KEY_AUDIO", "GOOGLE_API_KEY_REPORT"]
        );
    }
}
