use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_PENDING_SIGNUP_TTL_MINUTES: i64 = 30;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
pub const STORE_TIMEOUT_MS_RANGE: std::ops::RangeInclusive<u64> = 100..=5_000;
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 500;
pub const DEFAULT_SIGNUP_SWEEP_INTERVAL_SECONDS: u64 = 300;
pub const MIN_INTENT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be at least {required} bytes")]
    TooShort { key: &'static str, required: usize },
}

#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: String,
}

#[derive(Debug, Clone)]
pub struct CrmSettings {
    pub api_base: String,
    pub api_key: String,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub global_per_millisecond: u64,
    pub global_burst: u32,
    pub auth_per_second: u64,
    pub auth_burst: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: SocketAddr,
    pub google: OAuthProviderConfig,
    pub crm: CrmSettings,
    pub intent_secret: Vec<u8>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub auth_cookie_secure: bool,
    pub admin_api_token: Option<String>,
    pub pending_signup_ttl: chrono::Duration,
    pub store_timeout: Duration,
    pub diagnostics_capacity: usize,
    pub sweep_interval: Option<Duration>,
    pub rate_limits: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let intent_secret = required("SIGNUP_INTENT_SECRET")?.into_bytes();
        if intent_secret.len() < MIN_INTENT_SECRET_LENGTH {
            return Err(ConfigError::TooShort {
                key: "SIGNUP_INTENT_SECRET",
                required: MIN_INTENT_SECRET_LENGTH,
            });
        }

        let ttl_minutes: i64 =
            parsed("PENDING_SIGNUP_TTL_MINUTES", DEFAULT_PENDING_SIGNUP_TTL_MINUTES)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "PENDING_SIGNUP_TTL_MINUTES",
                value: ttl_minutes.to_string(),
            });
        }

        let capacity: usize = parsed("DIAGNOSTICS_CAPACITY", DEFAULT_DIAGNOSTICS_CAPACITY)?;
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "DIAGNOSTICS_CAPACITY",
                value: "0".into(),
            });
        }

        let sweep_secs: u64 = parsed(
            "SIGNUP_SWEEP_INTERVAL_SECONDS",
            DEFAULT_SIGNUP_SWEEP_INTERVAL_SECONDS,
        )?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            frontend_origin: required("FRONTEND_ORIGIN")?,
            bind_addr: parsed("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            google: OAuthProviderConfig {
                client_id: required("GOOGLE_CLIENT_ID")?,
                client_secret: required("GOOGLE_CLIENT_SECRET")?,
                redirect_uri: required("GOOGLE_REDIRECT_URI")?,
                authorize_url: required("GOOGLE_ACCOUNTS_OAUTH_API_BASE")?,
                token_url: required("GOOGLE_ACCOUNTS_OAUTH_TOKEN_CLIENT_URL")?,
                user_info_url: required("GOOGLE_ACCOUNTS_OAUTH_USER_INFO_URL")?,
            },
            crm: CrmSettings {
                api_base: required("CRM_API_BASE")?,
                api_key: required("CRM_API_KEY")?,
                location_id: optional("CRM_LOCATION_ID"),
            },
            intent_secret,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: required("JWT_ISSUER")?,
            jwt_audience: required("JWT_AUDIENCE")?,
            auth_cookie_secure: parse_bool("AUTH_COOKIE_SECURE", true)?,
            admin_api_token: optional("ADMIN_API_TOKEN"),
            pending_signup_ttl: chrono::Duration::minutes(ttl_minutes),
            store_timeout: store_timeout()?,
            diagnostics_capacity: capacity,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            rate_limits: RateLimitSettings {
                // Default: 200ms/token (~5 req/sec)
                global_per_millisecond: parsed("RATE_LIMITER_MILLISECONDS", 200)?,
                global_burst: parsed("RATE_LIMITER_BURST", 20)?,
                auth_per_second: parsed("RATE_LIMITER_AUTH_SECONDS", 1)?,
                auth_burst: parsed("RATE_LIMITER_AUTH_BURST", 10)?,
            },
        })
    }
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}

/// Store calls must stay short; anything outside the range is a misconfiguration.
fn store_timeout() -> Result<Duration, ConfigError> {
    let ms: u64 = parsed("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?;
    if !STORE_TIMEOUT_MS_RANGE.contains(&ms) {
        return Err(ConfigError::Invalid {
            key: "STORE_TIMEOUT_MS",
            value: ms.to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        frontend_origin: "http://localhost".into(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        google: OAuthProviderConfig {
            client_id: "test_client_id".into(),
            client_secret: "stub".into(),
            redirect_uri: "http://localhost/api/auth/google-callback".into(),
            authorize_url: "https://accounts.google.com/o/oauth2/auth".into(),
            token_url: "http://localhost/token".into(),
            user_info_url: "http://localhost/userinfo".into(),
        },
        crm: CrmSettings {
            api_base: "http://localhost/crm".into(),
            api_key: "stub".into(),
            location_id: None,
        },
        intent_secret: b"0123456789abcdef0123456789ABCDEF".to_vec(),
        jwt_secret: "0123456789abcdef0123456789abcdef".into(),
        jwt_issuer: "test-issuer".into(),
        jwt_audience: "test-audience".into(),
        auth_cookie_secure: true,
        admin_api_token: None,
        pending_signup_ttl: chrono::Duration::minutes(DEFAULT_PENDING_SIGNUP_TTL_MINUTES),
        store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        sweep_interval: None,
        rate_limits: RateLimitSettings {
            global_per_millisecond: 200,
            global_burst: 20,
            auth_per_second: 1,
            auth_burst: 10,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn parsed_falls_back_to_default_when_unset() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::remove_var("SIGNUP_BRIDGE_TEST_NUMBER");
        let value: u64 = parsed("SIGNUP_BRIDGE_TEST_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parsed_rejects_garbage() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SIGNUP_BRIDGE_TEST_NUMBER", "forty-two");
        let err = parsed::<u64>("SIGNUP_BRIDGE_TEST_NUMBER", 1).unwrap_err();
        env::remove_var("SIGNUP_BRIDGE_TEST_NUMBER");
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "SIGNUP_BRIDGE_TEST_NUMBER",
                value: "forty-two".into()
            }
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SIGNUP_BRIDGE_TEST_FLAG", "No");
        assert!(!parse_bool("SIGNUP_BRIDGE_TEST_FLAG", true).unwrap());
        env::set_var("SIGNUP_BRIDGE_TEST_FLAG", "1");
        assert!(parse_bool("SIGNUP_BRIDGE_TEST_FLAG", false).unwrap());
        env::remove_var("SIGNUP_BRIDGE_TEST_FLAG");
        assert!(parse_bool("SIGNUP_BRIDGE_TEST_FLAG", true).unwrap());
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SIGNUP_BRIDGE_TEST_REQUIRED", "   ");
        assert_eq!(
            required("SIGNUP_BRIDGE_TEST_REQUIRED"),
            Err(ConfigError::Missing("SIGNUP_BRIDGE_TEST_REQUIRED"))
        );
        env::remove_var("SIGNUP_BRIDGE_TEST_REQUIRED");
    }

    #[test]
    fn store_timeout_must_stay_short() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::remove_var("STORE_TIMEOUT_MS");
        assert_eq!(
            store_timeout().unwrap(),
            Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS)
        );

        for bad in ["0", "99", "600000"] {
            env::set_var("STORE_TIMEOUT_MS", bad);
            assert_eq!(
                store_timeout(),
                Err(ConfigError::Invalid {
                    key: "STORE_TIMEOUT_MS",
                    value: bad.into()
                })
            );
        }

        env::set_var("STORE_TIMEOUT_MS", "1500");
        assert_eq!(store_timeout().unwrap(), Duration::from_millis(1500));
        env::remove_var("STORE_TIMEOUT_MS");
    }
}
