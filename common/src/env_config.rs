use std::{env, str::FromStr, sync::Arc};

use rust_decimal::Decimal;

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Holds everything needed to start the gateway: database and JWT settings,
/// server binding, logging, billing markup, throttling, alert sinks,
/// geolocation lookups and the simulated provider.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication of the dashboard.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether request logging is enabled.
    pub console_logging_enabled: bool,
    /// Log level name accepted by `log::LevelFilter`.
    pub log_level: String,
    /// Path of the log file.
    pub log_file: String,
    /// Markup applied on top of provider cost, in percent.
    pub markup_percent: Decimal,
    /// Requests per second allowed per client on the completion surface.
    pub requests_per_second: u32,
    /// Destinations for budget alerts.
    pub alerts: AlertConfig,
    /// Base URL of the geolocation service; lookups are disabled when unset.
    pub geoip_url: Option<String>,
    /// How long a geolocation answer is reused.
    pub geoip_cache_ttl_secs: u64,
    /// Probability in [0, 1] that a simulated completion fails.
    pub simulated_failure_rate: f64,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug, Default)]
/// Where budget alerts are delivered. Every sink is optional.
pub struct AlertConfig {
    pub webhook_url: Option<String>,
    pub email: Option<EmailRelayConfig>,
}

#[derive(Clone, Debug)]
/// HTTP mail relay used to email budget alerts.
pub struct EmailRelayConfig {
    pub relay_url: String,
    pub api_key: String,
    pub from: String,
    /// Recipient of budget alerts.
    pub to: String,
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or `JWT_EXPIRATION_HOURS` is not a number.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl AlertConfig {
    pub fn from_env() -> Self {
        let email = match (
            optional_var("ALERT_EMAIL_RELAY_URL"),
            optional_var("ALERT_EMAIL_API_KEY"),
            optional_var("ALERT_EMAIL_TO"),
        ) {
            (Some(relay_url), Some(api_key), Some(to)) => Some(EmailRelayConfig {
                relay_url,
                api_key,
                from: env::var("ALERT_EMAIL_FROM")
                    .unwrap_or_else(|_| "billing@localhost".to_string()),
                to,
            }),
            _ => None,
        };

        AlertConfig {
            webhook_url: optional_var("ALERT_WEBHOOK_URL"),
            email,
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to log requests (default: true)
    /// - `LOG_LEVEL` / `LOG_FILE`: Logger settings (default: "info" / "gateway.log")
    /// - `MARKUP_PERCENT`: Billing markup (default: 20)
    /// - `REQUESTS_PER_SECOND`: Per-client throttle (default: 10)
    /// - `ALERT_WEBHOOK_URL`, `ALERT_EMAIL_RELAY_URL`, `ALERT_EMAIL_API_KEY`, `ALERT_EMAIL_FROM`,
    ///   `ALERT_EMAIL_TO`
    /// - `GEOIP_URL`, `GEOIP_CACHE_TTL_SECS` (default: 3600)
    /// - `SIMULATED_FAILURE_RATE` (default: 0)
    ///
    /// # Panics
    ///
    /// Panics if required variables are missing or `MARKUP_PERCENT` is not a
    /// non-negative decimal.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let markup_percent = env::var("MARKUP_PERCENT")
            .ok()
            .map(|v| Decimal::from_str(v.trim()).expect("MARKUP_PERCENT must be a decimal"))
            .unwrap_or(Decimal::from(20));
        assert!(
            !markup_percent.is_sign_negative(),
            "MARKUP_PERCENT must not be negative"
        );

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_var("PORT", 8080),
            num_workers: parse_var("WORKERS", 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "gateway.log".to_string()),
            markup_percent,
            requests_per_second: parse_var("REQUESTS_PER_SECOND", 10),
            alerts: AlertConfig::from_env(),
            geoip_url: optional_var("GEOIP_URL"),
            geoip_cache_ttl_secs: parse_var("GEOIP_CACHE_TTL_SECS", 3600),
            simulated_failure_rate: parse_var::<f64>("SIMULATED_FAILURE_RATE", 0.0)
                .clamp(0.0, 1.0),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
