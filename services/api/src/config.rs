use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;

/// Version stamped onto registered clients and reported by the info endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// API settings sourced from environment variables, with an optional YAML file
// supplying the pieces that do not fit in a variable (CORS map, check
// definitions).
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    // CORS response header suffixes; each pair becomes Access-Control-Allow-<key>.
    pub cors: BTreeMap<String, String>,
    // Check definitions keyed by check name, returned verbatim by the API.
    pub checks: serde_json::Map<String, serde_json::Value>,
    // Bind address for the Prometheus scrape endpoint.
    pub metrics_bind: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub bind: String,
    pub port: u16,
    // When both are set, every non-OPTIONS request must carry matching
    // HTTP Basic credentials.
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsOverride {
    api: Option<ApiOverride>,
    cors: Option<BTreeMap<String, String>>,
    checks: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiOverride {
    bind: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
}

pub fn default_cors() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Origin".to_string(), "*".to_string()),
        (
            "Methods".to_string(),
            "GET, POST, PUT, DELETE, OPTIONS".to_string(),
        ),
        ("Credentials".to_string(), "true".to_string()),
        (
            "Headers".to_string(),
            "Origin, X-Requested-With, Content-Type, Accept, Authorization".to_string(),
        ),
    ])
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        // Environment variables provide defaults for local development.
        let bind = std::env::var("VIGIL_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("VIGIL_API_PORT")
            .unwrap_or_else(|_| "4567".to_string())
            .parse()
            .with_context(|| "parse VIGIL_API_PORT")?;
        let metrics_bind = std::env::var("VIGIL_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse VIGIL_METRICS_BIND")?;
        Ok(Self {
            api: ApiSettings {
                bind,
                port,
                user: std::env::var("VIGIL_API_USER").ok(),
                password: std::env::var("VIGIL_API_PASSWORD").ok(),
            },
            cors: default_cors(),
            checks: serde_json::Map::new(),
            metrics_bind,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut settings = Self::from_env()?;
        if let Ok(path) = std::env::var("VIGIL_API_CONFIG") {
            // YAML overrides allow ops-friendly config files; this is also the
            // only place check definitions and CORS overrides can come from.
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read VIGIL_API_CONFIG: {path}"))?;
            let override_cfg: SettingsOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse api config yaml")?;
            if let Some(api) = override_cfg.api {
                if let Some(value) = api.bind {
                    settings.api.bind = value;
                }
                if let Some(value) = api.port {
                    settings.api.port = value;
                }
                if let Some(value) = api.user {
                    settings.api.user = Some(value);
                }
                if let Some(value) = api.password {
                    settings.api.password = Some(value);
                }
            }
            if let Some(cors) = override_cfg.cors {
                settings.cors = cors;
            }
            if let Some(checks) = override_cfg.checks {
                settings.checks = checks;
            }
        }
        Ok(settings)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api.bind, self.api.port)
            .parse()
            .with_context(|| "parse api bind address")
    }
}
