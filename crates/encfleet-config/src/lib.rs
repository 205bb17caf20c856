//! Configuration for the encfleet CLI.
//!
//! A TOML file in the platform config directory, layered with `ENCFLEET_`
//! environment variables, credential resolution (env + keyring + plaintext),
//! and translation to `encfleet_core::FleetConfig`. Core never reads files;
//! it receives the finished `FleetConfig`.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use encfleet_core::{Credentials, DEFAULT_PREFIX_LEN, DEFAULT_USERNAME, FleetConfig, RetryPolicy};

/// Keyring service under which device passwords are stored.
pub const KEYRING_SERVICE: &str = "encfleet";

/// Environment variable consulted for the device password.
pub const PASSWORD_ENV: &str = "ENCFLEET_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device password configured for user '{username}'")]
    NoCredentials { username: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Subnet to scan when a command names none. Derived from the host
    /// address when unset.
    pub subnet: Option<String>,

    /// Local host address used to derive the subnet. Detected when unset.
    pub host_address: Option<String>,

    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,

    #[serde(default = "default_device_port")]
    pub device_port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    /// Device password (plaintext; prefer the keyring or an env var).
    pub password: Option<String>,

    /// Name of an environment variable holding the device password.
    pub password_env: Option<String>,

    /// Consult the system keyring for the password.
    #[serde(default = "default_true")]
    pub keyring: bool,

    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub update: UpdateSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subnet: None,
            host_address: None,
            prefix_len: default_prefix_len(),
            device_port: default_device_port(),
            username: default_username(),
            password: None,
            password_env: None,
            keyring: true,
            probe: ProbeSettings::default(),
            update: UpdateSettings::default(),
            retry: RetrySettings::default(),
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeSettings {
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_probe_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_settings_timeout_ms")]
    pub settings_timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            concurrency: default_probe_concurrency(),
            settings_timeout_ms: default_settings_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateSettings {
    #[serde(default = "default_update_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            concurrency: default_update_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_prefix_len() -> u8 {
    DEFAULT_PREFIX_LEN
}
fn default_device_port() -> u16 {
    80
}
fn default_username() -> String {
    DEFAULT_USERNAME.into()
}
fn default_true() -> bool {
    true
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_probe_concurrency() -> usize {
    50
}
fn default_settings_timeout_ms() -> u64 {
    2000
}
fn default_update_concurrency() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "encfleet", "encfleet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("encfleet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` (missing files are fine) and the
/// environment. Nested keys use a double underscore:
/// `ENCFLEET_PROBE__CONCURRENCY=100`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ENCFLEET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize `cfg` to TOML and write it to `path`, creating parent
/// directories. The plaintext password is never written.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut cfg = cfg.clone();
    cfg.password = None;
    let toml_str = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password.
///
/// Order: the variable named by `password_env`, then `ENCFLEET_PASSWORD`,
/// then the system keyring (unless disabled), then the plaintext value.
pub fn resolve_password(cfg: &Config) -> Result<SecretString, ConfigError> {
    resolve_password_with(cfg, |name| std::env::var(name).ok())
}

fn resolve_password_with(
    cfg: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Configured env var
    if let Some(value) = cfg.password_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(value));
    }

    // 2. Well-known env var
    if let Some(value) = env(PASSWORD_ENV) {
        return Ok(SecretString::from(value));
    }

    // 3. Keyring
    if cfg.keyring {
        if let Ok(entry) = keyring_entry(&cfg.username) {
            if let Ok(secret) = entry.get_password() {
                return Ok(SecretString::from(secret));
            }
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        username: cfg.username.clone(),
    })
}

/// Store the device password for `username` in the system keyring.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(username)?.set_password(password)?;
    Ok(())
}

fn keyring_entry(username: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{username}/password"))
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate `cfg` and build the runtime configuration with `password`.
pub fn to_fleet_config(cfg: &Config, password: SecretString) -> Result<FleetConfig, ConfigError> {
    if cfg.prefix_len > 32 {
        return Err(validation("prefix_len", format!("{} exceeds 32", cfg.prefix_len)));
    }
    if cfg.probe.concurrency == 0 {
        return Err(validation("probe.concurrency", "must be at least 1".into()));
    }
    if cfg.update.concurrency == 0 {
        return Err(validation("update.concurrency", "must be at least 1".into()));
    }
    if cfg.retry.attempts == 0 {
        return Err(validation("retry.attempts", "must be at least 1".into()));
    }

    let subnet = cfg
        .subnet
        .as_deref()
        .map(|s| {
            encfleet_core::subnet::parse(s)
                .map(|net| net.to_string())
                .map_err(|e| validation("subnet", e.to_string()))
        })
        .transpose()?;

    let host_address = cfg
        .host_address
        .as_deref()
        .map(|s| {
            s.trim()
                .parse::<Ipv4Addr>()
                .map_err(|e| validation("host_address", format!("{s}: {e}")))
        })
        .transpose()?;

    Ok(FleetConfig {
        credentials: Credentials::new(cfg.username.clone(), password),
        device_port: cfg.device_port,
        subnet,
        host_address,
        prefix_len: cfg.prefix_len,
        probe_timeout: Duration::from_millis(cfg.probe.timeout_ms),
        probe_concurrency: cfg.probe.concurrency,
        settings_timeout: Duration::from_millis(cfg.probe.settings_timeout_ms),
        update_concurrency: cfg.update.concurrency,
        request_timeout: Duration::from_secs(cfg.update.request_timeout_secs),
        retry: RetryPolicy::default()
            .with_attempts(cfg.retry.attempts)
            .with_delay(Duration::from_millis(cfg.retry.delay_ms)),
    })
}

fn validation(field: &str, reason: String) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_fleet_defaults() {
        let cfg = Config::default();
        let fleet = to_fleet_config(&cfg, SecretString::from(String::new())).unwrap();
        assert_eq!(fleet.credentials.username, "Admin");
        assert_eq!(fleet.prefix_len, 23);
        assert_eq!(fleet.probe_timeout, Duration::from_secs(1));
        assert_eq!(fleet.probe_concurrency, 50);
        assert_eq!(fleet.settings_timeout, Duration::from_secs(2));
        assert_eq!(fleet.update_concurrency, 10);
        assert_eq!(fleet.retry.max_attempts, 3);
        assert_eq!(fleet.retry.delay, Duration::from_secs(2));
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
subnet = "172.16.6.0/23"
device_port = 8080
keyring = false

[probe]
concurrency = 100

[retry]
delay_ms = 500
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.subnet.as_deref(), Some("172.16.6.0/23"));
        assert_eq!(cfg.device_port, 8080);
        assert!(!cfg.keyring);
        assert_eq!(cfg.probe.concurrency, 100);
        assert_eq!(cfg.probe.timeout_ms, 1000);
        assert_eq!(cfg.retry.attempts, 3);
        assert_eq!(cfg.retry.delay_ms, 500);
        assert_eq!(cfg.username, "Admin");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.device_port, 80);
        assert_eq!(cfg.defaults.output, "table");
    }

    #[test]
    fn save_round_trip_drops_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            subnet: Some("10.0.0.0/24".into()),
            password: Some("hunter2".into()),
            ..Config::default()
        };

        save_config(&cfg, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("hunter2"));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.subnet.as_deref(), Some("10.0.0.0/24"));
        assert!(loaded.password.is_none());
    }

    #[test]
    fn password_env_wins() {
        let cfg = Config {
            password_env: Some("FLEET_SECRET".into()),
            password: Some("plaintext".into()),
            keyring: false,
            ..Config::default()
        };
        let env = |name: &str| match name {
            "FLEET_SECRET" => Some("from-custom-env".to_string()),
            PASSWORD_ENV => Some("from-default-env".to_string()),
            _ => None,
        };
        let pw = resolve_password_with(&cfg, env).unwrap();
        assert_eq!(pw.expose_secret(), "from-custom-env");
    }

    #[test]
    fn well_known_env_before_plaintext() {
        let cfg = Config {
            password: Some("plaintext".into()),
            keyring: false,
            ..Config::default()
        };
        let env = |name: &str| (name == PASSWORD_ENV).then(|| "from-env".to_string());
        let pw = resolve_password_with(&cfg, env).unwrap();
        assert_eq!(pw.expose_secret(), "from-env");
    }

    #[test]
    fn plaintext_fallback_and_missing() {
        let cfg = Config {
            password: Some("plaintext".into()),
            keyring: false,
            ..Config::default()
        };
        assert_eq!(
            resolve_password_with(&cfg, no_env).unwrap().expose_secret(),
            "plaintext"
        );

        let cfg = Config {
            keyring: false,
            ..Config::default()
        };
        assert!(matches!(
            resolve_password_with(&cfg, no_env),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_subnet = Config {
            subnet: Some("10.0.0.0/40".into()),
            ..Config::default()
        };
        assert!(matches!(
            to_fleet_config(&bad_subnet, SecretString::from(String::new())),
            Err(ConfigError::Validation { ref field, .. }) if field == "subnet"
        ));

        let bad_host = Config {
            host_address: Some("not-an-ip".into()),
            ..Config::default()
        };
        assert!(to_fleet_config(&bad_host, SecretString::from(String::new())).is_err());

        let mut no_workers = Config::default();
        no_workers.update.concurrency = 0;
        assert!(to_fleet_config(&no_workers, SecretString::from(String::new())).is_err());
    }

    #[test]
    fn subnet_is_normalised() {
        let cfg = Config {
            subnet: Some("172.16.7.9/23".into()),
            host_address: Some("172.16.7.9".into()),
            ..Config::default()
        };
        let fleet = to_fleet_config(&cfg, SecretString::from(String::new())).unwrap();
        assert_eq!(fleet.subnet.as_deref(), Some("172.16.6.0/23"));
        assert_eq!(fleet.host_address, Some(Ipv4Addr::new(172, 16, 7, 9)));
    }
}
