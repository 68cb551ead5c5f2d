use crate::config::schema::{Config, StoreConfig};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub store: Option<StoreConfig>,
}

pub fn load_config(overrides: &CliOverrides, cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file (~/.relaychat/config.json)
    let config_file = cli_config_path.or_else(get_config_path);
    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = merge_config_from_file(config, path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment
    config = merge_env_variables(config)?;

    // Layer 3: CLI flags
    if let Some(host) = &overrides.host {
        config.host = host.clone();
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(store) = &overrides.store {
        config.store = store.clone();
    }

    let summary = config.get_safe_summary();
    tracing::debug!(
        account_configured = summary.account_configured,
        api_token_configured = summary.api_token_configured,
        binding_configured = summary.binding_configured,
        store = summary.store,
        listen_addr = %summary.listen_addr,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn merge_config_from_file(config: Config, path: &Path) -> Result<Config> {
    #[cfg(unix)]
    {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
            Err(e) => return Err(e).context("Failed to read metadata for config file"),
        };

        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o600 {
            tracing::error!(
                "Config file {:?} has permissions {:o}, expected 0600 - skipping for security",
                path,
                mode
            );
            return Ok(config);
        }
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let file_config: Config = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;
    Ok(file_config)
}

/// Reads an environment variable, treating empty values as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn merge_env_variables(mut config: Config) -> Result<Config, ConfigError> {
    if let Some(account_id) = env_value("CF_ACCOUNT_ID") {
        config.account_id = Some(account_id);
    }
    if let Some(api_token) = env_value("CF_AI_API_TOKEN") {
        config.api_token = Some(api_token);
    }
    if let Some(url) = env_value("RELAYCHAT_BINDING_URL") {
        config.binding_url = Some(url);
    }
    if let Some(url) = env_value("RELAYCHAT_API_BASE_URL") {
        config.api_base_url = url;
    }
    if let Some(host) = env_value("RELAYCHAT_HOST") {
        config.host = host;
    }
    if let Some(port) = env_value("RELAYCHAT_PORT") {
        config.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "RELAYCHAT_PORT",
            value: port.clone(),
        })?;
    }

    let store_dir = env_value("RELAYCHAT_STORE_DIR").map(PathBuf::from);
    if let Some(kind) = env_value("RELAYCHAT_STORE") {
        config.store = StoreConfig::parse(&kind, store_dir).ok_or(ConfigError::InvalidEnv {
            name: "RELAYCHAT_STORE",
            value: kind.clone(),
        })?;
    } else if let (Some(dir), StoreConfig::File { .. }) = (store_dir, &config.store) {
        config.store = StoreConfig::File { dir };
    }

    Ok(config)
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(config)?;

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create config file: {:?}", path))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    // Owner read/write only; the file may hold the API token
    #[cfg(unix)]
    {
        let mut permissions = file.metadata()?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on config file: {:?}", path))?;
    }

    tracing::info!("Configuration saved to {:?}", path);
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".relaychat").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 8] = [
        "CF_ACCOUNT_ID",
        "CF_AI_API_TOKEN",
        "RELAYCHAT_BINDING_URL",
        "RELAYCHAT_API_BASE_URL",
        "RELAYCHAT_HOST",
        "RELAYCHAT_PORT",
        "RELAYCHAT_STORE",
        "RELAYCHAT_STORE_DIR",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_load_config_defaults() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();

        let config = load_config(
            &CliOverrides::default(),
            Some(temp_dir.path().join("missing.json")),
        )
        .unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let file_config = Config {
            account_id: Some("file-account".to_string()),
            api_token: Some("file-token".to_string()),
            port: 9000,
            store: StoreConfig::None,
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();

        let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        assert_eq!(loaded, file_config);
    }

    #[test]
    fn test_load_config_invalid_json() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, "not valid json").unwrap();
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600)).unwrap();

        let err = load_config(&CliOverrides::default(), Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[cfg(unix)]
    #[test]
    fn test_world_readable_config_is_skipped() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let file_config = Config {
            api_token: Some("leaky".to_string()),
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();

        let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        assert!(loaded.api_token.is_none());
    }

    #[test]
    fn test_env_variable_override() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let file_config = Config {
            account_id: Some("file-account".to_string()),
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();

        unsafe {
            env::set_var("CF_ACCOUNT_ID", "env-account");
            env::set_var("CF_AI_API_TOKEN", "env-token");
            env::set_var("RELAYCHAT_STORE", "none");
            env::set_var("RELAYCHAT_BINDING_URL", "");
        }

        let config = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        clear_env();

        assert_eq!(config.account_id.as_deref(), Some("env-account"));
        assert_eq!(config.api_token.as_deref(), Some("env-token"));
        assert_eq!(config.store, StoreConfig::None);
        // Empty values are ignored
        assert!(config.binding_url.is_none());
    }

    #[test]
    fn test_invalid_env_port() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();

        unsafe {
            env::set_var("RELAYCHAT_PORT", "eighty");
        }
        let result = load_config(
            &CliOverrides::default(),
            Some(temp_dir.path().join("missing.json")),
        );
        clear_env();

        assert!(result.unwrap_err().to_string().contains("RELAYCHAT_PORT"));
    }

    #[test]
    fn test_config_hierarchy_precedence() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        // Layer 1: file
        let file_config = Config {
            host: "0.0.0.0".to_string(),
            port: 7000,
            account_id: Some("file-account".to_string()),
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();

        // Layer 2: env
        unsafe {
            env::set_var("RELAYCHAT_PORT", "7100");
            env::set_var("RELAYCHAT_STORE", "file");
            env::set_var("RELAYCHAT_STORE_DIR", "/tmp/relaychat-env");
        }

        // Layer 3: CLI
        let overrides = CliOverrides {
            port: Some(7200),
            ..CliOverrides::default()
        };
        let config = load_config(&overrides, Some(config_path)).unwrap();
        clear_env();

        assert_eq!(config.host, "0.0.0.0"); // From file
        assert_eq!(config.account_id.as_deref(), Some("file-account")); // From file
        assert_eq!(
            config.store,
            StoreConfig::File {
                dir: PathBuf::from("/tmp/relaychat-env")
            }
        ); // From env
        assert_eq!(config.port, 7200); // From CLI
    }

    #[cfg(unix)]
    #[test]
    fn test_save_config_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        save_config(&Config::default(), &config_path).unwrap();

        let mode = fs::metadata(&config_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Config file should have 0600 permissions");
    }

    #[test]
    fn test_get_config_path() {
        let path = get_config_path().unwrap();
        assert!(path.to_string_lossy().contains(".relaychat"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
