//! Endpoint and client configuration.
//!
//! Every endpoint and client identity value lives in [`ClientConfig`] with
//! defaults for the ENVRI staging realm and the SEDOO IAGOS API. A small
//! `key = value` file can override them; see [`resolve_default_config_path`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// IAGOS download service (AERIS-protected).
pub const DEFAULT_SERVICE_URL: &str = "https://api.sedoo.fr/iagos-backend-test/v2.0/downloads";

/// ENVRI-ID OpenID Connect base URL.
pub const DEFAULT_AUTH_BASE_URL: &str =
    "https://login.staging.envri.eu/auth/realms/envri/protocol/openid-connect";

/// Public OAuth2 client registered for command-line token acquisition.
pub const DEFAULT_CLIENT_ID: &str = "envri-token-cli";

/// Scopes requested during device authorization.
pub const DEFAULT_SCOPE: &str = "openid profile email entitlements";

/// Default HTTP connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes, NetCDF files can be large).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Query parameters selecting level-2 NetCDF timeseries.
const DEFAULT_DOWNLOAD_QUERY: [(&str, &str); 3] = [
    ("level", "2"),
    ("format", "netcdf"),
    ("type", "timeseries"),
];

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the download service; the flight id is appended as a path segment.
    pub service_url: String,
    /// OpenID Connect base URL hosting `/auth/device` and `/token`.
    pub auth_base_url: String,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// Space-separated scope list.
    pub scope: String,
    /// Query parameters appended to every download request.
    pub download_query: Vec<(String, String)>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Directory receiving `<flight>.nc` files when none is given explicitly.
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            download_query: DEFAULT_DOWNLOAD_QUERY
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            output_dir: env::temp_dir(),
        }
    }
}

impl ClientConfig {
    /// Device authorization endpoint.
    #[must_use]
    pub fn device_authorization_url(&self) -> String {
        format!("{}/auth/device", self.auth_base_url.trim_end_matches('/'))
    }

    /// Token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/token", self.auth_base_url.trim_end_matches('/'))
    }

    /// Validates the resolved values, including command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first endpoint that is not an http(s) URL,
    /// an empty `client_id`, or a timeout outside `1..=3600`.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", Some(self.connect_timeout_secs))?;
        validate_timeout_secs("read_timeout_secs", Some(self.read_timeout_secs))?;
        validate_http_url("service_url", Some(&self.service_url))?;
        validate_http_url("auth_base_url", Some(&self.auth_base_url))?;
        if self.client_id.is_empty() {
            bail!("Invalid config value for `client_id`: must not be empty");
        }
        Ok(())
    }

    /// Overlays values present in a config file.
    #[must_use]
    pub fn with_file_config(mut self, file_config: &FileConfig) -> Self {
        if let Some(service_url) = &file_config.service_url {
            self.service_url.clone_from(service_url);
        }
        if let Some(auth_base_url) = &file_config.auth_base_url {
            self.auth_base_url.clone_from(auth_base_url);
        }
        if let Some(client_id) = &file_config.client_id {
            self.client_id.clone_from(client_id);
        }
        if let Some(scope) = &file_config.scope {
            self.scope.clone_from(scope);
        }
        if let Some(output_dir) = &file_config.output_dir {
            self.output_dir.clone_from(output_dir);
        }
        if let Some(secs) = file_config.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = file_config.read_timeout_secs {
            self.read_timeout_secs = secs;
        }
        self
    }
}

/// File configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub service_url: Option<String>,
    pub auth_base_url: Option<String>,
    pub client_id: Option<String>,
    pub scope: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_http_url("service_url", self.service_url.as_deref())?;
        validate_http_url("auth_base_url", self.auth_base_url.as_deref())?;
        if self.client_id.as_deref().is_some_and(str::is_empty) {
            bail!("Invalid config value for `client_id`: must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_http_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/iagos-envri/config.toml`
/// 2. `$HOME/.config/iagos-envri/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("iagos-envri")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("iagos-envri")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Loads config from an explicit path.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "service_url" | "auth_base_url" | "client_id" | "scope" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `{key}` value on line {line_number}"))?;
                match key {
                    "service_url" => cfg.service_url = Some(parsed),
                    "auth_base_url" => cfg.auth_base_url = Some(parsed),
                    "client_id" => cfg.client_id = Some(parsed),
                    _ => cfg.scope = Some(parsed),
                }
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_number}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_number}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `read_timeout_secs` value on line {line_number}")
                })?;
                cfg.read_timeout_secs = Some(parsed);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
