//! Credential discovery and client configuration.
//!
//! The Pragma CLI stores one bearer token per context in
//! `<config dir>/pragma/credentials` and the selected context in
//! `<config dir>/pragma/config.yaml`, where `<config dir>` is
//! `$XDG_CONFIG_HOME` or `~/.config`. Environment variables override both:
//!
//! | Setting | Lookup order |
//! |---------|--------------|
//! | context | argument, `PRAGMA_CONTEXT`, `current_context`, `default` |
//! | token   | `PRAGMA_AUTH_TOKEN_<CONTEXT>`, `PRAGMA_AUTH_TOKEN`, credentials file |
//! | API URL | `PRAGMA_API_URL`, `contexts.<name>.api_url`, `http://localhost:8000` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// API URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Context used when nothing else is configured.
pub const DEFAULT_CONTEXT: &str = "default";

/// Request timeout of the clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONTEXT_ENV: &str = "PRAGMA_CONTEXT";
const TOKEN_ENV: &str = "PRAGMA_AUTH_TOKEN";
const API_URL_ENV: &str = "PRAGMA_API_URL";

/// Non-empty value of an environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// `$XDG_CONFIG_HOME/pragma`, else `~/.config/pragma`.
pub fn pragma_config_dir() -> PathBuf {
    let base = match env_var("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };
    base.join("pragma")
}

/// Path of the credentials file.
pub fn credentials_file_path() -> PathBuf {
    pragma_config_dir().join("credentials")
}

/// Path of the CLI configuration file.
pub fn cli_config_path() -> PathBuf {
    pragma_config_dir().join("config.yaml")
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Parse `key=value` lines. Blank lines and `#` comments are skipped.
fn parse_credentials(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Token stored for `context` in the credentials file.
///
/// `Ok(None)` when the file or the entry does not exist.
pub fn load_credentials(context: &str) -> Result<Option<String>, ConfigError> {
    let path = credentials_file_path();
    let Some(content) = read_optional(&path)? else {
        return Ok(None);
    };
    Ok(parse_credentials(&content)
        .remove(context)
        .filter(|token| !token.is_empty()))
}

/// Settings of one named context in `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContextConfig {
    /// API URL for this context.
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Contents of the CLI's `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CliConfig {
    /// Selected context.
    #[serde(default)]
    pub current_context: Option<String>,
    /// Named contexts.
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextConfig>,
}

impl CliConfig {
    /// Load `config.yaml` from the default location.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&cli_config_path())
    }

    /// Load a CLI config file. `Ok(None)` if it does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let Some(content) = read_optional(path)? else {
            return Ok(None);
        };
        // An empty file parses as YAML null.
        if content.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Yaml {
                path: path.display().to_string(),
                source,
            })
    }

    /// API URL configured for `context`.
    pub fn api_url(&self, context: &str) -> Option<&str> {
        self.contexts
            .get(context)
            .and_then(|c| c.api_url.as_deref())
    }
}

/// `current_context` from `config.yaml`, if set.
pub fn current_context_from_config() -> Result<Option<String>, ConfigError> {
    Ok(CliConfig::load()?.and_then(|c| c.current_context))
}

/// Resolve the context name.
pub fn resolve_context(explicit: Option<&str>) -> Result<String, ConfigError> {
    if let Some(context) = explicit {
        return Ok(context.to_string());
    }
    if let Some(context) = env_var(CONTEXT_ENV) {
        return Ok(context);
    }
    Ok(current_context_from_config()?.unwrap_or_else(|| DEFAULT_CONTEXT.to_string()))
}

/// `PRAGMA_AUTH_TOKEN_<CONTEXT>` for a context name.
pub fn context_token_env(context: &str) -> String {
    format!("{}_{}", TOKEN_ENV, context.to_uppercase().replace('-', "_"))
}

/// Resolve the bearer token for a context.
///
/// With `None`, the context is resolved first with [`resolve_context`].
pub fn token_for_context(context: Option<&str>) -> Result<Option<String>, ConfigError> {
    let context = resolve_context(context)?;

    if let Some(token) = env_var(&context_token_env(&context)) {
        debug!(%context, "using context token from environment");
        return Ok(Some(token));
    }
    if let Some(token) = env_var(TOKEN_ENV) {
        debug!(%context, "using token from {}", TOKEN_ENV);
        return Ok(Some(token));
    }

    let token = load_credentials(&context)?;
    if token.is_some() {
        debug!(%context, "using token from credentials file");
    }
    Ok(token)
}

/// Resolve the API URL for a context.
pub fn api_url_for_context(context: Option<&str>) -> Result<String, ConfigError> {
    if let Some(url) = env_var(API_URL_ENV) {
        return Ok(url);
    }
    let context = resolve_context(context)?;
    let configured = CliConfig::load()?
        .and_then(|c| c.api_url(&context).map(str::to_string));
    Ok(configured.unwrap_or_else(|| DEFAULT_API_URL.to_string()))
}

/// Where the clients get their bearer token from.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Look the token up for a context; `None` resolves the context.
    Discover(Option<String>),
    /// Use this token.
    Token(String),
    /// Send no credentials.
    Anonymous,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover(context) => f.debug_tuple("Discover").field(context).finish(),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Settings shared by the async and blocking clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL.
    pub base_url: String,
    /// Token source.
    pub auth: AuthMode,
    /// Fail at construction when no token resolves.
    pub require_auth: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Configuration for `base_url` with token discovery.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthMode::Discover(None),
            require_auth: false,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("pragma-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Configuration from the environment and the CLI config files.
    pub fn from_env() -> Result<Self, ConfigError> {
        let context = resolve_context(None)?;
        let base_url = api_url_for_context(Some(&context))?;
        Ok(Self::new(base_url).with_context(context))
    }

    /// Use an explicit token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMode::Token(token.into());
        self
    }

    /// Discover the token for a named context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.auth = AuthMode::Discover(Some(context.into()));
        self
    }

    /// Send no credentials.
    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    /// Fail construction when no token is found.
    pub fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Context name used for token discovery, for error messages.
    pub fn context_name(&self) -> String {
        match &self.auth {
            AuthMode::Discover(Some(context)) => context.clone(),
            AuthMode::Discover(None) => {
                resolve_context(None).unwrap_or_else(|_| DEFAULT_CONTEXT.to_string())
            },
            AuthMode::Token(_) | AuthMode::Anonymous => DEFAULT_CONTEXT.to_string(),
        }
    }

    /// The token this configuration yields, if any.
    pub fn resolve_token(&self) -> Result<Option<String>, ConfigError> {
        match &self.auth {
            AuthMode::Token(token) => Ok(Some(token.clone())),
            AuthMode::Discover(context) => token_for_context(context.as_deref()),
            AuthMode::Anonymous => Ok(None),
        }
    }
}
