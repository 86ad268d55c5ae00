//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use crate::Result;
use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agent identifier assigned by the runtime
    #[serde(default)]
    pub agent_id: String,

    /// Alias of the agent deployment to talk to
    #[serde(default)]
    pub agent_alias_id: String,

    /// Region the agent lives in (also the signing region)
    #[serde(default = "default_region")]
    pub region: String,

    /// Service name used in the signing scope
    #[serde(default = "default_service")]
    pub service: String,

    /// Endpoint override; derived from the region when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Ask the runtime to stream trace events
    #[serde(default = "default_enable_trace")]
    pub enable_trace: bool,

    /// Request deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Named profile in the shared credentials file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Session id used when none is given on the command line
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_service() -> String {
    "bedrock".to_string()
}

fn default_enable_trace() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_session_id() -> String {
    "MYSESSION".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_alias_id: String::new(),
            region: default_region(),
            service: default_service(),
            endpoint: None,
            enable_trace: default_enable_trace(),
            timeout_secs: default_timeout_secs(),
            profile: None,
            session_id: default_session_id(),
        }
    }
}

impl Config {
    /// Base URL of the agent runtime.
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.region),
        }
    }

    /// Build the text-invocation URL for a session.
    ///
    /// Path segments are percent-encoded, so session ids may contain
    /// characters that are not URL-safe.
    pub fn agent_url(&self, session_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint())
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", self.endpoint(), e)))?;

        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Endpoint cannot be a base URL: {}", self.endpoint())))?
            .pop_if_empty()
            .extend([
                "agents",
                self.agent_id.as_str(),
                "agentAliases",
                self.agent_alias_id.as_str(),
                "sessions",
                session_id,
                "text",
            ]);

        Ok(url)
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (environment-shaped keys).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = non_empty("AWS_REGION") {
            self.region = region;
        }
        if let Some(agent_id) = non_empty("AGENT_ID") {
            self.agent_id = agent_id;
        }
        if let Some(alias) = non_empty("AGENT_ALIAS_ID") {
            self.agent_alias_id = alias;
        }
        if let Some(endpoint) = non_empty("AGENT_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
    }

    /// Reject configurations that cannot produce a valid request.
    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(Error::Config("agent_id is not set".to_string()));
        }
        if self.agent_alias_id.trim().is_empty() {
            return Err(Error::Config("agent_alias_id is not set".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::Config("region is not set".to_string()));
        }

        let url = Url::parse(&self.endpoint())
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", self.endpoint(), e)))?;
        let local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
        if url.scheme() != "https" && !local {
            return Err(Error::Config(format!(
                "Endpoint must use https: {}",
                self.endpoint()
            )));
        }

        Ok(())
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".portfolio-agent")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default location, then apply env overrides
pub fn load() -> Result<Config> {
    let mut config = load_from(&config_path())?;
    config.apply_env_overrides();
    Ok(config)
}

/// Load configuration from a specific file
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'portfolio-agent init' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// Save configuration to a specific file
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Interactive first-run setup
pub fn init() -> Result<Config> {
    use crate::ui;
    use inquire::{Confirm, Text};

    ui::print_header("Setup", "");
    println!("  Point the client at your agent deployment.\n");

    let prompt_err = |e: inquire::InquireError| Error::Config(format!("Prompt failed: {}", e));

    let mut config = Config::default();

    config.agent_id = Text::new("Agent ID:").prompt().map_err(prompt_err)?;
    config.agent_alias_id = Text::new("Agent alias ID:").prompt().map_err(prompt_err)?;
    let default_region = default_region();
    config.region = Text::new("Region:")
        .with_default(&default_region)
        .prompt()
        .map_err(prompt_err)?;

    let use_profile = Confirm::new("Use a named credentials profile?")
        .with_default(false)
        .prompt()
        .map_err(prompt_err)?;
    if use_profile {
        let profile = Text::new("Profile name:").prompt().map_err(prompt_err)?;
        config.profile = Some(profile);
    }

    config.validate()?;

    ui::print_thinking("Saving configuration");
    save(&config)?;
    ui::print_success(&format!("Saved to {:?}", config_path()));

    Ok(config)
}
