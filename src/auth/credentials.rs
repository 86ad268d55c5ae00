//! Credential discovery
//!
//! Resolves signing credentials at call time from the process environment
//! or the shared credentials file (`~/.aws/credentials`).

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};
use crate::Result;
use crate::error::Error;

/// Access key material used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A source of credentials.
///
/// `provide` returns `Ok(None)` when the source simply has nothing to offer,
/// so chains can move on to the next source.
pub trait ProvideCredentials: Send + Sync {
    /// Short label used in diagnostics.
    fn name(&self) -> String;

    /// Look up credentials from this source.
    fn provide(&self) -> Result<Option<AwsCredentials>>;

    /// Look up credentials, failing when none are available.
    fn resolve(&self) -> Result<AwsCredentials> {
        self.provide()?.ok_or_else(|| {
            Error::Auth(format!(
                "No valid credentials found (tried: {}). Set AWS_ACCESS_KEY_ID and \
                 AWS_SECRET_ACCESS_KEY, or configure a profile in the shared credentials file.",
                self.name()
            ))
        })
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
pub struct EnvironmentProvider {
    lookup: Lookup,
}

impl EnvironmentProvider {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read variables through a custom lookup instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvironmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvideCredentials for EnvironmentProvider {
    fn name(&self) -> String {
        "environment".to_string()
    }

    fn provide(&self) -> Result<Option<AwsCredentials>> {
        let key = self.var("AWS_ACCESS_KEY_ID");
        let secret = self.var("AWS_SECRET_ACCESS_KEY");

        match (key, secret) {
            (Some(key), Some(secret)) => Ok(Some(AwsCredentials::new(
                key,
                secret,
                self.var("AWS_SESSION_TOKEN"),
            ))),
            (Some(_), None) => {
                warn!("AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is not");
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

/// Reads a named profile from an INI-style shared credentials file.
pub struct ProfileProvider {
    path: PathBuf,
    profile: String,
}

impl ProfileProvider {
    pub fn new(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
        }
    }

    /// Use the standard file location and profile selection.
    ///
    /// File: `AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`.
    /// Profile: the explicit argument, else `AWS_PROFILE`, else `default`.
    pub fn from_env(profile: Option<&str>) -> Self {
        let path = std::env::var("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".aws")
                    .join("credentials")
            });

        let profile = profile
            .map(str::to_string)
            .or_else(|| std::env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| "default".to_string());

        Self::new(path, profile)
    }
}

impl ProvideCredentials for ProfileProvider {
    fn name(&self) -> String {
        format!("profile '{}' in {}", self.profile, self.path.display())
    }

    fn provide(&self) -> Result<Option<AwsCredentials>> {
        if !self.path.exists() {
            debug!("Credentials file {:?} does not exist", self.path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let sections = parse_ini(&content);

        let Some(section) = sections.get(&self.profile) else {
            debug!("Profile '{}' not found in {:?}", self.profile, self.path);
            return Ok(None);
        };

        match (section.get("aws_access_key_id"), section.get("aws_secret_access_key")) {
            (Some(key), Some(secret)) => Ok(Some(AwsCredentials::new(
                key.clone(),
                secret.clone(),
                section.get("aws_session_token").cloned(),
            ))),
            _ => {
                warn!("Profile '{}' has incomplete key material", self.profile);
                Ok(None)
            }
        }
    }
}

/// Fixed credentials, mostly for tests and embedding.
pub struct StaticProvider(pub Option<AwsCredentials>);

impl ProvideCredentials for StaticProvider {
    fn name(&self) -> String {
        "static".to_string()
    }

    fn provide(&self) -> Result<Option<AwsCredentials>> {
        Ok(self.0.clone())
    }
}

/// Tries each provider in order; the first one with credentials wins.
pub struct CredentialChain {
    providers: Vec<Box<dyn ProvideCredentials>>,
}

impl CredentialChain {
    pub fn new(providers: Vec<Box<dyn ProvideCredentials>>) -> Self {
        Self { providers }
    }

    /// Environment first, then the shared credentials file.
    pub fn default_chain(profile: Option<&str>) -> Self {
        Self::new(vec![
            Box::new(EnvironmentProvider::new()),
            Box::new(ProfileProvider::from_env(profile)),
        ])
    }
}

impl ProvideCredentials for CredentialChain {
    fn name(&self) -> String {
        self.providers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn provide(&self) -> Result<Option<AwsCredentials>> {
        for provider in &self.providers {
            if let Some(creds) = provider.provide()? {
                debug!("Using credentials from {}", provider.name());
                return Ok(Some(creds));
            }
        }
        Ok(None)
    }
}

/// Parse `[section]` / `key = value` lines. Comments start with `#` or `;`.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_with(vars: &[(&'static str, &'static str)]) -> EnvironmentProvider {
        let vars: HashMap<&'static str, &'static str> = vars.iter().copied().collect();
        EnvironmentProvider::from_lookup(move |k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_environment_provider() {
        let provider = env_with(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "SECRET"),
            ("AWS_SESSION_TOKEN", "TOKEN"),
        ]);
        let creds = provider.provide().unwrap().unwrap();
        assert_eq!(creds.access_key_id, "AKID");
        assert_eq!(creds.session_token.as_deref(), Some("TOKEN"));
    }

    #[test]
    fn test_environment_provider_missing_secret() {
        let provider = env_with(&[("AWS_ACCESS_KEY_ID", "AKID")]);
        assert!(provider.provide().unwrap().is_none());
    }

    #[test]
    fn test_profile_provider() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# comment\n[default]\naws_access_key_id = DEFAULTKEY\naws_secret_access_key = DEFAULTSECRET\n\n[work]\naws_access_key_id=WORKKEY\naws_secret_access_key=WORKSECRET\naws_session_token=WORKTOKEN"
        )
        .unwrap();

        let work = ProfileProvider::new(file.path(), "work").provide().unwrap().unwrap();
        assert_eq!(work.access_key_id, "WORKKEY");
        assert_eq!(work.session_token.as_deref(), Some("WORKTOKEN"));

        let default = ProfileProvider::new(file.path(), "default").provide().unwrap().unwrap();
        assert_eq!(default.secret_access_key, "DEFAULTSECRET");
        assert!(default.session_token.is_none());

        assert!(ProfileProvider::new(file.path(), "absent").provide().unwrap().is_none());
    }

    #[test]
    fn test_profile_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ProfileProvider::new(dir.path().join("credentials"), "default");
        assert!(provider.provide().unwrap().is_none());
    }

    #[test]
    fn test_chain_first_wins() {
        let chain = CredentialChain::new(vec![
            Box::new(StaticProvider(None)),
            Box::new(StaticProvider(Some(AwsCredentials::new("SECOND", "S", None)))),
            Box::new(StaticProvider(Some(AwsCredentials::new("THIRD", "S", None)))),
        ]);
        assert_eq!(chain.resolve().unwrap().access_key_id, "SECOND");
    }

    #[test]
    fn test_chain_exhausted_is_auth_error() {
        let chain = CredentialChain::new(vec![
            Box::new(env_with(&[])),
            Box::new(StaticProvider(None)),
        ]);
        let err = chain.resolve().unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(err.to_string().contains("environment, static"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = AwsCredentials::new("AKID", "TOPSECRET", Some("TOKEN".to_string()));
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("TOPSECRET"));
        assert!(!debug.contains("TOKEN\""));
    }
}
