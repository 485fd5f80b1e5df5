//! Startup configuration.
//!
//! Every value is resolved once: an explicit override wins, then the
//! environment, then the built-in default.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ParserError, Result};
use crate::scrapers::emex;
use crate::traits::SiteSelectors;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BASE_URL: &str = "https://emex.ru";
pub const DEFAULT_DECODE_URL: &str =
    "https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVin/{vin}?format=json";

/// Login pair for the commerce site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both halves must be non-empty, otherwise there is nothing to log in with.
    pub fn new(username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        let password = password.filter(|p| !p.is_empty())?;
        Some(Self { username, password })
    }
}

/// Values passed explicitly by the caller; each one shadows its env variable.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub decode_url_pattern: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub selectors: Option<SiteSelectors>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Commerce site root, without trailing slash
    pub base_url: String,
    /// VIN decode endpoint with a `{vin}` placeholder
    pub decode_url_pattern: String,
    pub credentials: Option<Credentials>,
    pub selectors: SiteSelectors,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::resolve(SettingsOverrides::default())
    }

    pub fn resolve(overrides: SettingsOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolves settings against an arbitrary variable source.
    pub fn resolve_with<F>(overrides: SettingsOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = overrides
            .host
            .or_else(|| lookup("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match lookup("PORT") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ParserError::Config(format!("PORT is not a valid port: {raw}")))?,
                None => DEFAULT_PORT,
            },
        };

        let base_url = overrides
            .base_url
            .or_else(|| lookup("EMEX_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let decode_url_pattern = overrides
            .decode_url_pattern
            .or_else(|| lookup("VIN_DECODE_URL"))
            .unwrap_or_else(|| DEFAULT_DECODE_URL.to_string());

        if !decode_url_pattern.contains("{vin}") {
            return Err(ParserError::Config(
                "VIN decode URL must contain a {vin} placeholder".to_string(),
            ));
        }

        let credentials = Credentials::new(
            overrides.username.or_else(|| lookup("EMEX_USERNAME")),
            overrides.password.or_else(|| lookup("EMEX_PASSWORD")),
        );

        let selectors = match overrides.selectors {
            Some(selectors) => selectors,
            None => match lookup("EMEX_SELECTORS_FILE") {
                Some(path) => load_selectors(Path::new(&path))?,
                None => emex::default_selectors(),
            },
        };

        if credentials.is_none() {
            warn!("EMEX_USERNAME/EMEX_PASSWORD not set - running without authentication");
        }

        Ok(Self {
            host,
            port,
            base_url,
            decode_url_pattern,
            credentials,
            selectors,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads strategy tables from a JSON file, for deployments whose markup
/// differs from the built-in tables.
pub fn load_selectors(path: &Path) -> Result<SiteSelectors> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ParserError::Config(format!("cannot read {}: {e}", path.display())))?;
    let selectors: SiteSelectors = serde_json::from_str(&raw)
        .map_err(|e| ParserError::Config(format!("invalid selectors in {}: {e}", path.display())))?;

    info!("Loaded selector tables from {}", path.display());
    Ok(selectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let settings = Settings::resolve_with(SettingsOverrides::default(), lookup(&[])).unwrap();

        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.decode_url_pattern, DEFAULT_DECODE_URL);
        assert!(settings.credentials.is_none());
        assert_eq!(settings.selectors, emex::default_selectors());
    }

    #[test]
    fn explicit_values_override_environment() {
        let overrides = SettingsOverrides {
            port: Some(9100),
            username: Some("explicit".to_string()),
            ..SettingsOverrides::default()
        };
        let env = lookup(&[
            ("PORT", "8080"),
            ("EMEX_USERNAME", "from-env"),
            ("EMEX_PASSWORD", "secret"),
        ]);

        let settings = Settings::resolve_with(overrides, env).unwrap();

        assert_eq!(settings.port, 9100);
        assert_eq!(
            settings.credentials,
            Some(Credentials {
                username: "explicit".to_string(),
                password: "secret".to_string(),
            })
        );
    }

    #[test]
    fn bad_port_is_rejected() {
        let result = Settings::resolve_with(SettingsOverrides::default(), lookup(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ParserError::Config(_))));
    }

    #[test]
    fn half_credentials_count_as_none() {
        assert!(Credentials::new(Some("user".to_string()), None).is_none());
        assert!(Credentials::new(Some("user".to_string()), Some(String::new())).is_none());
    }

    #[test]
    fn selectors_file_errors_name_the_file() {
        let path = std::env::temp_dir().join(format!("emex-selectors-{}.json", std::process::id()));
        std::fs::write(&path, "<html>not json</html>").unwrap();

        let result = load_selectors(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(ParserError::Config(message)) => {
                assert!(message.contains(&path.display().to_string()), "{message}");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn selectors_file_replaces_built_in_tables() {
        let path = std::env::temp_dir().join(format!("emex-selectors-ok-{}.json", std::process::id()));
        let mut selectors = emex::default_selectors();
        selectors.offers.containers.truncate(1);
        std::fs::write(&path, serde_json::to_string(&selectors).unwrap()).unwrap();

        let path_str = path.display().to_string();
        let result = Settings::resolve_with(
            SettingsOverrides::default(),
            lookup(&[("EMEX_SELECTORS_FILE", path_str.as_str())]),
        );
        std::fs::remove_file(&path).ok();

        assert_eq!(result.unwrap().selectors, selectors);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let settings = Settings::resolve_with(
            SettingsOverrides::default(),
            lookup(&[("EMEX_BASE_URL", "http://localhost:9000/")]),
        )
        .unwrap();
        assert_eq!(settings.base_url, "http://localhost:9000");
    }
}
