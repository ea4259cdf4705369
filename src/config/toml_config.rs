use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_API_BASE: &str = "https://api.scratch.mit.edu";
pub const DEFAULT_PROJECTS_BASE: &str = "https://projects.scratch.mit.edu";
pub const DEFAULT_FALLBACK_TEMPLATE: &str =
    "https://projects.scratch.mit.edu/internalapi/project/{id}/get/";
pub const DEFAULT_EXPLORE_URL: &str = "https://api.scratch.mit.edu/explore/projects";
pub const DEFAULT_PROXY: &str = "socks5h://tor_proxy:9050";
pub const DEFAULT_USER_AGENT: &str = concat!("scratch-harvest/", env!("CARGO_PKG_VERSION"));

/// Optional endpoint and network overrides, read from `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestToml {
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_base: String,
    pub projects_base: String,
    /// URL with an `{id}` placeholder, used when no project token is available.
    pub fallback_template: String,
    pub explore_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            projects_base: DEFAULT_PROJECTS_BASE.to_string(),
            fallback_template: DEFAULT_FALLBACK_TEMPLATE.to_string(),
            explore_url: DEFAULT_EXPLORE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one base URL, as a local mirror or test server would serve them.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: base.to_string(),
            projects_base: base.to_string(),
            fallback_template: format!("{}/internalapi/project/{{id}}/get/", base),
            explore_url: format!("{}/explore/projects", base),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl HarvestToml {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HarvestError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarvestError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for HarvestToml {
    fn validate(&self) -> Result<()> {
        validation::validate_url("endpoints.api_base", &self.endpoints.api_base)?;
        validation::validate_url("endpoints.projects_base", &self.endpoints.projects_base)?;
        validation::validate_url("endpoints.explore_url", &self.endpoints.explore_url)?;
        validation::validate_url(
            "endpoints.fallback_template",
            &self.endpoints.fallback_template,
        )?;
        if !self.endpoints.fallback_template.contains("{id}") {
            return Err(HarvestError::InvalidConfigValueError {
                field: "endpoints.fallback_template".to_string(),
                value: self.endpoints.fallback_template.clone(),
                reason: "Template must contain an {id} placeholder".to_string(),
            });
        }
        validation::validate_non_empty_string("network.user_agent", &self.network.user_agent)?;
        if let Some(proxy) = &self.network.proxy {
            validation::validate_proxy_url("network.proxy", proxy)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = HarvestToml::from_toml_str("").unwrap();
        assert_eq!(config.endpoints, Endpoints::default());
        assert!(config.network.proxy.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = HarvestToml::from_toml_str(
            r#"
[endpoints]
api_base = "http://mirror.local:8080"

[network]
proxy = "socks5h://127.0.0.1:9050"
"#,
        )
        .unwrap();

        assert_eq!(config.endpoints.api_base, "http://mirror.local:8080");
        assert_eq!(config.endpoints.projects_base, DEFAULT_PROJECTS_BASE);
        assert_eq!(config.network.proxy.as_deref(), Some("socks5h://127.0.0.1:9050"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("SCRATCH_HARVEST_TEST_MIRROR", "http://10.0.0.5");
        let config = HarvestToml::from_toml_str(
            r#"
[endpoints]
projects_base = "${SCRATCH_HARVEST_TEST_MIRROR}/projects"
explore_url = "${SCRATCH_HARVEST_TEST_UNSET}/explore"
"#,
        )
        .unwrap();

        assert_eq!(config.endpoints.projects_base, "http://10.0.0.5/projects");
        assert_eq!(
            config.endpoints.explore_url,
            "${SCRATCH_HARVEST_TEST_UNSET}/explore"
        );
    }

    #[test]
    fn test_fallback_template_requires_placeholder() {
        let config = HarvestToml::from_toml_str(
            r#"
[endpoints]
fallback_template = "https://example.com/project"
"#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarvestToml::from_toml_str("[endpoints\napi_base = 1").unwrap_err();
        assert!(matches!(err, HarvestError::ConfigError { .. }));
    }

    #[test]
    fn test_shipped_example_is_valid() {
        let config = HarvestToml::from_toml_str(include_str!("../../harvest.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_with_base() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:5000/");
        assert_eq!(endpoints.api_base, "http://127.0.0.1:5000");
        assert_eq!(
            endpoints.fallback_template,
            "http://127.0.0.1:5000/internalapi/project/{id}/get/"
        );
        assert_eq!(endpoints.explore_url, "http://127.0.0.1:5000/explore/projects");
    }
}
