use std::env;

use crate::domain::ticket::DEFAULT_ISSUE_TYPE;
use crate::error::{AppError, AppResult};

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_EPIC_LINK_FIELD: &str = "customfield_10014";
const DEFAULT_SPRINT_FIELD: &str = "customfield_10020";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira_base_url: Option<String>,
    pub jira_username: Option<String>,
    pub jira_token: Option<String>,
    pub api_version: ApiVersion,
    pub epic_link_field: String,
    pub sprint_field: String,
    pub default_issue_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// Plain-text descriptions.
    V2,
    /// Descriptions travel as Atlassian documents.
    V3,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V2 => "2",
            ApiVersion::V3 => "3",
        }
    }

    fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "2" => Ok(ApiVersion::V2),
            "3" => Ok(ApiVersion::V3),
            other => Err(AppError::Configuration(format!(
                "unsupported Jira API version '{other}' (expected 2 or 3)"
            ))),
        }
    }
}

impl AppConfig {
    /// Reads settings from the environment, after loading `.env` if present.
    pub fn load() -> AppResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let protocol = read("JIRA_PROTOCOL").unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        let jira_base_url = read("JIRA_HOST").map(|host| {
            if host.contains("://") {
                host
            } else {
                format!("{protocol}://{host}")
            }
        });

        let api_version = match read("JIRA_API_VERSION") {
            Some(value) => ApiVersion::parse(&value)?,
            None => ApiVersion::V2,
        };

        Ok(Self {
            jira_base_url,
            jira_username: read("JIRA_USERNAME"),
            jira_token: read("JIRA_API_TOKEN"),
            api_version,
            epic_link_field: read("JIRA_EPIC_LINK_FIELD")
                .unwrap_or_else(|| DEFAULT_EPIC_LINK_FIELD.to_string()),
            sprint_field: read("JIRA_SPRINT_FIELD")
                .unwrap_or_else(|| DEFAULT_SPRINT_FIELD.to_string()),
            default_issue_type: read("JIRA_ISSUE_TYPE")
                .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
        })
    }

    /// Settings that will make every tracker call fail.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.jira_base_url.is_none() {
            missing.push("JIRA_HOST");
        }
        if self.jira_username.is_none() {
            missing.push("JIRA_USERNAME");
        }
        if self.jira_token.is_none() {
            missing.push("JIRA_API_TOKEN");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.jira_base_url, None);
        assert_eq!(config.api_version, ApiVersion::V2);
        assert_eq!(config.epic_link_field, "customfield_10014");
        assert_eq!(config.sprint_field, "customfield_10020");
        assert_eq!(config.default_issue_type, "Story");
        assert_eq!(
            config.missing_settings(),
            ["JIRA_HOST", "JIRA_USERNAME", "JIRA_API_TOKEN"]
        );
    }

    #[test]
    fn builds_base_url_from_protocol_and_host() {
        let config = config_from(&[
            ("JIRA_HOST", "acme.atlassian.net"),
            ("JIRA_PROTOCOL", "http"),
            ("JIRA_USERNAME", "me@acme.io"),
            ("JIRA_API_TOKEN", "secret"),
        ])
        .unwrap();
        assert_eq!(
            config.jira_base_url.as_deref(),
            Some("http://acme.atlassian.net")
        );
        assert!(config.missing_settings().is_empty());
    }

    #[test]
    fn host_with_scheme_is_kept() {
        let config = config_from(&[("JIRA_HOST", "https://jira.internal:8443")]).unwrap();
        assert_eq!(
            config.jira_base_url.as_deref(),
            Some("https://jira.internal:8443")
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("JIRA_API_TOKEN", "  ")]).unwrap();
        assert_eq!(config.jira_token, None);
    }

    #[test]
    fn rejects_unknown_api_version() {
        assert!(matches!(
            config_from(&[("JIRA_API_VERSION", "4")]),
            Err(AppError::Configuration(_))
        ));
        let config = config_from(&[("JIRA_API_VERSION", "3")]).unwrap();
        assert_eq!(config.api_version, ApiVersion::V3);
    }
}
