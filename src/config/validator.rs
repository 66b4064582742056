use std::collections::HashMap;
use thiserror::Error;

use crate::config::{AgentSettings, McpAuthConfig, McpServerConfig, McpTransportConfig, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_agent(&settings.agent) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_mcp_servers(&settings.mcp_servers) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_agent(agent: &AgentSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if agent.model.trim().is_empty() {
            errors.push(ValidationError::MissingField("agent.model".to_string()));
        }

        if agent.max_steps == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "agent.max_steps".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if agent.max_consecutive_tool_calls == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "agent.max_consecutive_tool_calls".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_mcp_servers(servers: &[McpServerConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen_names = HashMap::new();

        for (idx, server) in servers.iter().enumerate() {
            if server.name.is_empty() {
                errors.push(ValidationError::MissingField(format!("mcp_servers[{}].name", idx)));
            } else if let Some(prev_idx) = seen_names.insert(&server.name, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "MCP server '{}' appears at indices {} and {}",
                    server.name, prev_idx, idx
                )));
            }

            match &server.transport {
                McpTransportConfig::Stdio { command, .. } if command.trim().is_empty() => {
                    errors.push(ValidationError::MissingField(format!(
                        "mcp_servers[{}].transport.command",
                        idx
                    )));
                }
                McpTransportConfig::Http { url }
                    if !(url.starts_with("http://") || url.starts_with("https://")) =>
                {
                    errors.push(ValidationError::InvalidValue {
                        field: format!("mcp_servers[{}].transport.url", idx),
                        reason: format!("'{}' is not an http(s) URL", url),
                    });
                }
                _ => {}
            }

            if let McpAuthConfig::Bearer { token, token_env } = &server.auth {
                if token.is_some() == token_env.is_some() {
                    errors.push(ValidationError::InvalidValue {
                        field: format!("mcp_servers[{}].auth", idx),
                        reason: "Bearer auth needs exactly one of 'token' or 'token_env'".to_string(),
                    });
                }
            }

            if server.timeout_seconds == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: format!("mcp_servers[{}].timeout_seconds", idx),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::McpToolsConfig;
    use crate::schema::Backend;

    fn agent() -> AgentSettings {
        AgentSettings {
            model: "claude-test".to_string(),
            backend: Backend::Anthropic,
            system_prompt: None,
            max_steps: 10,
            max_consecutive_tool_calls: 3,
        }
    }

    fn http_server(name: &str, url: &str) -> McpServerConfig {
        McpServerConfig {
            name: name.to_string(),
            transport: McpTransportConfig::Http { url: url.to_string() },
            auth: McpAuthConfig::None,
            tools: McpToolsConfig::All,
            name_prefix: None,
            enabled: true,
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_valid_config() {
        let settings = Settings {
            agent: agent(),
            mcp_servers: vec![http_server("weather", "http://localhost:3001/mcp")],
        };

        assert!(ConfigValidator::validate(&settings).is_ok());
    }

    #[test]
    fn test_zero_max_steps() {
        let mut agent = agent();
        agent.max_steps = 0;
        let settings = Settings {
            agent,
            mcp_servers: vec![],
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_duplicate_server_names() {
        let settings = Settings {
            agent: agent(),
            mcp_servers: vec![
                http_server("weather", "http://a/mcp"),
                http_server("weather", "http://b/mcp"),
            ],
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Duplicate(_))));
    }

    #[test]
    fn test_bad_url_and_ambiguous_bearer() {
        let mut server = http_server("weather", "ftp://example.com");
        server.auth = McpAuthConfig::Bearer {
            token: Some("t".to_string()),
            token_env: Some("TOKEN".to_string()),
        };
        let settings = Settings {
            agent: agent(),
            mcp_servers: vec![server],
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
