use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::AuthError;

/// One domain server. Loaded once at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub name: String,
    pub base_url: Url,
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl ServerConfig {
    pub fn new<I, S>(name: &str, base_url: Url, required_roles: I, description: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roles: Vec<String> = Vec::new();
        for role in required_roles {
            let role = role.into();
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self {
            name: name.to_string(),
            base_url,
            required_roles: roles,
            description: description.to_string(),
        }
    }

    /// Joins `path` under the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let trimmed = base.path().trim_end_matches('/').to_string();
            base.set_path(&format!("{trimmed}/"));
        }
        base.join(path.trim_start_matches('/'))
    }
}

/// Ordered, immutable set of domain servers. Iteration follows configuration
/// order, which is also the order used when assembling aggregated context.
#[derive(Clone, Debug, Default)]
pub struct ServerRegistry {
    servers: Vec<ServerConfig>,
    index: HashMap<String, usize>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<ServerConfig>) -> Result<Self, AuthError> {
        let mut index = HashMap::with_capacity(servers.len());
        for (pos, server) in servers.iter().enumerate() {
            if server.name.is_empty() {
                return Err(AuthError::config("server name cannot be empty"));
            }
            if index.insert(server.name.clone(), pos).is_some() {
                return Err(AuthError::config(&format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
        }
        Ok(Self { servers, index })
    }

    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.index.get(name).map(|pos| &self.servers[*pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str, base: &str) -> ServerConfig {
        ServerConfig::new(name, Url::parse(base).unwrap(), ["r"], "")
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = ServerRegistry::new(vec![
            server("hr", "http://hr:3101"),
            server("hr", "http://hr2:3101"),
        ])
        .unwrap_err();
        assert!(err.0.message_dev.unwrap().contains("duplicate"));
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let s = server("hr", "http://gateway.local/mcp/hr");
        assert_eq!(
            s.endpoint("/tools/list_employees").unwrap().as_str(),
            "http://gateway.local/mcp/hr/tools/list_employees"
        );
        let bare = server("finance", "http://finance:3102");
        assert_eq!(
            bare.endpoint("execute").unwrap().as_str(),
            "http://finance:3102/execute"
        );
    }

    #[test]
    fn dedups_required_roles() {
        let s = ServerConfig::new(
            "hr",
            Url::parse("http://hr").unwrap(),
            ["hr-read", "executive", "hr-read"],
            "",
        );
        assert_eq!(s.required_roles, vec!["hr-read", "executive"]);
    }
}
