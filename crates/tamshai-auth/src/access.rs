use serde::Serialize;
use tamshai_types::prelude::CallerIdentity;

use crate::errors::AuthError;
use crate::registry::{ServerConfig, ServerRegistry};

pub fn has_access(roles: &[String], server: &ServerConfig) -> bool {
    server
        .required_roles
        .iter()
        .any(|required| roles.iter().any(|role| role == required))
}

/// Servers whose required roles intersect `roles`, in registry order.
pub fn accessible<'a>(roles: &[String], registry: &'a ServerRegistry) -> Vec<&'a ServerConfig> {
    registry.iter().filter(|s| has_access(roles, s)).collect()
}

/// Complement of [`accessible`], in registry order.
pub fn denied<'a>(roles: &[String], registry: &'a ServerRegistry) -> Vec<&'a ServerConfig> {
    registry.iter().filter(|s| !has_access(roles, s)).collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct AccessPartition<'a> {
    pub accessible: Vec<&'a ServerConfig>,
    pub denied: Vec<&'a ServerConfig>,
}

impl<'a> AccessPartition<'a> {
    pub fn resolve(roles: &[String], registry: &'a ServerRegistry) -> Self {
        let (accessible, denied) = registry.iter().partition(|s| has_access(roles, s));
        Self { accessible, denied }
    }

    pub fn accessible_names(&self) -> Vec<String> {
        self.accessible.iter().map(|s| s.name.clone()).collect()
    }
}

/// Single-target lookup used by the proxy path: unknown name → not-found,
/// known but role-gated → access denied.
pub fn authorize<'a>(
    caller: &CallerIdentity,
    server_name: &str,
    registry: &'a ServerRegistry,
) -> Result<&'a ServerConfig, AuthError> {
    let server = registry
        .get(server_name)
        .ok_or_else(|| AuthError::server_not_found(server_name, &registry.names()))?;
    if !has_access(&caller.roles, server) {
        return Err(AuthError::access_denied(server_name, &server.required_roles));
    }
    Ok(server)
}
