use axum::{extract::State, Json};
use serde::Serialize;
use tamshai_auth::prelude::{AccessPartition, ServerConfig};
use tamshai_types::prelude::CallerIdentity;

use crate::middleware::Caller;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub caller: CallerIdentity,
    pub accessible_servers: Vec<ServerSummary>,
}

#[derive(Serialize)]
pub struct ServerSummary {
    pub name: String,
    pub description: String,
}

pub async fn profile(State(state): State<AppState>, Caller(caller): Caller) -> Json<UserProfile> {
    let access = AccessPartition::resolve(&caller.roles, &state.registry);
    let accessible_servers = access
        .accessible
        .iter()
        .map(|server| ServerSummary {
            name: server.name.clone(),
            description: server.description.clone(),
        })
        .collect();
    Json(UserProfile {
        caller,
        accessible_servers,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueEntry {
    pub name: String,
    pub description: String,
    pub required_roles: Vec<String>,
}

impl From<&ServerConfig> for CatalogueEntry {
    fn from(server: &ServerConfig) -> Self {
        Self {
            name: server.name.clone(),
            description: server.description.clone(),
            required_roles: server.required_roles.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct Catalogue {
    pub accessible: Vec<CatalogueEntry>,
    pub denied: Vec<CatalogueEntry>,
}

pub async fn catalogue(State(state): State<AppState>, Caller(caller): Caller) -> Json<Catalogue> {
    let access = AccessPartition::resolve(&caller.roles, &state.registry);
    Json(Catalogue {
        accessible: access.accessible.iter().map(|s| CatalogueEntry::from(*s)).collect(),
        denied: access.denied.iter().map(|s| CatalogueEntry::from(*s)).collect(),
    })
}
