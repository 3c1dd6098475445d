use http::{HeaderMap, HeaderName, HeaderValue};
use tamshai_types::prelude::CallerIdentity;

use crate::errors::AuthError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const EMAIL_HEADER: &str = "x-user-email";
pub const ROLES_HEADER: &str = "x-user-roles";
pub const GROUPS_HEADER: &str = "x-user-groups";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.unwrap_or_default().split(',') {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Reads the identity the upstream authentication layer attached to the
/// request. Only `X-User-ID` is mandatory.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
    let user_id = header_str(headers, USER_ID_HEADER)
        .ok_or_else(|| AuthError::unauthenticated("missing X-User-ID header"))?;
    let username = header_str(headers, USERNAME_HEADER).unwrap_or(user_id);
    Ok(CallerIdentity {
        user_id: user_id.to_string(),
        username: username.to_string(),
        email: header_str(headers, EMAIL_HEADER).map(str::to_string),
        roles: split_list(header_str(headers, ROLES_HEADER)),
        groups: split_list(header_str(headers, GROUPS_HEADER)),
    })
}

/// Attaches `caller` to an outbound domain-server request.
pub fn apply_identity_headers(caller: &CallerIdentity, headers: &mut HeaderMap) {
    let mut put = |name: &'static str, value: &str| {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };
    put(USER_ID_HEADER, &caller.user_id);
    put(USERNAME_HEADER, &caller.username);
    if let Some(email) = &caller.email {
        put(EMAIL_HEADER, email);
    }
    put(ROLES_HEADER, &caller.roles.join(","));
    if !caller.groups.is_empty() {
        put(GROUPS_HEADER, &caller.groups.join(","));
    }
}
