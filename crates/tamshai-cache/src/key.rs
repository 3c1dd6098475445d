#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

pub const CONTEXT_NAMESPACE: &str = "mcp:context";
pub const CONFIRMATION_NAMESPACE: &str = "pending";

impl CacheKey {
    pub fn new(namespace: &str, id: &str) -> Self {
        CacheKey(format!("{namespace}:{id}"))
    }

    pub fn context(user_id: &str) -> Self {
        Self::new(CONTEXT_NAMESPACE, user_id)
    }

    pub fn confirmation(confirmation_id: &str) -> Self {
        Self::new(CONFIRMATION_NAMESPACE, confirmation_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
