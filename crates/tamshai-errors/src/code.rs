use crate::kind::ErrorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub id: &'static str,
    pub http_status: u16,
    pub kind: ErrorKind,
}

impl ErrorCode {
    pub const fn new(id: &'static str, http_status: u16, kind: ErrorKind) -> Self {
        Self {
            id,
            http_status,
            kind,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id)
    }
}

pub mod codes {
    use super::ErrorCode;
    use crate::kind::ErrorKind;

    pub const INVALID_REQUEST: ErrorCode =
        ErrorCode::new("INVALID_REQUEST", 400, ErrorKind::Validation);
    pub const INVALID_TOOL_NAME: ErrorCode =
        ErrorCode::new("INVALID_TOOL_NAME", 400, ErrorKind::Validation);
    pub const UNAUTHENTICATED: ErrorCode =
        ErrorCode::new("UNAUTHENTICATED", 401, ErrorKind::Authentication);
    pub const ACCESS_DENIED: ErrorCode =
        ErrorCode::new("ACCESS_DENIED", 403, ErrorKind::Authorization);
    pub const SERVER_NOT_FOUND: ErrorCode =
        ErrorCode::new("SERVER_NOT_FOUND", 404, ErrorKind::NotFound);
    pub const CONFIRMATION_NOT_FOUND: ErrorCode =
        ErrorCode::new("CONFIRMATION_NOT_FOUND", 404, ErrorKind::NotFound);
    pub const UPSTREAM_TIMEOUT: ErrorCode =
        ErrorCode::new("UPSTREAM_TIMEOUT", 504, ErrorKind::Timeout);
    pub const UPSTREAM_ERROR: ErrorCode =
        ErrorCode::new("UPSTREAM_ERROR", 502, ErrorKind::Backend);
    pub const SERVICE_UNAVAILABLE: ErrorCode =
        ErrorCode::new("SERVICE_UNAVAILABLE", 503, ErrorKind::Unavailable);
    pub const CACHE_UNAVAILABLE: ErrorCode =
        ErrorCode::new("CACHE_UNAVAILABLE", 503, ErrorKind::Unavailable);
    pub const LLM_ERROR: ErrorCode = ErrorCode::new("LLM_ERROR", 502, ErrorKind::Backend);
    pub const INTEGRITY_VIOLATION: ErrorCode =
        ErrorCode::new("INTEGRITY_VIOLATION", 500, ErrorKind::Integrity);
    pub const INTERNAL_ERROR: ErrorCode =
        ErrorCode::new("INTERNAL_ERROR", 500, ErrorKind::Internal);
}
