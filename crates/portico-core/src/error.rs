//! Common error types for gateway operations

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while routing, resolving, or calling downstream
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Registry unreachable or rejecting at startup registration.
    /// Fatal to the registering process: it must not serve traffic
    /// while unregistered.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Registry unreachable or returning garbage during a health lookup
    #[error("Registry lookup failed: {0}")]
    Lookup(String),

    /// No passing instance for the requested service name
    #[error("No healthy instance for service: {0}")]
    NoHealthyInstance(String),

    /// No configured route prefix matches the request path
    #[error("No route matches path: {0}")]
    NoRouteMatch(String),

    /// Transport or application error from a resolved connection.
    /// Triggers connection-cache invalidation for that service name.
    #[error("Downstream call failed: {0}")]
    Downstream(String),

    /// Bounded resolution or downstream call exceeded its deadline
    #[error("Operation timed out")]
    Timeout,

    /// Malformed inbound request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Registration(_) => 500,
            GatewayError::Lookup(_) => 502,
            GatewayError::NoHealthyInstance(_) => 503,
            GatewayError::NoRouteMatch(_) => 404,
            GatewayError::Downstream(_) => 502,
            GatewayError::Timeout => 504,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            GatewayError::NoHealthyInstance("users-service".into()).status_code(),
            503
        );
        assert_eq!(
            GatewayError::NoRouteMatch("/nope".into()).status_code(),
            404
        );
        assert_eq!(
            GatewayError::Downstream("connection reset".into()).status_code(),
            502
        );
        assert_eq!(GatewayError::Timeout.status_code(), 504);
    }

    #[test]
    fn display_includes_service_name() {
        let err = GatewayError::NoHealthyInstance("products-service".into());
        assert!(err.to_string().contains("products-service"));
    }
}
