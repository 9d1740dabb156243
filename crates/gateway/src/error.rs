use thiserror::Error;

/// Normalized failure of one backend call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport failure calling `{endpoint}`: {message}")]
    Transport { endpoint: String, message: String },
    #[error("call to `{endpoint}` timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },
    #[error("backend returned {status} for `{endpoint}`: {message}")]
    Remote { endpoint: String, status: u16, message: String },
    #[error("backend client construction failed: {0}")]
    Construction(String),
}

impl GatewayError {
    /// Whether the dispatcher's retry policy may re-attempt this call.
    ///
    /// Transport failures and server-side (5xx) remote errors are
    /// transient; client-side (4xx) remote errors are the request's fault
    /// and repeat identically. Timeouts are excluded because the deadline
    /// has already been spent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Remote { status, .. } => *status >= 500,
            Self::Timeout { .. } | Self::Construction(_) => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayError;

    #[test]
    fn transport_and_server_errors_are_retryable() {
        let transport = GatewayError::Transport {
            endpoint: "/tools/todo.list".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(transport.is_retryable());

        let server_error = GatewayError::Remote {
            endpoint: "/tools/todo.list".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(server_error.is_retryable());
    }

    #[test]
    fn client_errors_and_timeouts_are_not_retryable() {
        let bad_request = GatewayError::Remote {
            endpoint: "/tools/todo.list".to_string(),
            status: 400,
            message: "unknown bucket".to_string(),
        };
        assert!(!bad_request.is_retryable());

        let timeout =
            GatewayError::Timeout { endpoint: "/tools/todo.list".to_string(), timeout_secs: 30 };
        assert!(!timeout.is_retryable());
        assert!(timeout.is_timeout());
    }
}
