use wheels_core::responses::ErrorBody;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Capacity(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyCancelled(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Service unreachable: {0}")]
    Transport(String),
    #[error("Session storage failed: {0}")]
    Storage(String),
}

impl ClientError {
    /// Builds the error for a non-2xx response. `body` is `None` when it was not JSON.
    pub fn from_response(status: u16, body: Option<ErrorBody>) -> Self {
        let Some(body) = body else {
            return ClientError::Api {
                status,
                message: "Unknown error".to_string(),
            };
        };
        let message = body.message.unwrap_or_else(|| format!("Error {}", status));

        match (body.code.as_deref(), status) {
            (Some("VALIDATION"), _) => ClientError::Validation(message),
            (Some("CAPACITY"), _) => ClientError::Capacity(message),
            (Some("AUTHORIZATION"), _) | (None, 403) => ClientError::Authorization(message),
            (Some("AUTHENTICATION"), _) | (None, 401) => ClientError::Authentication(message),
            (Some("NOT_FOUND"), _) | (None, 404) => ClientError::NotFound(message),
            (Some("ALREADY_CANCELLED"), _) => ClientError::AlreadyCancelled(message),
            (Some("CONFLICT"), _) => ClientError::Conflict(message),
            _ => ClientError::Api { status, message },
        }
    }

    /// Text suitable for showing to the user.
    pub fn message(&self) -> String {
        match self {
            ClientError::Transport(_) => "Service unreachable".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: Option<&str>, code: Option<&str>) -> Option<ErrorBody> {
        Some(ErrorBody {
            message: message.map(String::from),
            code: code.map(String::from),
        })
    }

    #[test]
    fn test_code_selects_kind() {
        assert_eq!(
            ClientError::from_response(409, body(Some("Only 1 seats available"), Some("CAPACITY"))),
            ClientError::Capacity("Only 1 seats available".to_string())
        );
        assert_eq!(
            ClientError::from_response(409, body(Some("dup"), Some("CONFLICT"))),
            ClientError::Conflict("dup".to_string())
        );
        assert_eq!(
            ClientError::from_response(409, body(Some("Trip has been cancelled"), Some("TRIP_CANCELLED"))),
            ClientError::Api {
                status: 409,
                message: "Trip has been cancelled".to_string()
            }
        );
    }

    #[test]
    fn test_fallback_messages() {
        assert_eq!(
            ClientError::from_response(502, None).message(),
            "Unknown error"
        );
        assert_eq!(
            ClientError::from_response(500, body(None, None)).message(),
            "Error 500"
        );
        assert_eq!(
            ClientError::from_response(401, body(None, None)),
            ClientError::Authentication("Error 401".to_string())
        );
        assert_eq!(
            ClientError::Transport("connection refused".to_string()).message(),
            "Service unreachable"
        );
    }
}
