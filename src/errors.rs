/// Centralized error types shared by every service in the client.
///
/// The taxonomy mirrors how failures reach the user interface: `Request`
/// carries a message ready to display, `Transport` wraps the network layer
/// (including deadline expiry), and `PartialFetch` stands in for a joined
/// pair of fetches where the caller must not learn which half failed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Request(String),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("dashboard refresh failed")]
    PartialFetch,
}

impl ClientError {
    /// The message the UI should show for this failure.
    pub fn display_message(&self) -> String {
        self.to_string()
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_displays_bare_message() {
        let err = ClientError::Request("Quiz session not found".to_string());
        assert_eq!(err.to_string(), "Quiz session not found");
        assert_eq!(err.display_message(), "Quiz session not found");
    }

    #[test]
    fn test_partial_fetch_hides_which_half_failed() {
        let err = ClientError::PartialFetch;
        assert_eq!(err.to_string(), "dashboard refresh failed");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ClientError = io.into();
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
