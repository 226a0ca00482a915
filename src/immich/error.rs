use thiserror::Error;

/// Transport-level failures talking to the Immich API.
#[derive(Error, Debug)]
pub enum ImmichError {
    #[error("API key is not a valid HTTP header value")]
    InvalidApiKey,

    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },

    #[error("Server returned an unusable next page token: {0:?}")]
    InvalidPageToken(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_names_endpoint() {
        let e = ImmichError::Status {
            status: 401,
            endpoint: "/search/metadata".into(),
            body: "Invalid API key".into(),
        };
        assert_eq!(
            e.to_string(),
            "HTTP 401 from /search/metadata: Invalid API key"
        );
    }

    #[test]
    fn test_page_token_error_quotes_token() {
        let e = ImmichError::InvalidPageToken("next".into());
        assert_eq!(
            e.to_string(),
            "Server returned an unusable next page token: \"next\""
        );
    }
}
