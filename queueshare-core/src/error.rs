use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Describes why a call to the backend did not produce a usable value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never reached the server
    #[error("{0}")]
    Transport(String),
    /// The server responded with a non-2xx status
    #[error("{message}")]
    Http { status: u16, message: String },
    /// A successful response is missing fields the caller depends on
    #[error("Response is missing expected fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    /// A successful response does not have the expected shape
    #[error("Response could not be decoded: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns the HTTP status, if the server was reached at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Whether the response violated the expected contract rather than failing outright
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::MissingFields(_) | Self::Decode(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::ApiError;

    #[test]
    fn missing_fields_name_each_field() {
        let error = ApiError::MissingFields(vec!["token".into(), "expires_at".into()]);

        assert_eq!(
            error.to_string(),
            "Response is missing expected fields: token, expires_at"
        );
        assert!(error.is_contract());
        assert_eq!(error.status(), None);
    }

    #[test]
    fn status_helpers() {
        let error = ApiError::Http {
            status: 403,
            message: "Wrong room password".into(),
        };

        assert!(error.is_forbidden());
        assert!(!error.is_conflict());
        assert_eq!(error.to_string(), "Wrong room password");
        assert!(ApiError::Transport("dns error".into()).status().is_none());
    }
}
