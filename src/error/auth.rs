use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Failure while acquiring an ARM authorizer from one credential strategy.
#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("AZURE_AUTH_LOCATION is not set; cannot locate the SDK auth file")]
    MissingAuthLocation,

    #[error("failed to read auth file {}: {source}", .path.display())]
    AuthFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid auth file {}: {source}", .path.display())]
    AuthFileParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("malformed service principal credentials: {field} is empty")]
    MalformedCredentials { field: &'static str },

    #[error("token endpoint URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("token request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("token endpoint rejected the request: {error}")]
    ServerResponse { error: String },

    #[error("token endpoint parse error: {message}. Body: {body}")]
    Parse { message: String, body: String },

    #[error("token endpoint returned an empty access token")]
    EmptyToken,

    #[error("unexpected token error: {message}")]
    Other { message: String },
}

type ClientCredentialsTokenError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<ClientCredentialsTokenError> for AuthError {
    fn from(e: ClientCredentialsTokenError) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => AuthError::ServerResponse {
                error: match err.error_description() {
                    Some(description) => format!("{}: {}", err.error(), description),
                    None => err.error().to_string(),
                },
            },
            RequestTokenError::Request(wrapper) => match wrapper {
                HttpClientError::Reqwest(real_err) => AuthError::Request(*real_err),
                other => AuthError::Other {
                    message: format!("HttpClientError: {:?}", other),
                },
            },
            RequestTokenError::Parse(parse_err, body) => {
                let body_str = String::from_utf8_lossy(&body);
                let body = body_str
                    .char_indices()
                    .nth(100)
                    .map(|(idx, _)| format!("{}...<truncated>", &body_str[..idx]))
                    .unwrap_or_else(|| body_str.into_owned());
                AuthError::Parse {
                    message: parse_err.to_string(),
                    body,
                }
            }
            RequestTokenError::Other(s) => AuthError::Other { message: s },
        }
    }
}
