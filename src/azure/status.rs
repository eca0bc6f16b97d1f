use reqwest::StatusCode;

/// How the gateway fetch loop treats an ARM response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// Identity or role assignment problem; logged with hints and retried.
    Forbidden,
    /// The gateway does not exist; the only terminal status.
    NotFound,
    OtherTransient,
}

impl StatusClass {
    pub fn classify(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => StatusClass::Success,
            StatusCode::FORBIDDEN => StatusClass::Forbidden,
            StatusCode::NOT_FOUND => StatusClass::NotFound,
            _ => StatusClass::OtherTransient,
        }
    }
}
