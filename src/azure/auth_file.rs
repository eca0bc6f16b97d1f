use serde::Deserialize;
use std::fs;
use std::path::Path;
use url::Url;

use crate::error::AuthError;

/// Service principal file produced by `az ad sp create-for-rbac --sdk-auth`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkAuthFile {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub active_directory_endpoint_url: Option<Url>,
    #[serde(default)]
    pub resource_manager_endpoint_url: Option<Url>,
}

impl SdkAuthFile {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = fs::read_to_string(path).map_err(|source| AuthError::AuthFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, AuthError> {
        // The CLI writes the file with a UTF-8 BOM on some platforms.
        let contents = contents.trim_start_matches('\u{feff}');
        serde_json::from_str(contents).map_err(|source| AuthError::AuthFileParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
