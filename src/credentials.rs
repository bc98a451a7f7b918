//! Connection credentials for the management API

use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::error::{CmsError, Result};

/// Everything needed to authenticate and pick a project
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub client_id: String,
    pub root_url: String,
    pub shared_secret: String,
    pub project_name: String,
}

impl Credentials {
    pub fn new(
        root_url: impl Into<String>,
        client_id: impl Into<String>,
        shared_secret: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            root_url: root_url.into(),
            shared_secret: shared_secret.into(),
            project_name: project_name.into(),
        }
    }

    /// Read credentials from `CMS_ROOT_URL`, `CMS_CLIENT_ID`,
    /// `CMS_SHARED_SECRET` and `CMS_PROJECT`
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            env::var(name)
                .map_err(|_| CmsError::InvalidCredentials(format!("{} is not set", name)))
        };

        let credentials = Self::new(
            var("CMS_ROOT_URL")?,
            var("CMS_CLIENT_ID")?,
            var("CMS_SHARED_SECRET")?,
            var("CMS_PROJECT")?,
        );
        credentials.validate()?;
        Ok(credentials)
    }

    /// Load credentials from a JSON file with camelCase keys
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CmsError::InvalidCredentials(format!("cannot read {}: {}", path.display(), e))
        })?;

        let credentials: Self = serde_json::from_str(&raw)?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Reject empty fields and a root URL that does not parse
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("clientId", &self.client_id),
            ("rootUrl", &self.root_url),
            ("sharedSecret", &self.shared_secret),
            ("projectName", &self.project_name),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CmsError::InvalidCredentials(format!("{} is empty", name)));
            }
        }

        let url = reqwest::Url::parse(&self.root_url)
            .map_err(|e| CmsError::InvalidCredentials(format!("rootUrl: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CmsError::InvalidCredentials(format!(
                "rootUrl must be http(s), got {}",
                url.scheme()
            )));
        }

        Ok(())
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("root_url", &self.root_url)
            .field("shared_secret", &"<redacted>")
            .field("project_name", &self.project_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials::new(
            "https://cms-example.cloud.contensis.com",
            "client-123",
            "s3cr3t",
            "website",
        )
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("client-123"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_validate_accepts_complete_credentials() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_field() {
        let mut creds = sample();
        creds.project_name = "  ".to_string();
        let err = creds.validate().unwrap_err();
        assert!(err.to_string().contains("projectName"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut creds = sample();
        creds.root_url = "ftp://cms.example.com".to_string();
        assert!(matches!(
            creds.validate(),
            Err(CmsError::InvalidCredentials(_))
        ));

        creds.root_url = "not a url".to_string();
        assert!(creds.validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "clientId": "abc",
            "rootUrl": "https://cms.example.com",
            "sharedSecret": "xyz",
            "projectName": "intranet"
        }"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.project_name, "intranet");
    }
}
