//! Management API Client
//!
//! Thin reqwest wrapper over the CMS management REST API.
//! Handles the client-credentials token, project lookup, and entry
//! list/save/publish/delete calls.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::api::{EntryApi, Project};
use crate::credentials::Credentials;
use crate::error::{CmsError, Result};
use crate::types::{Entry, EntryQuery, PagedList, ProjectInfo};

const USER_AGENT: &str = concat!("cms-entries/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_SCOPE: &str =
    "Entry_Read Entry_Write Entry_Delete ContentType_Read Project_Read Workflow_Read";
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;
// Refresh this long before the server-side expiry
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Management API client
#[derive(Clone)]
pub struct ManagementClient {
    http: Client,
    root_url: String,
    client_id: String,
    shared_secret: String,
    token: Arc<RwLock<Option<AccessToken>>>,
}

// ============================================================
// API Request/Response Types
// ============================================================

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

// ============================================================
// Client Implementation
// ============================================================

impl ManagementClient {
    /// Authenticate against the management API and return a ready client
    pub async fn create(root_url: &str, client_id: &str, shared_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let client = Self {
            http,
            root_url: root_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            shared_secret: shared_secret.to_string(),
            token: Arc::new(RwLock::new(None)),
        };

        client.access_token().await?;
        info!("Authenticated against {} as {}", client.root_url, client.client_id);

        Ok(client)
    }

    /// Authenticate with `credentials` and resolve their project
    pub async fn connect(credentials: &Credentials) -> Result<Project> {
        let client = Self::create(
            &credentials.root_url,
            &credentials.client_id,
            &credentials.shared_secret,
        )
        .await?;

        client.get_project(&credentials.project_name).await
    }

    /// Look up a project by id
    pub async fn get_project(&self, project_name: &str) -> Result<Project> {
        debug!("Looking up project: {}", project_name);

        let url = self.api_url(&format!("projects/{}", urlencoding::encode(project_name)));
        let info: ProjectInfo = self.send_json(self.http.get(&url)).await.map_err(|e| match e {
            CmsError::NotFound(_) => CmsError::NotFound(format!("project {}", project_name)),
            other => other,
        })?;

        debug!("Found project: {}", info.id);
        Ok(Project::new(info, Arc::new(self.clone())))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/management/{}", self.root_url, path)
    }

    fn entry_url(project_id: &str, entry: &Entry) -> Result<String> {
        let id = entry.id().ok_or_else(|| {
            CmsError::InvalidArgument("entry has no id; save it before this call".to_string())
        })?;

        Ok(format!(
            "projects/{}/entries/{}",
            urlencoding::encode(project_id),
            urlencoding::encode(id)
        ))
    }

    /// Current bearer token, requesting a new one when missing or about to expire
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        debug!("Requesting access token for client {}", self.client_id);

        let url = format!("{}/authenticate/connect/token", self.root_url);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.shared_secret.as_str()),
            ("scope", TOKEN_SCOPE),
        ];

        let response = self.http.post(&url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text).unwrap_or_else(|| status.to_string());
            return Err(CmsError::Authentication(message));
        }

        let body = response.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        if token.access_token.is_empty() {
            return Err(CmsError::Authentication("empty access token".to_string()));
        }

        Ok(AccessToken {
            value: token.access_token,
            expires_at: token_expiry(Instant::now(), token.expires_in),
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl EntryApi for ManagementClient {
    async fn list_entries(&self, project_id: &str, query: &EntryQuery) -> Result<PagedList<Entry>> {
        let url = self.api_url(&format!(
            "projects/{}/contenttypes/{}/entries",
            urlencoding::encode(project_id),
            urlencoding::encode(&query.content_type_id)
        ));

        let mut params = vec![
            ("pageIndex", query.page_index.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(language) = &query.language {
            params.push(("language", language.clone()));
        }

        debug!(
            content_type = %query.content_type_id,
            page_index = query.page_index,
            page_size = query.page_size,
            "Listing entries"
        );

        self.send_json(self.http.get(&url).query(&params)).await
    }

    async fn save_entry(&self, project_id: &str, entry: &Entry) -> Result<Entry> {
        let request = match entry.id() {
            Some(_) => self.http.put(self.api_url(&Self::entry_url(project_id, entry)?)),
            None => self.http.post(self.api_url(&format!(
                "projects/{}/entries",
                urlencoding::encode(project_id)
            ))),
        };

        debug!("Saving entry {}", entry.id().unwrap_or("<new>"));
        self.send_json(request.json(entry)).await
    }

    async fn publish_entry(&self, project_id: &str, entry: &Entry) -> Result<Entry> {
        let url = self.api_url(&format!("{}/workflow/events", Self::entry_url(project_id, entry)?));
        let event = WorkflowEvent {
            event: "publish",
            language: entry.language(),
            version: entry.version_no(),
        };

        debug!("Publishing entry {}", entry.id().unwrap_or_default());
        self.send_json(self.http.post(&url).json(&event)).await
    }

    async fn delete_entry(&self, project_id: &str, entry: &Entry) -> Result<()> {
        let url = self.api_url(&Self::entry_url(project_id, entry)?);
        let mut request = self.http.delete(&url);
        if let Some(language) = entry.language() {
            request = request.query(&[("language", language)]);
        }

        debug!("Deleting entry {}", entry.id().unwrap_or_default());
        self.send(request).await?;
        Ok(())
    }
}

/// Expiry for a token issued at `now`; an unrepresentable lifetime falls back to the default
fn token_expiry(now: Instant, expires_in: Option<u64>) -> Instant {
    let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);
    now.checked_add(Duration::from_secs(lifetime))
        .unwrap_or_else(|| now + Duration::from_secs(DEFAULT_TOKEN_LIFETIME))
}

/// Map a non-success reply to `CmsError`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or_else(|| {
        if text.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            text.clone()
        }
    });

    if status == StatusCode::NOT_FOUND {
        return Err(CmsError::NotFound(message));
    }

    Err(CmsError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pull a readable message out of a JSON error payload
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "title", "error"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_string))
}
