//! Entry API seam and project handle
//!
//! `EntryApi` is the set of remote calls the manager relies on. The HTTP
//! implementation lives in [`crate::client`]; tests substitute an in-memory one.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Entry, EntryQuery, PagedList, ProjectInfo};

/// Remote entry operations, scoped by project id
#[async_trait]
pub trait EntryApi: Send + Sync {
    /// Fetch one page of entries of a content type
    async fn list_entries(&self, project_id: &str, query: &EntryQuery) -> Result<PagedList<Entry>>;

    /// Persist the entry's current state, returning the stored version
    async fn save_entry(&self, project_id: &str, entry: &Entry) -> Result<Entry>;

    /// Advance the entry through the publish workflow event
    async fn publish_entry(&self, project_id: &str, entry: &Entry) -> Result<Entry>;

    /// Remove the entry
    async fn delete_entry(&self, project_id: &str, entry: &Entry) -> Result<()>;
}

/// Handle to a resolved remote project
///
/// Cloning is cheap; all clones share the same API connection.
#[derive(Clone)]
pub struct Project {
    info: ProjectInfo,
    api: Arc<dyn EntryApi>,
}

impl Project {
    pub fn new(info: ProjectInfo, api: Arc<dyn EntryApi>) -> Self {
        Self { info, api }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    pub fn primary_language(&self) -> Option<&str> {
        self.info.primary_language.as_deref()
    }

    pub async fn list_entries(&self, query: &EntryQuery) -> Result<PagedList<Entry>> {
        self.api.list_entries(&self.info.id, query).await
    }

    pub async fn save_entry(&self, entry: &Entry) -> Result<Entry> {
        self.api.save_entry(&self.info.id, entry).await
    }

    pub async fn publish_entry(&self, entry: &Entry) -> Result<Entry> {
        self.api.publish_entry(&self.info.id, entry).await
    }

    pub async fn delete_entry(&self, entry: &Entry) -> Result<()> {
        self.api.delete_entry(&self.info.id, entry).await
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project").field("info", &self.info).finish_non_exhaustive()
    }
}
