//! Entry Manager
//!
//! Simplified access to one project's entries: lazy paged enumeration and
//! retrying publish/delete.
//!
//! ## Example Usage
//!
//! ```ignore
//! use cms_entries::{Credentials, EntryManager, ListOptions};
//! use futures::TryStreamExt;
//!
//! let manager = EntryManager::connect(&Credentials::from_env()?).await?;
//!
//! let mut entries = manager.get_all_entries("article", ListOptions::default().max_number(50));
//! while let Some(entry) = entries.try_next().await? {
//!     if !manager.publish_entry(&entry).await {
//!         eprintln!("could not publish {:?}", entry.id());
//!     }
//! }
//! ```

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::Project;
use crate::client::ManagementClient;
use crate::credentials::Credentials;
use crate::error::{CmsError, Result};
use crate::retry::{retry, RetryOutcome, RetryPolicy};
use crate::types::{Entry, EntryQuery};

pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Paging options for [`EntryManager::get_all_entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: u32,
    /// `None` uses the project's default language
    pub language: Option<String>,
    /// Stop after this many entries; 0 means no limit
    pub max_number: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            language: None,
            max_number: 0,
        }
    }
}

impl ListOptions {
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn max_number(mut self, max_number: usize) -> Self {
        self.max_number = max_number;
        self
    }
}

/// Entry manager bound to a single project
#[derive(Debug, Clone)]
pub struct EntryManager {
    project: Project,
}

impl EntryManager {
    /// Authenticate with `credentials` and resolve the project once
    ///
    /// Failures are returned as-is; nothing here is retried.
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;

        let project = ManagementClient::connect(credentials).await?;
        info!(project = %project.id(), "Entry manager connected");

        Ok(Self::from_project(project))
    }

    /// Wrap an already-resolved project; makes no remote call
    pub fn from_project(project: Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Lazily enumerate entries of a content type, one page request at a time
    ///
    /// Each call starts again from page 0. A failed page request is yielded
    /// as an error and ends the stream.
    pub fn get_all_entries(
        &self,
        content_type_id: &str,
        options: ListOptions,
    ) -> BoxStream<'static, Result<Entry>> {
        let pager = Pager::new(self.project.clone(), content_type_id, options);

        stream::try_unfold(pager, |mut pager| async move {
            let entry = pager.next_entry().await?;
            Ok::<_, CmsError>(entry.map(|entry| (entry, pager)))
        })
        .boxed()
    }

    /// Collect [`Self::get_all_entries`] into a vector
    pub async fn collect_all_entries(
        &self,
        content_type_id: &str,
        options: ListOptions,
    ) -> Result<Vec<Entry>> {
        self.get_all_entries(content_type_id, options).try_collect().await
    }

    /// Save then publish `entry`, retrying with the default policy
    pub async fn publish_entry(&self, entry: &Entry) -> bool {
        self.publish_entry_with(entry, RetryPolicy::default())
            .await
            .succeeded()
    }

    /// Save then publish `entry`; any failure retries both calls
    ///
    /// Each attempt saves the copy returned by the last successful save, so a
    /// retry after a create updates that entry instead of creating another.
    pub async fn publish_entry_with(&self, entry: &Entry, policy: RetryPolicy) -> RetryOutcome<Entry> {
        let project = &self.project;
        let latest = Mutex::new(entry.clone());
        let latest = &latest;

        retry(&policy, "publish", || async move {
            let current = latest.lock().await.clone();
            let saved = project.save_entry(&current).await?;
            *latest.lock().await = saved.clone();
            project.publish_entry(&saved).await
        })
        .await
    }

    /// Delete `entry`, retrying with the default policy
    pub async fn delete_entry(&self, entry: &Entry) -> bool {
        self.delete_entry_with(entry, RetryPolicy::default())
            .await
            .succeeded()
    }

    pub async fn delete_entry_with(&self, entry: &Entry, policy: RetryPolicy) -> RetryOutcome<()> {
        let project = &self.project;

        retry(&policy, "delete", || async move { project.delete_entry(entry).await }).await
    }
}

/// Enumeration state behind `get_all_entries`
struct Pager {
    project: Project,
    content_type_id: String,
    options: ListOptions,
    page_index: u32,
    buffer: VecDeque<Entry>,
    fetched: u64,
    yielded: usize,
    exhausted: bool,
}

impl Pager {
    fn new(project: Project, content_type_id: &str, options: ListOptions) -> Self {
        Self {
            project,
            content_type_id: content_type_id.to_string(),
            options,
            page_index: 0,
            buffer: VecDeque::new(),
            fetched: 0,
            yielded: 0,
            exhausted: false,
        }
    }

    fn limit_reached(&self) -> bool {
        self.options.max_number > 0 && self.yielded >= self.options.max_number
    }

    async fn next_entry(&mut self) -> Result<Option<Entry>> {
        if self.limit_reached() {
            return Ok(None);
        }

        if self.buffer.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }

        let entry = self.buffer.pop_front();
        if entry.is_some() {
            self.yielded += 1;
        }
        Ok(entry)
    }

    async fn fetch_page(&mut self) -> Result<()> {
        if self.options.page_size == 0 {
            return Err(CmsError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }

        let query = EntryQuery {
            content_type_id: self.content_type_id.clone(),
            language: self.options.language.clone(),
            page_index: self.page_index,
            page_size: self.options.page_size,
        };

        let page = self.project.list_entries(&query).await?;
        let count = page.items.len();
        self.page_index += 1;
        self.fetched += count as u64;

        // Only a reported total lets us stop before an empty page; servers may
        // cap or vary page sizes
        self.exhausted = count == 0 || page.total_count.is_some_and(|total| self.fetched >= total);

        debug!(
            content_type = %self.content_type_id,
            page_index = query.page_index,
            count,
            exhausted = self.exhausted,
            "Fetched entry page"
        );

        self.buffer.extend(page.items);
        Ok(())
    }
}
