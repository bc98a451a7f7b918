//! CMS Entry Manager Library
//!
//! Paged enumeration of content entries and retrying publish/delete
//! helpers on top of a headless CMS management API.

pub mod api;
pub mod client;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod retry;
pub mod types;

pub use api::{EntryApi, Project};
pub use client::ManagementClient;
pub use credentials::Credentials;
pub use error::{CmsError, Result};
pub use manager::{EntryManager, ListOptions};
pub use retry::{RetryOutcome, RetryPolicy};
pub use types::{Entry, EntryQuery, PagedList, ProjectInfo};
