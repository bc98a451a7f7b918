//! Management API payload types
//!
//! Only the `sys` metadata the manager needs is typed. Entry fields are
//! content-type specific and are carried through as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A content entry as returned by the management API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub sys: EntrySys,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// System metadata attached to every entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<EntryVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<EntryWorkflow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_no: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryWorkflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Entry {
    /// Create a new, unsaved entry of the given content type
    pub fn new(content_type_id: impl Into<String>) -> Self {
        Self {
            sys: EntrySys {
                id: None,
                content_type_id: content_type_id.into(),
                language: None,
                version: None,
                workflow: None,
                extra: Map::new(),
            },
            fields: Map::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.sys.id.as_deref()
    }

    pub fn content_type_id(&self) -> &str {
        &self.sys.content_type_id
    }

    pub fn language(&self) -> Option<&str> {
        self.sys.language.as_deref()
    }

    pub fn version_no(&self) -> Option<&str> {
        self.sys.version.as_ref()?.version_no.as_deref()
    }

    pub fn workflow_state(&self) -> Option<&str> {
        self.sys.workflow.as_ref()?.state.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value; the change is local until the entry is saved
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style id setter, mostly useful in tests and fixtures
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.sys.id = Some(id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.sys.language = Some(language.into());
        self
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    #[serde(default)]
    pub page_index: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> PagedList<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parameters of a single paged list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub content_type_id: String,
    /// `None` means the project's default language
    pub language: Option<String>,
    pub page_index: u32,
    pub page_size: u32,
}

/// Project metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary_language: Option<String>,
    #[serde(default)]
    pub supported_languages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_entry_deserialization_keeps_unknown_fields() {
        let raw = json!({
            "entryTitle": "Open day",
            "body": "<p>Come along</p>",
            "sys": {
                "id": "b8d3f0c2",
                "contentTypeId": "event",
                "language": "en-GB",
                "projectId": "website",
                "version": { "versionNo": "0.3", "modified": "2024-03-01T10:00:00Z" },
                "workflow": { "id": "contensisEntryBasic", "state": "draft" }
            }
        });

        let entry: Entry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.id(), Some("b8d3f0c2"));
        assert_eq!(entry.content_type_id(), "event");
        assert_eq!(entry.version_no(), Some("0.3"));
        assert_eq!(entry.workflow_state(), Some("draft"));
        assert_eq!(entry.field("entryTitle"), Some(&json!("Open day")));

        // Untyped metadata survives a save round trip
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn test_new_entry_serializes_without_id() {
        let mut entry = Entry::new("article");
        entry.set_field("entryTitle", "Hello");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            json!({ "entryTitle": "Hello", "sys": { "contentTypeId": "article" } })
        );
    }

    #[test]
    fn test_paged_list_defaults() {
        let page: PagedList<Entry> = serde_json::from_value(json!({ "pageIndex": 3 })).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page_index, 3);
        assert_eq!(page.total_count, None);
    }
}
