//! Collection and document paths
//!
//! Paths alternate collection and document segments:
//! - `posts` is a collection, `posts/42` a document
//! - `posts/42/comments` is a sub-collection, `posts/42/comments/abc` a document in it

use std::fmt;

use crate::error::{StoreError, StoreResult};

const SEPARATOR: char = '/';

fn segment_count(path: &str) -> StoreResult<usize> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("empty path".to_string()));
    }

    let mut count = 0;
    for segment in path.split(SEPARATOR) {
        if segment.trim().is_empty() {
            return Err(StoreError::InvalidPath(format!(
                "empty segment in '{}'",
                path
            )));
        }
        count += 1;
    }
    Ok(count)
}

fn validate_segment(segment: &str) -> StoreResult<()> {
    if segment.trim().is_empty() || segment.contains(SEPARATOR) {
        return Err(StoreError::InvalidPath(format!(
            "invalid path segment '{}'",
            segment
        )));
    }
    Ok(())
}

/// Path of a collection (odd number of segments)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        if segment_count(&path)? % 2 == 0 {
            return Err(StoreError::InvalidPath(format!(
                "'{}' names a document, not a collection",
                path
            )));
        }
        Ok(Self(path))
    }

    /// Document with the given id inside this collection
    pub fn doc(&self, id: &str) -> StoreResult<DocPath> {
        validate_segment(id)?;
        Ok(DocPath(format!("{}{}{}", self.0, SEPARATOR, id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document (even number of segments)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        if segment_count(&path)? % 2 != 0 {
            return Err(StoreError::InvalidPath(format!(
                "'{}' names a collection, not a document",
                path
            )));
        }
        Ok(Self(path))
    }

    /// Last segment of the path
    pub fn id(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, id)| id)
            .unwrap_or(&self.0)
    }

    /// Collection containing this document
    pub fn collection(&self) -> CollectionPath {
        let parent = self
            .0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| parent)
            .unwrap_or(&self.0);
        CollectionPath(parent.to_string())
    }

    /// Sub-collection nested under this document
    pub fn child(&self, name: &str) -> StoreResult<CollectionPath> {
        validate_segment(name)?;
        Ok(CollectionPath(format!("{}{}{}", self.0, SEPARATOR, name)))
    }

    /// True when `collection` lives somewhere below this document
    pub fn is_ancestor_of(&self, collection: &CollectionPath) -> bool {
        collection
            .as_str()
            .strip_prefix(self.0.as_str())
            .map(|rest| rest.starts_with(SEPARATOR))
            .unwrap_or(false)
    }

    /// True when `other` is this document or lives below it
    pub fn contains(&self, other: &DocPath) -> bool {
        other.0 == self.0
            || other
                .0
                .strip_prefix(self.0.as_str())
                .map(|rest| rest.starts_with(SEPARATOR))
                .unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
