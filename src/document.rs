//! Document context provider
//!
//! The CAD host is reached through the [`DocumentContext`] trait. Property
//! lookups return an explicit [`PropertyLookup`] instead of failing, so callers
//! decide whether a missing property is an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Language, Origin};

/// Outcome of a property lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyLookup {
    /// The property exists
    Found(String),
    /// The document has no such property
    NotFound,
    /// The host failed while reading the property
    Error(String),
}

impl PropertyLookup {
    /// The value, if found
    pub fn value(&self) -> Option<&str> {
        match self {
            PropertyLookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the property exists
    pub fn exists(&self) -> bool {
        matches!(self, PropertyLookup::Found(_))
    }

    /// Treat anything but `Found` as an error
    pub fn into_result(self, name: &str) -> Result<String> {
        match self {
            PropertyLookup::Found(value) => Ok(value),
            PropertyLookup::NotFound => Err(Error::Property {
                name: name.to_string(),
                reason: "not found".to_string(),
            }),
            PropertyLookup::Error(reason) => Err(Error::Property {
                name: name.to_string(),
                reason,
            }),
        }
    }

    /// `Found` as `Some`, `NotFound` as `None`, host errors as errors
    pub fn into_option(self, name: &str) -> Result<Option<String>> {
        match self {
            PropertyLookup::Found(value) => Ok(Some(value)),
            PropertyLookup::NotFound => Ok(None),
            PropertyLookup::Error(reason) => Err(Error::Property {
                name: name.to_string(),
                reason,
            }),
        }
    }
}

/// Read access to the document being exported
pub trait DocumentContext: Send + Sync {
    /// Origin classification
    fn origin(&self) -> Origin;

    /// Part number
    fn part_number(&self) -> String;

    /// Revision
    fn revision(&self) -> String;

    /// Definition
    fn definition(&self) -> String;

    /// Description reference
    fn description(&self) -> String;

    /// Whether the document is a single part (STL is only exported for parts)
    fn is_part(&self) -> bool;

    /// UI language of the host
    fn language(&self) -> Language;

    /// Look up a user property by name
    fn property(&self, name: &str) -> PropertyLookup;

    /// Folder of the workspace the document belongs to, if any
    fn workspace_folder(&self) -> Option<&Path> {
        None
    }
}

/// Snapshot of a document's metadata
///
/// ```
/// use quick_export::document::{DocumentContext, StaticDocument};
/// use quick_export::types::Origin;
///
/// let doc = StaticDocument::new("P-100", "B")
///     .with_origin(Origin::Made)
///     .with_property("project", "4711");
/// assert_eq!(doc.property("project").value(), Some("4711"));
/// assert!(!doc.property("material").exists());
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticDocument {
    origin: Origin,
    part_number: String,
    revision: String,
    definition: String,
    description: String,
    is_part: bool,
    language: Language,
    properties: HashMap<String, String>,
    workspace_folder: Option<PathBuf>,
}

impl StaticDocument {
    /// A part with the given part number and revision
    pub fn new(part_number: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            part_number: part_number.into(),
            revision: revision.into(),
            is_part: true,
            ..Default::default()
        }
    }

    /// Set the origin
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Set the definition
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the document as an assembly
    pub fn assembly(mut self) -> Self {
        self.is_part = false;
        self
    }

    /// Set the UI language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Add a user property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Place the document in a workspace
    pub fn with_workspace_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.workspace_folder = Some(folder.into());
        self
    }
}

impl DocumentContext for StaticDocument {
    fn origin(&self) -> Origin {
        self.origin
    }

    fn part_number(&self) -> String {
        self.part_number.clone()
    }

    fn revision(&self) -> String {
        self.revision.clone()
    }

    fn definition(&self) -> String {
        self.definition.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn is_part(&self) -> bool {
        self.is_part
    }

    fn language(&self) -> Language {
        self.language
    }

    fn property(&self, name: &str) -> PropertyLookup {
        match self.properties.get(name) {
            Some(value) => PropertyLookup::Found(value.clone()),
            None => PropertyLookup::NotFound,
        }
    }

    fn workspace_folder(&self) -> Option<&Path> {
        self.workspace_folder.as_deref()
    }
}
