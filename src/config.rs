//! Configuration types for quick-export
//!
//! The [`Config`] is loaded once at process start and shared read-only as
//! `Arc<Config>`. The only value that changes during a session is the
//! [`AppUsage`] counter, which the host persists at exit.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::Language;

/// Locations of the transient working folders
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the process-local temporary folders (default: `$TMP/quick_export`)
    ///
    /// Artifacts are written to `export/<timestamp>` and mail attachments to
    /// `attachments/<timestamp>` below this folder.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
        }
    }
}

/// Export behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Replace creator/modifier logons with the user's full name (default: true)
    #[serde(default = "default_true")]
    pub apply_username: bool,

    /// Close the host window after a successful export instead of
    /// re-enabling the form (default: false)
    #[serde(default)]
    pub close_app_after: bool,

    /// What to do when an artifact already exists in the destination folder
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Abort the run when a single task takes longer than this (seconds, default: none)
    ///
    /// Without a timeout a hanging collaborator blocks the run indefinitely.
    #[serde(default, with = "optional_duration_serde")]
    pub task_timeout: Option<Duration>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            apply_username: true,
            close_app_after: false,
            file_collision: FileCollisionAction::default(),
            task_timeout: None,
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Overwrite existing file (default)
    #[default]
    Overwrite,
    /// Append (1), (2), etc. to filename
    Rename,
    /// Skip the file, keep existing
    Skip,
}

/// Condition choices offered to the user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Name of the "new part" condition
    #[serde(default = "default_condition_new")]
    pub new: String,

    /// The "modified part" condition and its property overrides
    #[serde(default)]
    pub modified: ModifiedCondition,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            new: default_condition_new(),
            modified: ModifiedCondition::default(),
        }
    }
}

/// The "modified part" condition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModifiedCondition {
    /// Condition name as shown to the user
    #[serde(default = "default_condition_modified")]
    pub name: String,

    /// Property values that replace the document's values when this condition is selected
    #[serde(default)]
    pub overwrite: BTreeMap<String, String>,
}

impl Default for ModifiedCondition {
    fn default() -> Self {
        Self {
            name: default_condition_modified(),
            overwrite: BTreeMap::new(),
        }
    }
}

/// Mail settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailSettings {
    /// Subject suffix; the subject is `"{project} | {subject}"`
    #[serde(default = "default_mail_subject")]
    pub subject: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            subject: default_mail_subject(),
        }
    }
}

/// Names of the document properties the export relies on
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyNames {
    /// Project number
    #[serde(default = "default_prop_project")]
    pub project: String,
    /// Product name (docket)
    #[serde(default = "default_prop_product")]
    pub product: String,
    /// Machine number (export file names)
    #[serde(default = "default_prop_machine")]
    pub machine: String,
    /// Creator logon
    #[serde(default = "default_prop_creator")]
    pub creator: String,
    /// Last modifier logon
    #[serde(default = "default_prop_modifier")]
    pub modifier: String,
    /// Location of the linked drawing file
    #[serde(default = "default_prop_drawing_path")]
    pub drawing_path: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            project: default_prop_project(),
            product: default_prop_product(),
            machine: default_prop_machine(),
            creator: default_prop_creator(),
            modifier: default_prop_modifier(),
            drawing_path: default_prop_drawing_path(),
        }
    }
}

/// Spreadsheet/mail columns, one list per origin
///
/// Item syntax:
/// - `Name=Text` fixed text
/// - `Name:$keyword` built-in document value
/// - `Name:property` user property
/// - `Name` empty placeholder column
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderItems {
    /// Columns for self-made items
    #[serde(default = "default_header_items_made")]
    pub made: Vec<String>,
    /// Columns for purchased (and unknown) items
    #[serde(default = "default_header_items_bought")]
    pub bought: Vec<String>,
}

impl Default for HeaderItems {
    fn default() -> Self {
        Self {
            made: default_header_items_made(),
            bought: default_header_items_bought(),
        }
    }
}

/// Translated keywords for one UI language
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    /// Part number column
    pub partnumber: String,
    /// Revision column
    pub revision: String,
    /// Definition column
    pub definition: String,
    /// Source column
    pub source: String,
    /// Description column
    pub description: String,
    /// Document type column
    #[serde(rename = "type")]
    pub kind: String,
    /// Quantity column
    pub quantity: String,
    /// Origin value: unknown
    pub unknown: String,
    /// Origin value: made
    pub made: String,
    /// Origin value: bought
    pub bought: String,
    /// Document type value: part
    pub part: String,
    /// Document type value: assembly
    pub assembly: String,
}

impl Keywords {
    /// Look up a keyword by its `$key` name
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "partnumber" => &self.partnumber,
            "revision" => &self.revision,
            "definition" => &self.definition,
            "source" => &self.source,
            "description" => &self.description,
            "type" => &self.kind,
            "quantity" => &self.quantity,
            "unknown" => &self.unknown,
            "made" => &self.made,
            "bought" => &self.bought,
            "part" => &self.part,
            "assembly" => &self.assembly,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn english() -> Self {
        Self {
            partnumber: "Part Number".to_string(),
            revision: "Revision".to_string(),
            definition: "Definition".to_string(),
            source: "Source".to_string(),
            description: "Description".to_string(),
            kind: "Type".to_string(),
            quantity: "Quantity".to_string(),
            unknown: "Unknown".to_string(),
            made: "Made".to_string(),
            bought: "Bought".to_string(),
            part: "Part".to_string(),
            assembly: "Assembly".to_string(),
        }
    }

    fn german() -> Self {
        Self {
            partnumber: "Teilenummer".to_string(),
            revision: "Revision".to_string(),
            definition: "Definition".to_string(),
            source: "Quelle".to_string(),
            description: "Beschreibung".to_string(),
            kind: "Typ".to_string(),
            quantity: "Menge".to_string(),
            unknown: "Unbekannt".to_string(),
            made: "Fertigung".to_string(),
            bought: "Kaufteil".to_string(),
            part: "Teil".to_string(),
            assembly: "Baugruppe".to_string(),
        }
    }
}

/// Keyword sets for all supported languages
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeywordSets {
    /// English keywords
    #[serde(default = "Keywords::english")]
    pub en: Keywords,
    /// German keywords
    #[serde(default = "Keywords::german")]
    pub de: Keywords,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            en: Keywords::english(),
            de: Keywords::german(),
        }
    }
}

/// A known user, used to translate logons into names
///
/// Other keys of a user entry, such as a mail address, are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Windows/CAD logon
    pub logon: String,
    /// Full name
    pub name: String,
}

/// Main configuration for quick-export
///
/// Every section has defaults, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transient folder locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Export behavior
    #[serde(default)]
    pub export: ExportSettings,

    /// Condition choices
    #[serde(default)]
    pub condition: ConditionConfig,

    /// Mail settings
    #[serde(default)]
    pub mail: MailSettings,

    /// Document property names
    #[serde(default)]
    pub properties: PropertyNames,

    /// Spreadsheet columns
    #[serde(default)]
    pub header_items: HeaderItems,

    /// Translated keywords
    #[serde(default)]
    pub keywords: KeywordSets,

    /// Known users
    #[serde(default)]
    pub users: Vec<User>,
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        debug!(?path, "loaded configuration");
        Ok(config)
    }

    /// Folder that holds the per-run export folders
    pub fn export_root(&self) -> PathBuf {
        self.paths.temp_dir.join("export")
    }

    /// Folder that holds the per-run attachment folders
    pub fn attachments_root(&self) -> PathBuf {
        self.paths.temp_dir.join("attachments")
    }

    /// Keywords for the given UI language
    pub fn keywords(&self, language: Language) -> &Keywords {
        match language {
            Language::En => &self.keywords.en,
            Language::De => &self.keywords.de,
        }
    }

    /// Find a user by logon (case-insensitive)
    pub fn user_by_logon(&self, logon: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.logon.eq_ignore_ascii_case(logon))
    }
}

/// Usage counter persisted between sessions
///
/// Loaded at process start, incremented once per session and written back at exit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    /// Number of sessions started
    #[serde(default)]
    pub count: u64,
}

impl AppUsage {
    /// Load the counter; a missing or unreadable file starts from zero
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(?path, error = %e, "usage file is corrupt, starting from zero");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Count one more session
    pub fn increment(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Persist the counter, creating the parent folder if needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("quick_export")
}

fn default_true() -> bool {
    true
}

fn default_condition_new() -> String {
    "New".to_string()
}

fn default_condition_modified() -> String {
    "Modified".to_string()
}

fn default_mail_subject() -> String {
    "Quick export".to_string()
}

fn default_prop_project() -> String {
    "project".to_string()
}

fn default_prop_product() -> String {
    "product".to_string()
}

fn default_prop_machine() -> String {
    "machine".to_string()
}

fn default_prop_creator() -> String {
    "creator".to_string()
}

fn default_prop_modifier() -> String {
    "modifier".to_string()
}

fn default_prop_drawing_path() -> String {
    "drawing_path".to_string()
}

fn default_header_items_made() -> Vec<String> {
    [
        "Project:project",
        "Machine:machine",
        "Part Number:$partnumber",
        "Revision:$revision",
        "Definition:$definition",
        "Type:$type",
        "Source:$source",
        "Quantity:$quantity",
        "Material:material",
        "Creator:creator",
        "Modifier:modifier",
        "Remarks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_header_items_bought() -> Vec<String> {
    [
        "Project:project",
        "Machine:machine",
        "Part Number:$partnumber",
        "Description:$description",
        "Source:$source",
        "Quantity:$quantity",
        "Manufacturer:manufacturer",
        "Supplier:supplier",
        "Creator:creator",
        "Remarks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.filter(|s| s.is_finite() && *s >= 0.0).map(Duration::from_secs_f64))
    }
}
