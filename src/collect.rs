//! Export data collection
//!
//! Turns the configured header items into the name/value pairs that end up in
//! the spreadsheet and the notification mail.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, Keywords, PropertyNames};
use crate::document::DocumentContext;
use crate::error::Result;
use crate::types::Origin;

/// Project choice that keeps the document's own project number
pub const KEEP: &str = "Keep";

/// One column of the export
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datum {
    /// Column position
    pub index: usize,
    /// Column header
    pub name: String,
    /// Cell value (empty for placeholders and missing properties)
    pub value: String,
}

/// All columns of one export, in header order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportData {
    /// Columns
    pub items: Vec<Datum>,
}

impl ExportData {
    /// Column headers
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|d| d.name.as_str())
    }

    /// Cell values
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|d| d.value.as_str())
    }

    /// Value of the first column with the given header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// The project the user picked
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSelection {
    /// Use the document's project property
    Keep,
    /// Use this project number for the export only
    Project(String),
}

impl ProjectSelection {
    /// Interpret the form value; [`KEEP`] keeps the document's project
    pub fn parse(value: &str) -> Self {
        if value == KEEP {
            ProjectSelection::Keep
        } else {
            ProjectSelection::Project(value.to_string())
        }
    }
}

/// The user's form values that feed into the data
#[derive(Clone, Copy, Debug)]
pub struct Selection<'a> {
    /// Resolved project number
    pub project: &'a str,
    /// Selected condition name
    pub condition: &'a str,
    /// Quantity as entered
    pub quantity: &'a str,
}

/// A parsed header item
#[derive(Clone, Debug, PartialEq, Eq)]
enum HeaderItem<'a> {
    Fixed { name: &'a str, text: &'a str },
    Value { name: &'a str, source: &'a str },
    Placeholder { name: &'a str },
}

impl<'a> HeaderItem<'a> {
    fn parse(item: &'a str) -> Self {
        if let Some((name, text)) = item.split_once('=') {
            HeaderItem::Fixed { name, text }
        } else if let Some((name, source)) = item.split_once(':') {
            HeaderItem::Value { name, source }
        } else {
            HeaderItem::Placeholder { name: item }
        }
    }
}

/// Resolve the user's project choice to a project number
pub fn resolve_project(
    selection: &ProjectSelection,
    document: &dyn DocumentContext,
    properties: &PropertyNames,
) -> Result<String> {
    match selection {
        ProjectSelection::Keep => document
            .property(&properties.project)
            .into_result(&properties.project),
        ProjectSelection::Project(project) => Ok(project.clone()),
    }
}

/// Base file name of the export artifacts
///
/// `"{machine} {partnumber} Rev{revision}"`, prefixed with `"{project} "` when given.
pub fn export_name(
    document: &dyn DocumentContext,
    properties: &PropertyNames,
    project: Option<&str>,
) -> Result<String> {
    let machine = document
        .property(&properties.machine)
        .into_result(&properties.machine)?;
    let name = format!(
        "{} {} Rev{}",
        machine,
        document.part_number(),
        document.revision()
    );
    Ok(match project {
        Some(project) if !project.is_empty() => format!("{} {}", project, name),
        _ => name,
    })
}

/// Localized origin name
pub fn translate_origin(origin: Origin, keywords: &Keywords) -> String {
    match origin {
        Origin::Unknown => keywords.unknown.clone(),
        Origin::Made => keywords.made.clone(),
        Origin::Bought => keywords.bought.clone(),
    }
}

/// Localized document type name
pub fn translate_type(is_part: bool, keywords: &Keywords) -> String {
    if is_part {
        keywords.part.clone()
    } else {
        keywords.assembly.clone()
    }
}

/// Collect the export data for `document`
///
/// Uses the made or bought header list depending on the document's origin.
/// A property the document does not have yields an empty value; a host error
/// while reading one fails the collection.
pub fn collect_data(
    document: &dyn DocumentContext,
    config: &Config,
    selection: &Selection<'_>,
) -> Result<ExportData> {
    let header_items = if document.origin().is_made() {
        &config.header_items.made
    } else {
        &config.header_items.bought
    };
    let keywords = config.keywords(document.language());

    let mut items = Vec::with_capacity(header_items.len());
    for (index, item) in header_items.iter().enumerate() {
        debug!(item = %item, "gathering data");
        let (name, value) = match HeaderItem::parse(item) {
            HeaderItem::Fixed { name, text } => (name.to_string(), text.to_string()),
            HeaderItem::Value { name, source } => {
                let name = match source.strip_prefix('$').and_then(|key| keywords.get(key)) {
                    Some(translated) => translated.to_string(),
                    None => name.to_string(),
                };
                let value = translate_value(source, document, config, keywords, selection)?;
                (name, value)
            }
            HeaderItem::Placeholder { name } => (name.to_string(), String::new()),
        };
        items.push(Datum { index, name, value });
    }

    Ok(ExportData { items })
}

fn translate_value(
    source: &str,
    document: &dyn DocumentContext,
    config: &Config,
    keywords: &Keywords,
    selection: &Selection<'_>,
) -> Result<String> {
    if let Some(key) = source.strip_prefix('$') {
        let value = match key {
            "partnumber" => document.part_number(),
            "revision" => document.revision(),
            "definition" => document.definition(),
            "source" => translate_origin(document.origin(), keywords),
            "description" => document.description(),
            "type" => translate_type(document.is_part(), keywords),
            "quantity" => selection.quantity.to_string(),
            _ => source.to_string(),
        };
        return Ok(value);
    }

    let Some(raw) = document.property(source).into_option(source)? else {
        return Ok(String::new());
    };

    let props = &config.properties;
    let modified = &config.condition.modified;
    if selection.condition == modified.name
        && let Some(overwrite) = modified.overwrite.get(source)
    {
        return Ok(overwrite.clone());
    }
    if source == props.project {
        return Ok(selection.project.to_string());
    }
    if config.export.apply_username
        && (source == props.creator || source == props.modifier)
        && let Some(user) = config.user_by_logon(&raw)
    {
        return Ok(user.name.clone());
    }
    Ok(raw)
}
