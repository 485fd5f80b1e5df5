//! # HTML Extraction Engine
//!
//! Turns a scraped page into typed records without trusting its markup to
//! stay put. Each entity kind is described by an [`EntityTable`]:
//!
//! - **Containers**: an ordered list of strategies for locating one node per
//!   record. The first strategy that matches at least one node wins and the
//!   rest are never consulted.
//! - **Fields**: for every field, an ordered list of locators searched inside
//!   the node. The first locator whose element carries non-blank text wins.
//!
//! Tables are plain data, so a new layout variant is a new row in a table
//! (or in the JSON file loaded at startup), not new control flow.
//!
//! Nodes are processed independently: a node with no usable field is dropped
//! and counted, the others are kept. An empty page is a valid result.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ParserError, Result};
use crate::models::{Offer, PartListing};
use crate::traits::SiteSelectors;

/// Attribute equality test, e.g. `data-title="Цена"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMatch {
    pub name: String,
    pub value: String,
}

/// One tag/class/attribute triple. Unset parts match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributeMatch>,
}

impl Locator {
    pub fn class(class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            ..Self::default()
        }
    }

    pub fn tag_class(tag: &str, class: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            class: Some(class.to_string()),
            attribute: None,
        }
    }

    pub fn tag_attr(tag: &str, name: &str, value: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            class: None,
            attribute: Some(AttributeMatch {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Renders the triple as a CSS selector.
    pub fn to_css(&self) -> Result<String> {
        if self.tag.is_none() && self.class.is_none() && self.attribute.is_none() {
            return Err(ParserError::Selector("locator matches nothing specific".to_string()));
        }

        let mut css = self.tag.clone().unwrap_or_default();

        if let Some(class) = &self.class {
            for name in class.split_whitespace() {
                css.push('.');
                css.push_str(name);
            }
        }

        if let Some(attr) = &self.attribute {
            let valid_name = !attr.name.is_empty()
                && attr
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
            if !valid_name {
                return Err(ParserError::Selector(format!(
                    "invalid attribute name '{}' in locator",
                    attr.name
                )));
            }

            let value = attr.value.replace('\\', "\\\\").replace('"', "\\\"");
            css.push_str(&format!("[{}=\"{}\"]", attr.name, value));
        }

        Ok(css)
    }

    fn compile(&self) -> Result<Selector> {
        let css = self.to_css()?;
        Selector::parse(&css)
            .map_err(|e| ParserError::Selector(format!("failed to parse '{css}': {e:?}")))
    }
}

/// Ordered locators for one output field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub locators: Vec<Locator>,
}

impl FieldRule {
    pub fn new(name: &str, locators: Vec<Locator>) -> Self {
        Self {
            name: name.to_string(),
            locators,
        }
    }
}

/// Container strategies plus field rules for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTable {
    pub containers: Vec<Locator>,
    pub fields: Vec<FieldRule>,
}

impl EntityTable {
    pub fn compile(&self, kind: &'static str) -> Result<CompiledTable> {
        if self.containers.is_empty() {
            return Err(ParserError::Selector(format!("no container strategies for {kind}")));
        }

        let containers = self
            .containers
            .iter()
            .map(Locator::compile)
            .collect::<Result<Vec<_>>>()?;

        let fields = self
            .fields
            .iter()
            .map(|rule| {
                Ok(CompiledField {
                    name: rule.name.clone(),
                    selectors: rule.locators.iter().map(Locator::compile).collect::<Result<_>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledTable {
            kind,
            containers,
            fields,
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledField {
    name: String,
    selectors: Vec<Selector>,
}

/// An [`EntityTable`] with every locator parsed into a [`Selector`]
#[derive(Debug, Clone)]
pub struct CompiledTable {
    kind: &'static str,
    containers: Vec<Selector>,
    fields: Vec<CompiledField>,
}

impl CompiledTable {
    /// Applies container strategies in order and returns the index of the
    /// winner with its nodes. Later strategies are not evaluated.
    fn locate<'a>(&self, document: &'a Html) -> Option<(usize, Vec<ElementRef<'a>>)> {
        self.containers.iter().enumerate().find_map(|(index, selector)| {
            let nodes: Vec<ElementRef<'a>> = document.select(selector).collect();
            (!nodes.is_empty()).then_some((index, nodes))
        })
    }
}

/// Result of looking up one field inside one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Found(String),
    /// Some locator matched, but only whitespace was inside
    Blank,
    Missing,
}

/// Field values found in one node, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet(BTreeMap<String, String>);

impl FieldSet {
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A record type the engine can build from a [`FieldSet`].
///
/// A record equal to its default carries no data and is never emitted.
pub trait Extractable: Sized + Default + PartialEq {
    fn from_fields(fields: FieldSet) -> Self;
}

impl Extractable for PartListing {
    fn from_fields(mut fields: FieldSet) -> Self {
        Self {
            article: fields.take("article"),
            name: fields.take("name"),
            price: fields.take("price"),
            availability: fields.take("availability"),
            manufacturer: fields.take("manufacturer"),
            delivery_time: fields.take("delivery_time"),
        }
    }
}

impl Extractable for Offer {
    fn from_fields(mut fields: FieldSet) -> Self {
        Self {
            price: fields.take("price"),
            availability: fields.take("availability"),
            warehouse: fields.take("warehouse"),
            delivery_time: fields.take("delivery_time"),
        }
    }
}

/// Per-page summary, logged after every extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    /// Index of the winning container strategy
    pub strategy: Option<usize>,
    pub candidates: usize,
    pub kept: usize,
    pub dropped: usize,
    pub blank_fields: usize,
}

/// Visible text of an element: fragments trimmed, blanks dropped, joined by a space.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_field(node: ElementRef<'_>, field: &CompiledField) -> FieldOutcome {
    let mut matched = false;

    for selector in &field.selectors {
        if let Some(element) = node.select(selector).next() {
            let text = element_text(element);
            if !text.is_empty() {
                return FieldOutcome::Found(text);
            }
            matched = true;
        }
    }

    if matched {
        FieldOutcome::Blank
    } else {
        FieldOutcome::Missing
    }
}

/// Runs `table` over `html`, returning the kept records and a page summary.
pub fn extract_with_report<T: Extractable>(table: &CompiledTable, html: &str) -> (Vec<T>, PageReport) {
    let document = Html::parse_document(html);
    let mut report = PageReport::default();
    let mut records = Vec::new();

    if let Some((strategy, nodes)) = table.locate(&document) {
        report.strategy = Some(strategy);
        report.candidates = nodes.len();

        for node in nodes {
            let mut fields = FieldSet::default();

            for field in &table.fields {
                match extract_field(node, field) {
                    FieldOutcome::Found(text) => {
                        fields.0.insert(field.name.clone(), text);
                    }
                    FieldOutcome::Blank => report.blank_fields += 1,
                    FieldOutcome::Missing => {}
                }
            }

            if fields.is_empty() {
                report.dropped += 1;
                continue;
            }

            // Fields the record type doesn't know about are ignored here.
            let record = T::from_fields(fields);
            if record == T::default() {
                report.dropped += 1;
            } else {
                records.push(record);
            }
        }
    }

    report.kept = records.len();

    debug!(
        kind = table.kind,
        strategy = ?report.strategy,
        candidates = report.candidates,
        kept = report.kept,
        dropped = report.dropped,
        blank_fields = report.blank_fields,
        "Extraction finished"
    );

    if records.is_empty() {
        info!("No {} found - no results or the site markup changed", table.kind);
    }

    (records, report)
}

/// Compiled listing and offer tables for one site
#[derive(Debug, Clone)]
pub struct Extractor {
    listings: CompiledTable,
    offers: CompiledTable,
}

impl Extractor {
    pub fn new(selectors: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            listings: selectors.listings.compile("listings")?,
            offers: selectors.offers.compile("offers")?,
        })
    }

    pub fn extract_listings(&self, html: &str) -> Vec<PartListing> {
        extract_with_report(&self.listings, html).0
    }

    pub fn extract_offers(&self, html: &str) -> Vec<Offer> {
        extract_with_report(&self.offers, html).0
    }
}
