//! Typed record extraction from a single vehicle detail page.

use crate::error::ExtractError;
use crate::models::ListingRecord;
use crate::scrapers::locator::{find_all_signature, locate_signature};
use crate::scrapers::types::SiteLayout;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::debug;

/// Bold labels in the about section, in page order:
/// year, body type, transmission, fuel type, engine capacity, mileage, plate.
pub const LABEL_COUNT: usize = 7;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digits pattern is valid"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("decimal pattern is valid"));
static MAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)make\s*-\s*(.+?)\s*model").expect("make pattern is valid"));
static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)model\s*-\s*(.+?)\s*manuf").expect("model pattern is valid"));

/// Vehicle attributes read from the seven bold labels
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFields {
    pub year: u64,
    pub body_type: String,
    pub transmission: String,
    pub fuel_type: String,
    pub engine_capacity: f64,
    pub mileage: u64,
    pub plate: String,
}

impl LabelFields {
    /// Assign labels by position.
    ///
    /// Anything other than exactly [`LABEL_COUNT`] labels is rejected outright.
    /// Unparseable numbers become zero.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, ExtractError> {
        let [year, body_type, transmission, fuel_type, engine, mileage, plate] = labels else {
            return Err(ExtractError::FieldCountMismatch {
                expected: LABEL_COUNT,
                found: labels.len(),
            });
        };

        Ok(Self {
            year: parse_year(year.as_ref()),
            body_type: body_type.as_ref().to_string(),
            transmission: transmission.as_ref().to_string(),
            fuel_type: fuel_type.as_ref().to_string(),
            engine_capacity: parse_engine_capacity(engine.as_ref()),
            mileage: joined_digits(mileage.as_ref()),
            plate: plate.as_ref().to_string(),
        })
    }
}

/// Turns a detail page into a [`ListingRecord`] using the fixed site layout
pub struct DetailExtractor<'a> {
    layout: &'a SiteLayout,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(layout: &'a SiteLayout) -> Self {
        Self { layout }
    }

    /// Extract the record for `remote_id` from its detail page.
    ///
    /// A missing pricing section leaves `price` unset and a description
    /// without make/model markers leaves those fields empty. Only a wrong
    /// number of bold labels fails the extraction.
    pub fn extract(&self, document: &Html, remote_id: u64, detail_url: &str) -> Result<ListingRecord, ExtractError> {
        let root = document.root_element();
        let about = locate_signature(root, &self.layout.about_section);

        let labels: Vec<String> = about
            .map(|section| {
                find_all_signature(section, &self.layout.bold_label)
                    .into_iter()
                    .map(element_text)
                    .collect()
            })
            .unwrap_or_default();
        debug!(remote_id, ?labels, "found detail labels");
        let fields = LabelFields::from_labels(labels.as_slice())?;

        let mut record = ListingRecord::new(remote_id, detail_url);
        record.price = self.price(root);
        record.year = fields.year;
        record.body_type = fields.body_type;
        record.transmission = fields.transmission;
        record.fuel_type = fields.fuel_type;
        record.engine_capacity = fields.engine_capacity;
        record.mileage = fields.mileage;
        record.plate = fields.plate;

        if let Some(description) = about.and_then(|section| locate_signature(section, &self.layout.description)) {
            record.description = description_text(description);
            let (make, model) = make_and_model(&record.description);
            if make.is_empty() {
                debug!(remote_id, "make not found in description");
            }
            if model.is_empty() {
                debug!(remote_id, "model not found in description");
            }
            record.make = make;
            record.model = model;
        } else {
            debug!(remote_id, "no description container");
        }

        Ok(record)
    }

    fn price(&self, root: ElementRef<'_>) -> Option<u64> {
        let section = locate_signature(root, &self.layout.pricing_section)?;
        let value = locate_signature(section, &self.layout.price_value).unwrap_or(section);
        Some(joined_digits(&element_text(value)))
    }
}

/// `make` and `model` from the free-text description; empty when a marker is missing
pub fn make_and_model(description: &str) -> (String, String) {
    let capture = |re: &Regex| {
        re.captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    (capture(&MAKE), capture(&MODEL))
}

/// All digit groups concatenated, so "85,000 km" reads as 85000
fn joined_digits(raw: &str) -> u64 {
    let digits: String = DIGITS.find_iter(raw).map(|m| m.as_str()).collect();
    digits.parse().unwrap_or_else(|_| {
        debug!(%raw, "no number found, using 0");
        0
    })
}

fn parse_year(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or_else(|_| {
        debug!(%raw, "year is not numeric, using 0");
        0
    })
}

fn parse_engine_capacity(raw: &str) -> f64 {
    DECIMAL
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_else(|| {
            debug!(%raw, "engine capacity is not numeric, using 0");
            0.0
        })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn description_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
