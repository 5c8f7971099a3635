//! Open-schema product rows.
//!
//! A [`ProductRecord`] is one row of a catalogue export. The column set is
//! whatever the input header says; only a handful of well-known keys (see
//! [`fields`]) have meaning to the pipelines, and all of them are optional.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known column names in catalogue exports.
pub mod fields {
    pub const TITLE: &str = "Title";
    pub const VENDOR: &str = "Vendor";
    pub const DESCRIPTION: &str = "description";
    pub const UNITS: &str = "units_01";
    pub const CERTIFICATIONS: &str = "certifications";
    pub const NUTRITIONAL_CLAIMS: &str = "nutritional_claims";
    pub const OCCASION: &str = "occasion";
    pub const MINI_DESCRIPTIONS: [&str; 4] = [
        "description_mini_01",
        "description_mini_02",
        "description_mini_03",
        "description_mini_04",
    ];
    pub const IMAGE_SRC: &str = "Image Src";
    /// Identity key used to correlate input rows with prior output rows.
    pub const SKU: &str = "Variant SKU";

    /// Synthetic output column holding the generated text.
    pub const NEW_DESCRIPTION: &str = "new_description";
    /// Synthetic output column holding the generation status tag.
    pub const GENERATION_STATUS: &str = "generation_status";
}

/// One row of tabular product data, keyed by column name in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord {
    values: IndexMap<String, String>,
}

impl ProductRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record by zipping a header with a row. Missing trailing cells
    /// become empty strings; surplus cells are dropped.
    pub fn from_row<H, V>(header: &[H], row: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let values = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = row.get(i).map(|v| v.as_ref()).unwrap_or_default();
                (name.as_ref().to_string(), value.to_string())
            })
            .collect();
        Self { values }
    }

    /// Raw value of a column, `None` if the column is absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Value of a column, `None` if absent or empty.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|v| !v.is_empty())
    }

    /// Set a column, appending it at the end if it did not exist.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Trimmed `Variant SKU`, empty when the column is missing.
    pub fn identity_key(&self) -> &str {
        self.get(fields::SKU).map(str::trim).unwrap_or_default()
    }

    /// Product title for display, `"Unknown"` when the column is missing.
    pub fn title(&self) -> &str {
        self.get(fields::TITLE).unwrap_or("Unknown")
    }

    /// Trimmed image URL, if any.
    pub fn image_url(&self) -> Option<&str> {
        self.get(fields::IMAGE_SRC)
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Column names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Values laid out in the order of `fieldnames`; unknown columns are empty.
    pub fn values_for<'a>(&'a self, fieldnames: &'a [String]) -> impl Iterator<Item = &'a str> {
        fieldnames
            .iter()
            .map(|name| self.get(name).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ProductRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
