//! URL handle batches and post-generation validation.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// A product name paired with its generated URL handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleEntry {
    pub product_name: String,
    pub handle: String,
}

impl HandleEntry {
    pub fn new(product_name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            handle: handle.into(),
        }
    }
}

/// Body of a handle generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandleBatchRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub product_names: Vec<String>,
    /// Handles already in use in the store; generated handles must avoid them.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub existing_handles: Vec<String>,
}

/// Treat an explicit `null` list like a missing one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandleBatchResponse {
    pub results: Vec<HandleEntry>,
}

/// Hook run over every generated batch before it is returned.
///
/// Uniqueness is asked of the remote generator in its instructions; a
/// validator is where a local check can be enforced.
pub trait HandleValidator: Send + Sync {
    fn validate(&self, entries: Vec<HandleEntry>, existing: &[String]) -> Vec<HandleEntry>;
}

/// Returns the generator's output unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustGenerator;

impl HandleValidator for TrustGenerator {
    fn validate(&self, entries: Vec<HandleEntry>, _existing: &[String]) -> Vec<HandleEntry> {
        entries
    }
}

/// Appends `-2`, `-3`, ... to any handle already taken by an earlier entry
/// in the batch or by an existing handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisambiguateDuplicates;

impl HandleValidator for DisambiguateDuplicates {
    fn validate(&self, entries: Vec<HandleEntry>, existing: &[String]) -> Vec<HandleEntry> {
        let mut taken: HashSet<String> = existing.iter().cloned().collect();
        entries
            .into_iter()
            .map(|mut entry| {
                if taken.contains(&entry.handle) {
                    let mut n = 2;
                    let unique = loop {
                        let candidate = format!("{}-{n}", entry.handle);
                        if !taken.contains(&candidate) {
                            break candidate;
                        }
                        n += 1;
                    };
                    warn!(
                        product = %entry.product_name,
                        duplicate = %entry.handle,
                        handle = %unique,
                        "disambiguated duplicate handle"
                    );
                    entry.handle = unique;
                }
                taken.insert(entry.handle.clone());
                entry
            })
            .collect()
    }
}
