use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Display names whose catalog spelling cannot be derived by stripping spaces.
const CATALOG_ALIASES: &[(&str, &str)] = &[("SRIKEHATI", "SRI-KEHATI")];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(String);

impl IndexName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Alias of this index, if it is listed in the fixed alias table.
    pub fn alias(&self) -> Option<&'static str> {
        CATALOG_ALIASES
            .iter()
            .find(|(display, _)| *display == self.0)
            .map(|(_, alias)| *alias)
    }

    /// Spelling expected by the catalog's `typeIndex` parameter.
    pub fn catalog_encoding(&self) -> String {
        match self.alias() {
            Some(alias) => alias.to_string(),
            None => self.0.chars().filter(|ch| !ch.is_whitespace()).collect(),
        }
    }

    /// Case-sensitive substring test against an archive member name.
    ///
    /// The alias spelling is accepted as well; nothing else is normalised.
    pub fn matches_file(&self, file_name: &str) -> bool {
        file_name.contains(self.0.as_str())
            || self
                .alias()
                .map(|alias| file_name.contains(alias))
                .unwrap_or(false)
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IndexName {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().any(|ch| ch.is_control()) {
            return Err(SyncError::InvalidIndexName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for IndexName {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndexName> for String {
    fn from(value: IndexName) -> Self {
        value.0
    }
}

/// Indices tracked by default, in the order they are resolved.
pub fn default_indices() -> Vec<IndexName> {
    [
        "IDX30",
        "LQ45",
        "KOMPAS100",
        "IDX BUMN20",
        "IDX HIDIV20",
        "IDX G30",
        "IDX V30",
        "IDX Q30",
        "IDX ESGL",
        "SRIKEHATI",
        "SMINFRA18",
        "JII70",
        "ECONOMIC30",
    ]
    .into_iter()
    .map(|name| IndexName(name.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub attachment_name: String,
    pub attachment_url: String,
}

impl CatalogEntry {
    /// Last path segment of the attachment name, if it can be used as a local file name.
    pub fn file_name(&self) -> Option<&str> {
        let name = self
            .attachment_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(name)
    }
}

/// Indices that no downloaded archive has covered yet.
#[derive(Debug, Clone, Default)]
pub struct RemainingSet {
    items: Vec<IndexName>,
}

impl RemainingSet {
    /// Keeps the first occurrence of each name.
    pub fn new(requested: &[IndexName]) -> Self {
        let mut items: Vec<IndexName> = Vec::with_capacity(requested.len());
        for name in requested {
            if !items.contains(name) {
                items.push(name.clone());
            }
        }
        Self { items }
    }

    pub fn first(&self) -> Option<&IndexName> {
        self.items.first()
    }

    pub fn contains(&self, name: &IndexName) -> bool {
        self.items.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexName> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drop_index(&mut self, name: &IndexName) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != name);
        self.items.len() != before
    }

    /// Removes every covered name, keeping survivors in their original order.
    pub fn remove_all(&mut self, covered: &CoverageResult) {
        self.items.retain(|item| !covered.contains(item));
    }
}

/// Indices satisfied by a single archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageResult(BTreeSet<IndexName>);

impl CoverageResult {
    /// Every remaining index that occurs in at least one member name.
    pub fn from_members<S: AsRef<str>>(remaining: &RemainingSet, members: &[S]) -> Self {
        let covered = remaining
            .iter()
            .filter(|name| {
                members
                    .iter()
                    .any(|member| name.matches_file(member.as_ref()))
            })
            .cloned()
            .collect();
        Self(covered)
    }

    pub fn insert(&mut self, name: IndexName) -> bool {
        self.0.insert(name)
    }

    pub fn contains(&self, name: &IndexName) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<IndexName> {
        self.0.into_iter().collect()
    }
}
