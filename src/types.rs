use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const DEFAULT_TYPE: &str = "Startup";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub name: String,
    pub org_type: String,
    pub category: String,
    pub headquarter: String,
    pub website_url: String,
    pub summary: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Organization {
    /// Both coordinates, if the record can be placed on the map.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Empty types count as startups everywhere a bucket is decided.
    pub fn is_startup(&self) -> bool {
        self.org_type.is_empty() || self.org_type == DEFAULT_TYPE
    }

    pub fn display_type(&self) -> &str {
        if self.org_type.is_empty() {
            DEFAULT_TYPE
        } else {
            &self.org_type
        }
    }
}

/// Exact `lat,lng` pairing used to group organizations sitting on the same point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordKey(String);

impl CoordKey {
    pub fn new(lat: f64, lng: f64) -> Self {
        // Adding +0.0 turns -0.0 into 0.0 so both print as "0".
        CoordKey(format!("{},{}", lat + 0.0, lng + 0.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CoordKey {
    fn from(value: &str) -> Self {
        CoordKey(value.trim().to_string())
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeBucket {
    Startup,
    Other,
}

impl std::str::FromStr for TypeBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "startup" => Ok(TypeBucket::Startup),
            "other" => Ok(TypeBucket::Other),
            other => Err(anyhow::anyhow!(
                "Unknown type bucket '{}', expected 'startup' or 'other'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub type_bucket: Option<TypeBucket>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl FilterState {
    pub fn new(type_bucket: Option<TypeBucket>, categories: impl IntoIterator<Item = String>) -> Self {
        FilterState {
            type_bucket,
            categories: categories.into_iter().collect(),
        }
        .normalized()
    }

    /// Categories only exist inside the startup bucket; "other" clears them.
    pub fn normalized(mut self) -> Self {
        if self.type_bucket == Some(TypeBucket::Other) {
            self.categories.clear();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.type_bucket.is_none() && self.categories.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn org(name: &str, org_type: &str, category: &str, coords: Option<(f64, f64)>) -> Organization {
    Organization {
        name: name.to_string(),
        org_type: org_type.to_string(),
        category: category.to_string(),
        headquarter: String::new(),
        website_url: String::new(),
        summary: String::new(),
        latitude: coords.map(|c| c.0),
        longitude: coords.map(|c| c.1),
    }
}
