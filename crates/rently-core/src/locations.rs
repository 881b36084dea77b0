//! Static district → cities lookup.
//!
//! The backend ships a JSON document mapping each district name to an
//! ordered list of city names; it drives the dependent selection fields
//! of the search and add-listing views. Pure read, no mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::{ApiClient, ApiError};

/// Relative path of the static JSON document on the serving origin.
pub const LOCATIONS_RESOURCE: &str = "/telangana_districts_cities.json";

/// District name → ordered list of city names. Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LocationIndex {
    map: BTreeMap<String, Vec<String>>,
}

impl LocationIndex {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse location data")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read location data from {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Fetches the document from the serving origin.
    pub async fn fetch(api: &ApiClient) -> Result<Self, ApiError> {
        api.get_json(LOCATIONS_RESOURCE, &[]).await
    }

    pub fn districts(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// The city list mapped to a district, in document order.
    pub fn cities(&self, district: &str) -> Option<&[String]> {
        self.map.get(district).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Dependent district/city selection.
///
/// Choosing a district replaces the available city list and clears any
/// previously chosen city; a city can only be chosen from that list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSelection {
    district: Option<String>,
    city: Option<String>,
}

impl LocationSelection {
    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Selects a district and returns its city list (empty for an unknown
    /// district). Any previously selected city is cleared.
    pub fn select_district<'a>(
        &mut self,
        index: &'a LocationIndex,
        district: &str,
    ) -> &'a [String] {
        self.city = None;
        match index.cities(district) {
            Some(cities) => {
                self.district = Some(district.to_string());
                cities
            }
            None => {
                self.district = None;
                &[]
            }
        }
    }

    /// Selects a city within the current district. Returns false (and
    /// leaves the selection unchanged) when no district is selected or the
    /// city is not in its list.
    pub fn select_city(&mut self, index: &LocationIndex, city: &str) -> bool {
        let Some(district) = self.district.as_deref() else {
            return false;
        };
        let known = index
            .cities(district)
            .is_some_and(|cities| cities.iter().any(|c| c == city));
        if known {
            self.city = Some(city.to_string());
        }
        known
    }

    pub fn clear(&mut self) {
        self.district = None;
        self.city = None;
    }
}
