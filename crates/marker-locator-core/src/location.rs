use std::collections::btree_map::{self, BTreeMap};

use serde::{de, Deserialize, Deserializer, Serialize};

/// Estimated real-world position of one detected marker.
///
/// Distances share the unit of [`crate::CalibrationParameters::marker_size`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub payload: String,
    /// Distance along the optical axis; always `> 0`.
    pub forward_distance: f64,
    /// Signed offset to the right of the optical axis.
    pub lateral_offset: f64,
    /// Signed offset above the optical axis, when the vertical axis is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_offset: Option<f64>,
    /// Horizontal bearing in degrees.
    pub lateral_angle: f64,
}

/// Locations for one image, keyed by payload.
///
/// Duplicate policy: when an image contains the same payload twice, the
/// detection processed last wins. [`LocationSet::insert`] returns the entry
/// it replaced so callers can tell when that happened. Iteration is ordered
/// by payload.
///
/// Serialized as a map from payload to location; deserialization rejects
/// entries whose key differs from the location's payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocationSet {
    entries: BTreeMap<String, Location>,
}

impl LocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a location, replacing (and returning) any previous entry for
    /// the same payload.
    pub fn insert(&mut self, location: Location) -> Option<Location> {
        self.entries.insert(location.payload.clone(), location)
    }

    #[inline]
    pub fn get(&self, payload: &str) -> Option<&Location> {
        self.entries.get(payload)
    }

    #[inline]
    pub fn contains(&self, payload: &str) -> bool {
        self.entries.contains_key(payload)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.entries.values()
    }
}

impl<'de> Deserialize<'de> for LocationSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, Location>::deserialize(deserializer)?;
        if let Some((key, location)) = entries.iter().find(|(key, l)| **key != l.payload) {
            return Err(de::Error::custom(format_args!(
                "location keyed {key:?} has payload {:?}",
                location.payload
            )));
        }
        Ok(Self { entries })
    }
}

impl IntoIterator for LocationSet {
    type Item = Location;
    type IntoIter = btree_map::IntoValues<String, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
