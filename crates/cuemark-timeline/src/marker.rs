//! The marker store collaborator.
//!
//! Every event instance is mirrored by exactly one named marker on the host
//! timeline. The store only ever talks to markers through [`MarkerStore`],
//! so a host application can plug in its own marker list. [`MarkerTrack`]
//! is the in-memory implementation used by the command-line tool and the
//! tests.
//!
//! Markers are plain `(name, frame)` pairs. Lookups return the first match,
//! and the handle passed to [`MarkerStore::rename`], [`MarkerStore::move_to`]
//! and [`MarkerStore::remove`] is the marker value itself: the first marker
//! equal to it is the one affected.

use serde::{Deserialize, Serialize};

use cuemark_types::Frame;

/// A named position on the host timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    /// Marker label.
    pub name: String,
    /// Marker position.
    pub frame: Frame,
}

impl Marker {
    /// A marker named `name` at `frame`.
    pub fn new(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// Operations the timeline store needs from the host's marker list.
pub trait MarkerStore {
    /// Add a marker.
    fn create(&mut self, name: &str, frame: Frame);

    /// First marker at `frame`.
    fn find_by_frame(&self, frame: Frame) -> Option<&Marker>;

    /// First marker named `name`.
    fn find_by_name(&self, name: &str) -> Option<&Marker>;

    /// Rename `marker`. Returns `false` if it no longer exists.
    fn rename(&mut self, marker: &Marker, new_name: &str) -> bool;

    /// Move `marker` to `frame`. Returns `false` if it no longer exists.
    fn move_to(&mut self, marker: &Marker, frame: Frame) -> bool;

    /// Delete `marker`. Returns `false` if it no longer exists.
    fn remove(&mut self, marker: &Marker) -> bool;

    /// Move and rename in one step.
    fn relocate(&mut self, marker: &Marker, new_name: &str, frame: Frame) -> bool {
        if !self.move_to(marker, frame) {
            return false;
        }
        self.rename(&Marker::new(marker.name.clone(), frame), new_name)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// An ordered, in-memory marker list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerTrack {
    markers: Vec<Marker>,
}

impl MarkerTrack {
    /// An empty track.
    pub const fn new() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    /// Number of markers.
    pub const fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the track has no markers.
    pub const fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// All markers, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    fn position(&self, marker: &Marker) -> Option<usize> {
        self.markers.iter().position(|m| m == marker)
    }
}

impl MarkerStore for MarkerTrack {
    fn create(&mut self, name: &str, frame: Frame) {
        self.markers.push(Marker::new(name, frame));
    }

    fn find_by_frame(&self, frame: Frame) -> Option<&Marker> {
        self.markers.iter().find(|m| m.frame == frame)
    }

    fn find_by_name(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    fn rename(&mut self, marker: &Marker, new_name: &str) -> bool {
        let Some(index) = self.position(marker) else {
            return false;
        };
        self.markers.get_mut(index).is_some_and(|m| {
            new_name.clone_into(&mut m.name);
            true
        })
    }

    fn move_to(&mut self, marker: &Marker, frame: Frame) -> bool {
        let Some(index) = self.position(marker) else {
            return false;
        };
        self.markers.get_mut(index).is_some_and(|m| {
            m.frame = frame;
            true
        })
    }

    fn remove(&mut self, marker: &Marker) -> bool {
        self.position(marker).is_some_and(|index| {
            self.markers.remove(index);
            true
        })
    }
}
