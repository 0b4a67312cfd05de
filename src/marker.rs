//! Presentation markers.
//!
//! The engine decides which semantic marker belongs on which element; how a
//! marker looks is entirely up to the [`Renderer`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    Selected,
    Suggested,
    /// Element under the pointer while picking list elements.
    Highlighted,
    ActionTarget,
    LoopTarget,
    /// The page must not react to clicks on this element while recording.
    NotClickable,
}

impl Marker {
    pub const ALL: [Marker; 6] = [
        Marker::Selected,
        Marker::Suggested,
        Marker::Highlighted,
        Marker::ActionTarget,
        Marker::LoopTarget,
        Marker::NotClickable,
    ];
}

pub const SELECTED: &[Marker] = &[Marker::Selected, Marker::NotClickable];
pub const SUGGESTED: &[Marker] = &[Marker::Suggested];

/// Applies and removes presentation markers on document elements.
pub trait Renderer<Id> {
    fn apply_markers(&mut self, element: Id, markers: &[Marker]);
    fn remove_markers(&mut self, element: Id, markers: &[Marker]);
}
