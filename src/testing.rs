//! Test doubles for the host collaborators.
//!
//! [`RecordingHost`] implements every collaborator over [`DomTree`] ids and
//! records what the engine asked it to do.
//!
//! ```rust,ignore
//! let mut host = RecordingHost::new().with_point(Point::new(4.0, 4.0), item);
//! session.handle_pointer(&tree, &mut host, PointerEvent::Press { x: 4.0, y: 4.0 });
//! session.handle_pointer(&tree, &mut host, PointerEvent::Release { x: 4.0, y: 4.0 });
//! assert!(host.has_marker(item, Marker::Selected));
//! ```
//!
//! [`DomTree`]: crate::element::DomTree

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;

use crate::element::{NodeId, Point};
use crate::error::ActionError;
use crate::host::{ActionInvoker, InputCapture, Notifier};
use crate::marker::{Marker, Renderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOp {
    Apply(NodeId, Vec<Marker>),
    Remove(NodeId, Vec<Marker>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Activate(NodeId),
    SetValue(NodeId, String),
    InputChanged(NodeId),
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    points: Vec<(Point, NodeId)>,
    failing: HashSet<NodeId>,
    markers: HashMap<NodeId, HashSet<Marker>>,
    marker_ops: Vec<MarkerOp>,
    invocations: Vec<Invocation>,
    values: HashMap<NodeId, String>,
    notices: Vec<String>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `point` to `id`.
    #[must_use]
    pub fn with_point(mut self, point: Point, id: NodeId) -> Self {
        self.points.push((point, id));
        self
    }

    /// Every action on `id` fails.
    #[must_use]
    pub fn with_failing(mut self, id: NodeId) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn has_marker(&self, id: NodeId, marker: Marker) -> bool {
        self.markers.get(&id).is_some_and(|m| m.contains(&marker))
    }

    pub fn markers_on(&self, id: NodeId) -> HashSet<Marker> {
        self.markers.get(&id).cloned().unwrap_or_default()
    }

    pub fn marker_ops(&self) -> &[MarkerOp] {
        &self.marker_ops
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn value_of(&self, id: NodeId) -> Option<&str> {
        self.values.get(&id).map(String::as_str)
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn check(&self, id: NodeId) -> Result<(), ActionError> {
        if self.failing.contains(&id) {
            return Err(ActionError::Host(anyhow!("element {} refused the action", id)));
        }
        Ok(())
    }
}

impl InputCapture<NodeId> for RecordingHost {
    fn element_at_point(&self, point: Point) -> Option<NodeId> {
        self.points
            .iter()
            .find(|(p, _)| *p == point)
            .map(|(_, id)| *id)
    }
}

impl Renderer<NodeId> for RecordingHost {
    fn apply_markers(&mut self, element: NodeId, markers: &[Marker]) {
        self.markers.entry(element).or_default().extend(markers.iter().copied());
        self.marker_ops.push(MarkerOp::Apply(element, markers.to_vec()));
    }

    fn remove_markers(&mut self, element: NodeId, markers: &[Marker]) {
        if let Some(set) = self.markers.get_mut(&element) {
            for marker in markers {
                set.remove(marker);
            }
            if set.is_empty() {
                self.markers.remove(&element);
            }
        }
        self.marker_ops.push(MarkerOp::Remove(element, markers.to_vec()));
    }
}

impl ActionInvoker<NodeId> for RecordingHost {
    fn activate(&mut self, element: NodeId) -> Result<(), ActionError> {
        self.check(element)?;
        self.invocations.push(Invocation::Activate(element));
        Ok(())
    }

    fn set_value(&mut self, element: NodeId, text: &str) -> Result<(), ActionError> {
        self.check(element)?;
        self.values.insert(element, text.to_string());
        self.invocations.push(Invocation::SetValue(element, text.to_string()));
        Ok(())
    }

    fn notify_input_changed(&mut self, element: NodeId) -> Result<(), ActionError> {
        self.check(element)?;
        self.invocations.push(Invocation::InputChanged(element));
        Ok(())
    }
}

impl Notifier for RecordingHost {
    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
