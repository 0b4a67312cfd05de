//! Collaborators the engine talks to but does not implement.

use crate::element::Point;
use crate::error::ActionError;
use crate::marker::Renderer;

/// Turns pointer coordinates into the element beneath them.
pub trait InputCapture<Id> {
    fn element_at_point(&self, point: Point) -> Option<Id>;
}

/// Native activation primitives used during replay.
pub trait ActionInvoker<Id> {
    /// Simulate a user click.
    fn activate(&mut self, element: Id) -> Result<(), ActionError>;
    fn set_value(&mut self, element: Id, text: &str) -> Result<(), ActionError>;
    /// Raise the input-changed notification so page logic sees the new value.
    fn notify_input_changed(&mut self, element: Id) -> Result<(), ActionError>;
}

/// Blocking, user-visible messages.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Everything the interactive surface provides.
pub trait Host<Id>: InputCapture<Id> + Renderer<Id> + ActionInvoker<Id> + Notifier {}

impl<Id, T> Host<Id> for T where T: InputCapture<Id> + Renderer<Id> + ActionInvoker<Id> + Notifier {}
