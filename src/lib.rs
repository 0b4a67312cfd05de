//! Record-once, replay-everywhere browser automation.
//!
//! The user points at a few elements of a repeating list, the recorder
//! suggests the rest of the list, the user picks an action and the element
//! inside one list item it applies to, and the recorder finds the matching
//! element inside every other item. The result is a [`Task`] that can be
//! replayed over the whole list.
//!
//! The crate is organized into:
//!
//! - [`element`] - document view ([`Document`]) and the in-memory [`DomTree`]
//! - [`matcher`] - sibling suggestions and cross-item target matching
//! - [`selection`] - selected/suggested elements and the target binding
//! - [`workflow`] - the step state machine driving a recording [`Session`]
//! - [`task`] - recorded tasks and their replay
//! - [`marker`], [`host`] - collaborators supplied by the interactive surface
//! - [`testing`] - recording test doubles

pub mod config;
pub mod element;
pub mod error;
pub mod host;
pub mod marker;
pub mod matcher;
pub mod selection;
pub mod task;
pub mod testing;
pub mod workflow;

pub use config::{RecorderConfig, ScoringWeights};
pub use element::{Document, DomTree, NodeId, Point};
pub use error::{ActionError, RecorderError, Result};
pub use host::{ActionInvoker, Host, InputCapture, Notifier};
pub use marker::{Marker, Renderer};
pub use task::{Action, ActionKind, RunReport, Task, TaskList};
pub use workflow::{PointerEvent, Session, WorkflowStep};
