//! The demonstrate-then-generalize workflow.
//!
//! ```text
//! PickingElements --confirm_elements--> PickingAction --select_action--> PickingTarget
//!        ^                                    ^                               |
//!        |                                    +----------save_task------------+
//!        +------------- reset / run_bot (from any step) ----------------------+
//! ```
//!
//! [`Session`] owns all scratch state plus the recorded tasks. Collaborators
//! are passed into each call; the session never keeps hold of the document.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RecorderConfig;
use crate::element::{self, Document, Point};
use crate::error::{RecorderError, Result};
use crate::host::{ActionInvoker, Host};
use crate::marker::{Marker, Renderer};
use crate::selection::{SelectionSet, TargetBinding};
use crate::task::{self, Action, ActionKind, RunReport, Task, TaskList};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStep {
    #[default]
    PickingElements,
    PickingAction,
    PickingTarget,
}

impl WorkflowStep {
    /// 1-based position shown to the user.
    pub fn number(self) -> u8 {
        match self {
            WorkflowStep::PickingElements => 1,
            WorkflowStep::PickingAction => 2,
            WorkflowStep::PickingTarget => 3,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStep::PickingElements => "picking list elements",
            WorkflowStep::PickingAction => "picking an action",
            WorkflowStep::PickingTarget => "picking the action target",
        };
        f.write_str(label)
    }
}

/// Raw pointer notifications from the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PointerEvent {
    Move { x: f64, y: f64 },
    Press { x: f64, y: f64 },
    Release { x: f64, y: f64 },
}

impl PointerEvent {
    pub fn point(&self) -> Point {
        match *self {
            PointerEvent::Move { x, y }
            | PointerEvent::Press { x, y }
            | PointerEvent::Release { x, y } => Point::new(x, y),
        }
    }
}

/// Recording session state.
#[derive(Debug, Clone)]
pub struct Session<Id> {
    config: RecorderConfig,
    step: WorkflowStep,
    selection: SelectionSet<Id>,
    binding: TargetBinding<Id>,
    tasks: TaskList<Id>,
    action: ActionKind,
    action_text: String,
    hovered: Option<Id>,
    pressed: bool,
}

impl<Id> Default for Session<Id> {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

impl<Id> Session<Id> {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            step: WorkflowStep::default(),
            selection: SelectionSet::default(),
            binding: TargetBinding::default(),
            tasks: TaskList::default(),
            action: ActionKind::default(),
            action_text: String::new(),
            hovered: None,
            pressed: false,
        }
    }
}

impl<Id: Copy + Eq + Hash + fmt::Debug> Session<Id> {
    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionSet<Id> {
        &self.selection
    }

    pub fn binding(&self) -> &TargetBinding<Id> {
        &self.binding
    }

    pub fn tasks(&self) -> &TaskList<Id> {
        &self.tasks
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn action_text(&self) -> &str {
        &self.action_text
    }

    /// Route one pointer notification.
    ///
    /// Moves drive hover highlighting while picking list elements. A release
    /// that follows a press is the confirm gesture: it selects a list element
    /// or the action target depending on the step. Validation failures are
    /// reported through the host and leave the session unchanged.
    pub fn handle_pointer<D, H>(&mut self, doc: &D, host: &mut H, event: PointerEvent)
    where
        D: Document<Id = Id>,
        H: Host<Id> + ?Sized,
    {
        match event {
            PointerEvent::Move { .. } => {
                let hit = element::resolve_point(doc, host, event.point());
                self.hover(doc, host, hit);
            }
            PointerEvent::Press { .. } => self.pressed = true,
            PointerEvent::Release { .. } => {
                if !std::mem::take(&mut self.pressed) {
                    return;
                }
                let Some(id) = element::resolve_point(doc, host, event.point()) else {
                    return;
                };
                let result = match self.step {
                    WorkflowStep::PickingElements => {
                        self.toggle_element(doc, host, id);
                        Ok(())
                    }
                    WorkflowStep::PickingTarget => self.select_target_element(doc, host, id),
                    WorkflowStep::PickingAction => Ok(()),
                };
                if let Err(e) = result {
                    warn!(error = %e, "pointer confirm rejected");
                    host.notify(&e.to_string());
                }
            }
        }
    }

    /// Move the hover highlight to `hit`. Only active while picking elements.
    pub fn hover<D, R>(&mut self, doc: &D, renderer: &mut R, hit: Option<Id>)
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        if self.step != WorkflowStep::PickingElements {
            return;
        }
        let hit = hit.filter(|id| !doc.is_structural_anchor(*id));
        if hit == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            renderer.remove_markers(previous, &[Marker::Highlighted]);
        }
        if let Some(id) = hit {
            renderer.apply_markers(id, &[Marker::Highlighted]);
            self.hovered = Some(id);
        }
    }

    /// Add a list element. Anchors and repeated picks are no-ops.
    pub fn select_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id) -> Result<()>
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingElements], "select list elements")?;
        if self.selection.select_element(doc, renderer, id) {
            debug!(
                ?id,
                selected = self.selection.selected().len(),
                suggested = self.selection.suggested().len(),
                "element selected"
            );
        }
        Ok(())
    }

    pub fn deselect_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id) -> Result<()>
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingElements], "deselect list elements")?;
        self.selection.deselect_element(doc, renderer, id);
        Ok(())
    }

    fn toggle_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id)
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        if self.selection.is_selected(id) {
            self.selection.deselect_element(doc, renderer, id);
        } else {
            self.selection.select_element(doc, renderer, id);
        }
        // keep the hover marker on the element under the pointer
        if self.hovered == Some(id) {
            renderer.apply_markers(id, &[Marker::Highlighted]);
        }
    }

    /// Accept all current suggestions as list elements.
    pub fn move_suggestions_into_selection<R>(&mut self, renderer: &mut R) -> Result<()>
    where
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingElements], "accept suggestions")?;
        self.selection.move_suggestions_into_selection(renderer);
        Ok(())
    }

    /// Finish picking list elements and move on to the action choice.
    pub fn confirm_elements<R>(&mut self, renderer: &mut R) -> Result<()>
    where
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingElements], "confirm the list elements")?;
        if self.selection.selected().is_empty() {
            return Err(RecorderError::NothingSelected);
        }
        if let Some(hovered) = self.hovered.take() {
            renderer.remove_markers(hovered, &[Marker::Highlighted]);
        }
        self.step = WorkflowStep::PickingAction;
        Ok(())
    }

    /// Record the action kind and start picking its target.
    pub fn select_action<R>(&mut self, renderer: &mut R, kind: ActionKind) -> Result<()>
    where
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(
            &[WorkflowStep::PickingAction, WorkflowStep::PickingTarget],
            "choose an action",
        )?;
        self.action = kind;
        self.selection.arm_for_targeting(renderer);
        self.step = WorkflowStep::PickingTarget;
        Ok(())
    }

    /// Text assigned by a `SetText` task.
    pub fn set_action_text(&mut self, text: impl Into<String>) {
        self.action_text = text.into();
    }

    /// Pick the element the action runs on and infer its counterpart in
    /// every other list element.
    pub fn select_target_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id) -> Result<()>
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingTarget], "pick an action target")?;
        if self.selection.is_selected(id) {
            return Err(RecorderError::TargetIsExemplar);
        }
        let weights = self.config.weights;
        self.binding
            .bind(doc, renderer, id, self.selection.selected(), &weights);
        Ok(())
    }

    /// Store the current action as a task and go back to action picking,
    /// keeping the list elements.
    pub fn save_task<D, R>(&mut self, doc: &D, renderer: &mut R) -> Result<&Task<Id>>
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        self.expect_step(&[WorkflowStep::PickingTarget], "save a task")?;
        let Some(target) = self.binding.target() else {
            return Err(RecorderError::NoTarget);
        };

        let action = match self.action {
            ActionKind::Click => Action::Click,
            ActionKind::SetText => Action::SetText {
                text: std::mem::take(&mut self.action_text),
            },
        };
        let selector = task::selector_for(doc, target);
        let task = Task::new(action, self.binding.all_targets(), selector)
            .ok_or(RecorderError::NoTarget)?;
        info!(
            action = %task.action(),
            selector = task.selector(),
            targets = task.targets().len(),
            "task saved"
        );

        self.tasks.push(task);
        self.binding.clear(renderer);
        self.action_text.clear();
        self.step = WorkflowStep::PickingAction;
        let saved = self.tasks.tasks().last().ok_or(RecorderError::NoTarget)?;
        Ok(saved)
    }

    /// Abandon the task being built. Saved tasks are kept.
    pub fn reset<R>(&mut self, renderer: &mut R)
    where
        R: Renderer<Id> + ?Sized,
    {
        self.binding.clear(renderer);
        self.selection.clear(renderer);
        if let Some(hovered) = self.hovered.take() {
            renderer.remove_markers(hovered, &[Marker::Highlighted]);
        }
        self.action = ActionKind::default();
        self.action_text.clear();
        self.pressed = false;
        self.step = WorkflowStep::PickingElements;
    }

    /// Replay every saved task, then start over with an empty task list.
    ///
    /// The replay holds the session mutably, so no pointer event can be
    /// handled until it returns. Hosts that deliver input asynchronously
    /// must mute it themselves for the duration.
    pub fn run_bot<D, H>(&mut self, doc: &D, host: &mut H) -> RunReport
    where
        D: Document<Id = Id>,
        H: Renderer<Id> + ActionInvoker<Id> + ?Sized,
    {
        let report = self.tasks.execute(doc, host);

        info!(
            tasks = report.tasks,
            executed = report.executed,
            skipped = report.skipped,
            "bot run finished"
        );
        self.tasks.clear();
        self.reset(host);
        report
    }

    fn expect_step(&self, allowed: &[WorkflowStep], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(RecorderError::OutOfOrder {
                operation,
                step: self.step,
            })
        }
    }
}
