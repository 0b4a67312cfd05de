use rpa_recorder::{Action, ActionKind, NodeId, Session, Task, WorkflowStep};
use serde::{Deserialize, Serialize};

/// A button press in the control panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum UiCommand {
    ConfirmElements,
    AcceptSuggestions,
    SelectAction { kind: ActionKind },
    SetText { text: String },
    SaveTask,
    Run,
    Reset,
}

/// What the control panel shows about the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub step: WorkflowStep,
    pub step_number: u8,
    pub selected: usize,
    pub suggested: usize,
    pub total_elements: usize,
    pub action: ActionKind,
    pub has_target: bool,
    pub loop_targets: usize,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub action: Action,
    pub selector: String,
    pub targets: usize,
}

impl SessionView {
    pub fn of(session: &Session<NodeId>) -> Self {
        let selection = session.selection();
        let binding = session.binding();
        Self {
            step: session.step(),
            step_number: session.step().number(),
            selected: selection.selected().len(),
            suggested: selection.suggested().len(),
            total_elements: selection.total_elements(),
            action: session.action(),
            has_target: binding.target().is_some(),
            loop_targets: binding.loop_targets().len(),
            tasks: session.tasks().tasks().iter().map(TaskView::of).collect(),
        }
    }
}

impl TaskView {
    pub fn of(task: &Task<NodeId>) -> Self {
        Self {
            action: task.action().clone(),
            selector: task.selector().to_string(),
            targets: task.targets().len(),
        }
    }
}

pub const POLL_INTERVAL_MS: u64 = 50;
pub const MOUNT_ID: &str = "__rpa-recorder";
pub const MARKER_CLASS_PREFIX: &str = "rpa-";
pub const PAGE_CHANGED_NOTICE: &str =
    "The page changed, so the list selection was cleared. Saved tasks skip elements of the previous page.";
