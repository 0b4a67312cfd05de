//! Recorded tasks and their replay.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::element::Document;
use crate::host::ActionInvoker;

/// Action chosen before the target is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[default]
    Click,
    SetText,
}

/// What a task does to each of its targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Action {
    Click,
    SetText { text: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Click => ActionKind::Click,
            Action::SetText { .. } => ActionKind::SetText,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click => write!(f, "click"),
            Action::SetText { text } => write!(f, "set text {:?}", text),
        }
    }
}

/// A generalized action: the picked target followed by its loop targets.
///
/// Immutable once built; `targets` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task<Id> {
    action: Action,
    targets: Vec<Id>,
    selector: String,
}

impl<Id: Copy + Eq> Task<Id> {
    /// Returns `None` when there is nothing to act on.
    pub fn new(action: Action, targets: Vec<Id>, selector: String) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }
        Some(Self {
            action,
            targets,
            selector,
        })
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn targets(&self) -> &[Id] {
        &self.targets
    }

    /// CSS-like description of the picked target, e.g. `button.buy.sale`.
    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/// `tag.class1.class2` for `id`.
pub fn selector_for<D: Document>(doc: &D, id: D::Id) -> String {
    let mut selector = doc.tag(id).unwrap_or("*").to_string();
    for class in doc.classes(id) {
        selector.push('.');
        selector.push_str(class);
    }
    selector
}

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub tasks: usize,
    pub executed: usize,
    pub skipped: usize,
}

/// Tasks recorded since the last run, in recording order.
#[derive(Debug, Clone)]
pub struct TaskList<Id> {
    tasks: Vec<Task<Id>>,
}

impl<Id> Default for TaskList<Id> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<Id: Copy + Eq + fmt::Debug> TaskList<Id> {
    pub fn push(&mut self, task: Task<Id>) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[Task<Id>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Replay every task, task order first and target order second.
    ///
    /// Targets that left the document or fail to act are skipped; nothing is
    /// rolled back or retried.
    pub fn execute<D, I>(&self, doc: &D, invoker: &mut I) -> RunReport
    where
        D: Document<Id = Id>,
        I: ActionInvoker<Id> + ?Sized,
    {
        let mut report = RunReport {
            tasks: self.tasks.len(),
            ..RunReport::default()
        };

        for (index, task) in self.tasks.iter().enumerate() {
            info!(task = index + 1, action = %task.action, selector = task.selector(), targets = task.targets.len(), "running task");
            for target in &task.targets {
                if !doc.contains(*target) {
                    warn!(task = index + 1, ?target, "target no longer in the document, skipping");
                    report.skipped += 1;
                    continue;
                }
                match run_action(invoker, &task.action, *target) {
                    Ok(()) => report.executed += 1,
                    Err(e) => {
                        warn!(task = index + 1, ?target, error = %e, "action failed, skipping");
                        report.skipped += 1;
                    }
                }
            }
        }
        report
    }
}

fn run_action<Id: Copy, I: ActionInvoker<Id> + ?Sized>(
    invoker: &mut I,
    action: &Action,
    target: Id,
) -> Result<(), crate::error::ActionError> {
    match action {
        Action::Click => invoker.activate(target),
        Action::SetText { text } => {
            invoker.set_value(target, text)?;
            invoker.notify_input_changed(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DomTree, NodeId};
    use crate::testing::{Invocation, RecordingHost};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_task_requires_targets() {
        assert!(Task::<NodeId>::new(Action::Click, vec![], "a".into()).is_none());
        let task = Task::new(Action::Click, vec![NodeId(3)], "a".into()).unwrap();
        assert_eq!(task.targets(), &[NodeId(3)]);
    }

    #[test]
    fn test_selector_for() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();
        let button = tree.append(body, "BUTTON", &["buy", "sale"], "Buy");
        let bare = tree.append(body, "span", &[], "");
        assert_eq!(selector_for(&tree, button), "button.buy.sale");
        assert_eq!(selector_for(&tree, bare), "span");
    }

    #[test]
    fn test_execute_in_task_then_target_order() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();
        let a = tree.append(body, "button", &[], "");
        let b = tree.append(body, "button", &[], "");
        let input = tree.append(body, "input", &[], "");

        let mut list = TaskList::default();
        list.push(Task::new(Action::Click, vec![a, b], "button".into()).unwrap());
        list.push(
            Task::new(Action::SetText { text: "hi".into() }, vec![input], "input".into()).unwrap(),
        );

        let mut host = RecordingHost::new();
        let report = list.execute(&tree, &mut host);
        assert_eq!(
            host.invocations(),
            &[
                Invocation::Activate(a),
                Invocation::Activate(b),
                Invocation::SetValue(input, "hi".to_string()),
                Invocation::InputChanged(input),
            ]
        );
        assert_eq!(report, RunReport { tasks: 2, executed: 3, skipped: 0 });
    }

    #[test]
    fn test_execute_skips_missing_and_failing_targets() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();
        let a = tree.append(body, "button", &[], "");
        let gone = tree.append(body, "button", &[], "");
        let broken = tree.append(body, "button", &[], "");
        let c = tree.append(body, "button", &[], "");
        tree.remove(gone);

        let mut list = TaskList::default();
        list.push(Task::new(Action::Click, vec![a, gone, broken, c], "button".into()).unwrap());

        let mut host = RecordingHost::new().with_failing(broken);
        let report = list.execute(&tree, &mut host);
        assert_eq!(host.invocations(), &[Invocation::Activate(a), Invocation::Activate(c)]);
        assert_eq!(report.executed, 2);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Click.to_string(), "click");
        assert_eq!(Action::SetText { text: "x".into() }.to_string(), "set text \"x\"");
        assert_eq!(Action::SetText { text: String::new() }.kind(), ActionKind::SetText);
    }
}
