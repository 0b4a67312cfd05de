//! End-to-end recording scenarios against an in-memory page.

use pretty_assertions::assert_eq;
use rpa_recorder::element::NodeSpec;
use rpa_recorder::testing::{Invocation, RecordingHost};
use rpa_recorder::{
    Action, ActionKind, Document, DomTree, Marker, NodeId, Point, PointerEvent, RecorderConfig,
    RecorderError, ScoringWeights, Session, WorkflowStep, matcher,
};

fn click(session: &mut Session<NodeId>, tree: &DomTree, host: &mut RecordingHost, at: Point) {
    session.handle_pointer(tree, host, PointerEvent::Press { x: at.x, y: at.y });
    session.handle_pointer(tree, host, PointerEvent::Release { x: at.x, y: at.y });
}

/// `<ul>` with four `li.a.row` items.
fn rows() -> (DomTree, NodeId, Vec<NodeId>) {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let ul = tree.append(body, "ul", &[], "");
    let items = ["X", "Y", "Z", "W"]
        .iter()
        .map(|t| tree.append(ul, "li", &["a", "row"], t))
        .collect();
    (tree, ul, items)
}

#[test]
fn test_suggestions_for_two_exemplars() {
    let (tree, ul, items) = rows();
    let got = matcher::suggestions_for(&tree, &[items[0], items[1]]);
    assert_eq!(got, vec![items[2], items[3]]);

    let expected: Vec<_> = tree
        .children_matching_tag(ul, "li")
        .into_iter()
        .filter(|c| *c != items[0] && *c != items[1])
        .collect();
    assert_eq!(got, expected);
}

#[test]
fn test_structurally_different_item_matched_by_class_and_text() {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let first = tree.append(body, "li", &[], "");
    let reference = tree.append(first, "button", &["buy"], "Buy");
    let second = tree.append(body, "li", &[], "");
    let wrapper = tree.append(second, "div", &["promo"], "");
    let candidate = tree.append(wrapper, "button", &["buy", "sale"], "Buy");

    let weights = ScoringWeights::default();
    assert_eq!(matcher::similarity_score(&tree, candidate, reference, &weights), 17);
    assert_eq!(matcher::find_analogue(&tree, second, reference, &weights), Some(candidate));
}

#[test]
fn test_unrelated_button_is_not_matched() {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let ul = tree.append(body, "ul", &[], "");
    let first = tree.append(ul, "li", &[], "");
    let reference = tree.append(first, "button", &["buy"], "Buy");
    let second = tree.append(ul, "li", &[], "");
    let wrapper = tree.append(second, "div", &[], "");
    tree.append(wrapper, "button", &["cancel"], "Cancel");

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, first).unwrap();
    session.select_element(&tree, &mut host, second).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();
    session.select_target_element(&tree, &mut host, reference).unwrap();

    assert_eq!(session.binding().target(), Some(reference));
    assert!(session.binding().loop_targets().is_empty());
    let task = session.save_task(&tree, &mut host).unwrap();
    assert_eq!(task.targets(), &[reference]);
}

#[test]
fn test_exemplar_cannot_be_target() {
    let (tree, _, items) = rows();
    let mut session = Session::default();
    let mut host = RecordingHost::new().with_point(Point::new(10.0, 40.0), items[1]);
    session.select_element(&tree, &mut host, items[0]).unwrap();
    session.select_element(&tree, &mut host, items[1]).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();

    assert_eq!(
        session.select_target_element(&tree, &mut host, items[0]),
        Err(RecorderError::TargetIsExemplar)
    );
    click(&mut session, &tree, &mut host, Point::new(10.0, 40.0));
    assert_eq!(session.binding().target(), None);
    assert_eq!(host.notices().len(), 1);
    assert_eq!(session.step(), WorkflowStep::PickingTarget);
}

#[test]
fn test_exemplar_pick_keeps_bound_target() {
    let (mut tree, _, items) = rows();
    let links: Vec<_> = items
        .iter()
        .map(|i| tree.append(*i, "a", &["more"], "more"))
        .collect();

    let mut session = Session::default();
    let mut host = RecordingHost::new().with_point(Point::new(2.0, 2.0), items[2]);
    session.select_element(&tree, &mut host, items[0]).unwrap();
    session.select_element(&tree, &mut host, items[1]).unwrap();
    session.select_element(&tree, &mut host, items[2]).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();
    session.select_target_element(&tree, &mut host, links[1]).unwrap();
    assert_eq!(session.binding().loop_targets(), &[links[0], links[2]]);

    assert_eq!(
        session.select_target_element(&tree, &mut host, items[0]),
        Err(RecorderError::TargetIsExemplar)
    );
    click(&mut session, &tree, &mut host, Point::new(2.0, 2.0));

    assert_eq!(session.binding().target(), Some(links[1]));
    assert_eq!(session.binding().loop_targets(), &[links[0], links[2]]);
    assert!(host.has_marker(links[1], Marker::ActionTarget));
    assert!(host.has_marker(links[2], Marker::LoopTarget));
    assert!(!host.has_marker(items[2], Marker::ActionTarget));
    assert_eq!(host.notices().len(), 1);
}

#[test]
fn test_run_set_text_on_two_inputs() {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let form = tree.append(body, "form", &[], "");
    let mut inputs = Vec::new();
    let mut rows = Vec::new();
    for label in ["first", "second"] {
        let row = tree.append(form, "div", &["field"], "");
        tree.append(row, "label", &[], label);
        inputs.push(tree.append(row, "input", &["text-input"], ""));
        rows.push(row);
    }

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, rows[0]).unwrap();
    session.select_element(&tree, &mut host, rows[1]).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::SetText).unwrap();
    session.set_action_text("hello");
    session.select_target_element(&tree, &mut host, inputs[0]).unwrap();
    assert_eq!(session.binding().loop_targets(), &[inputs[1]]);
    session.save_task(&tree, &mut host).unwrap();

    let report = session.run_bot(&tree, &mut host);
    assert_eq!(report.executed, 2);
    assert_eq!(host.value_of(inputs[0]), Some("hello"));
    assert_eq!(host.value_of(inputs[1]), Some("hello"));
    assert_eq!(
        host.invocations(),
        &[
            Invocation::SetValue(inputs[0], "hello".to_string()),
            Invocation::InputChanged(inputs[0]),
            Invocation::SetValue(inputs[1], "hello".to_string()),
            Invocation::InputChanged(inputs[1]),
        ]
    );
    assert!(session.tasks().is_empty());
    assert_eq!(session.step(), WorkflowStep::PickingElements);
    assert_eq!(session.selection().total_elements(), 0);
}

#[test]
fn test_two_tasks_on_one_group_replay_in_order() {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let table = tree.append(body, "tbody", &[], "");
    let mut rows = Vec::new();
    let mut checks = Vec::new();
    let mut saves = Vec::new();
    for name in ["alpha", "beta", "gamma"] {
        let tr = tree.append(table, "tr", &[], "");
        let name_cell = tree.append(tr, "td", &["name"], "");
        tree.append(name_cell, "span", &[], name);
        let check_cell = tree.append(tr, "td", &["check"], "");
        checks.push(tree.append(check_cell, "input", &["toggle"], ""));
        let action_cell = tree.append(tr, "td", &["actions"], "");
        saves.push(tree.append(action_cell, "button", &["btn", "save"], "Save"));
        rows.push(tr);
    }

    let mut session = Session::default();
    let mut host = RecordingHost::new()
        .with_point(Point::new(1.0, 1.0), rows[0])
        .with_point(Point::new(1.0, 2.0), rows[2])
        .with_point(Point::new(5.0, 1.0), checks[0])
        .with_point(Point::new(9.0, 1.0), saves[0]);

    click(&mut session, &tree, &mut host, Point::new(1.0, 1.0));
    click(&mut session, &tree, &mut host, Point::new(1.0, 2.0));
    assert_eq!(session.selection().suggested(), &[rows[1]]);
    session.move_suggestions_into_selection(&mut host).unwrap();
    session.confirm_elements(&mut host).unwrap();

    session.select_action(&mut host, ActionKind::Click).unwrap();
    click(&mut session, &tree, &mut host, Point::new(5.0, 1.0));
    session.save_task(&tree, &mut host).unwrap();
    assert_eq!(session.step(), WorkflowStep::PickingAction);

    session.select_action(&mut host, ActionKind::Click).unwrap();
    click(&mut session, &tree, &mut host, Point::new(9.0, 1.0));
    let task = session.save_task(&tree, &mut host).unwrap();
    assert_eq!(task.selector(), "button.btn.save");
    assert_eq!(session.tasks().len(), 2);

    // selection order is rows 0, 2, 1
    session.run_bot(&tree, &mut host);
    assert_eq!(
        host.invocations(),
        &[
            Invocation::Activate(checks[0]),
            Invocation::Activate(checks[2]),
            Invocation::Activate(checks[1]),
            Invocation::Activate(saves[0]),
            Invocation::Activate(saves[2]),
            Invocation::Activate(saves[1]),
        ]
    );
}

#[test]
fn test_removed_target_is_skipped_at_replay() {
    let (mut tree, _, items) = rows();
    let mut links = Vec::new();
    for item in &items {
        links.push(tree.append(*item, "a", &["more"], "more"));
    }

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, items[0]).unwrap();
    session.select_element(&tree, &mut host, items[1]).unwrap();
    session.move_suggestions_into_selection(&mut host).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();
    session.select_target_element(&tree, &mut host, links[0]).unwrap();
    session.save_task(&tree, &mut host).unwrap();

    tree.remove(items[2]);
    let report = session.run_bot(&tree, &mut host);
    assert_eq!(report.executed, 3);
    assert_eq!(report.skipped, 1);
    assert!(!host.invocations().contains(&Invocation::Activate(links[2])));
}

#[test]
fn test_root_elements_are_never_selected() {
    let (mut tree, _, items) = rows();
    let body = tree.body().unwrap();
    let mount = tree.append(body, "div", &["recorder"], "");
    tree.set_mount_point(mount);
    let root = tree.root().unwrap();

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, items[0]).unwrap();
    for anchor in [root, body, mount, root] {
        session.select_element(&tree, &mut host, anchor).unwrap();
        assert_eq!(session.selection().selected(), &[items[0]]);
    }
}

#[test]
fn test_pointer_ignored_on_recorder_surface() {
    let (mut tree, _, items) = rows();
    let body = tree.body().unwrap();
    let mount = tree.append(body, "div", &[], "");
    let badge = tree.append(mount, "span", &[], "Step 1");
    tree.set_mount_point(mount);

    let mut session = Session::default();
    let mut host = RecordingHost::new()
        .with_point(Point::new(0.0, 0.0), badge)
        .with_point(Point::new(3.0, 3.0), items[3]);
    click(&mut session, &tree, &mut host, Point::new(0.0, 0.0));
    assert!(session.selection().selected().is_empty());

    session.handle_pointer(&tree, &mut host, PointerEvent::Move { x: 3.0, y: 3.0 });
    assert!(host.has_marker(items[3], Marker::Highlighted));
    session.handle_pointer(&tree, &mut host, PointerEvent::Move { x: 0.0, y: 0.0 });
    assert!(!host.has_marker(items[3], Marker::Highlighted));
}

#[test]
fn test_config_threshold_changes_matching() {
    let mut tree = DomTree::new();
    let body = tree.body().unwrap();
    let ul = tree.append(body, "ul", &[], "");
    let a = tree.append(ul, "li", &[], "");
    let b = tree.append(ul, "li", &[], "");
    let target = tree.append(a, "span", &["price"], "1.00");
    let other = tree.append(b, "span", &["price"], "2.50");

    let strict = RecorderConfig {
        weights: ScoringWeights {
            threshold: 15,
            ..ScoringWeights::default()
        },
    };
    for (config, expected) in [(RecorderConfig::default(), vec![other]), (strict, vec![])] {
        let mut session = Session::new(config);
        let mut host = RecordingHost::new();
        session.select_element(&tree, &mut host, a).unwrap();
        session.select_element(&tree, &mut host, b).unwrap();
        session.confirm_elements(&mut host).unwrap();
        session.select_action(&mut host, ActionKind::Click).unwrap();
        session.select_target_element(&tree, &mut host, target).unwrap();
        assert_eq!(session.binding().loop_targets(), expected.as_slice());
    }
}

#[test]
fn test_click_task_activates_once_per_target() {
    let (mut tree, _, items) = rows();
    let buttons: Vec<_> = items
        .iter()
        .map(|i| tree.append(*i, "button", &["go"], "Go"))
        .collect();

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, items[1]).unwrap();
    session.select_element(&tree, &mut host, items[3]).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();
    session.select_target_element(&tree, &mut host, buttons[3]).unwrap();
    let task = session.save_task(&tree, &mut host).unwrap();
    assert_eq!(task.action(), &Action::Click);

    session.run_bot(&tree, &mut host);
    assert_eq!(
        host.invocations(),
        &[Invocation::Activate(buttons[3]), Invocation::Activate(buttons[1])]
    );
}

fn node(id: usize, parent: Option<usize>, tag: &str, classes: &[&str], text: &str) -> NodeSpec {
    NodeSpec {
        id: NodeId(id),
        parent: parent.map(NodeId),
        tag: tag.to_string(),
        classes: classes.iter().map(|c| c.to_string()).collect(),
        text: text.to_string(),
    }
}

#[test]
fn test_tasks_from_previous_page_are_skipped() {
    let (mut tree, _, items) = rows();
    let links: Vec<_> = items
        .iter()
        .map(|i| tree.append(*i, "a", &["more"], "more"))
        .collect();

    let mut session = Session::default();
    let mut host = RecordingHost::new();
    session.select_element(&tree, &mut host, items[0]).unwrap();
    session.select_element(&tree, &mut host, items[1]).unwrap();
    session.confirm_elements(&mut host).unwrap();
    session.select_action(&mut host, ActionKind::Click).unwrap();
    session.select_target_element(&tree, &mut host, links[0]).unwrap();
    session.save_task(&tree, &mut host).unwrap();

    // same markup after a navigation, numbered past the old page
    let base = tree.id_bound();
    let mut specs = vec![
        node(base, None, "html", &[], ""),
        node(base + 1, Some(base), "body", &[], ""),
        node(base + 2, Some(base + 1), "ul", &[], ""),
    ];
    for (n, text) in ["X", "Y", "Z", "W"].iter().enumerate() {
        let li = base + 3 + n * 2;
        specs.push(node(li, Some(base + 2), "li", &["a", "row"], text));
        specs.push(node(li + 1, Some(li), "a", &["more"], "more"));
    }
    let next_page = DomTree::from_specs(specs);
    assert_eq!(next_page.len(), 11);

    session.reset(&mut host);
    assert_eq!(session.tasks().len(), 1);
    let report = session.run_bot(&next_page, &mut host);
    assert_eq!(report.executed, 0);
    assert_eq!(report.skipped, 2);
    assert!(host.invocations().is_empty());
}
