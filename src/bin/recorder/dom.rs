use anyhow::{Context, Result};
use headless_chrome::Tab;
use rpa_recorder::element::NodeSpec;
use rpa_recorder::{DomTree, NodeId, PointerEvent};
use serde::Deserialize;
use std::sync::Arc;

use crate::types::{MARKER_CLASS_PREFIX, MOUNT_ID};

/// JavaScript injected once per page to capture pointer input.
///
/// The script:
///   1. Mounts the recorder badge (`#__MOUNT_ID__`) and the marker stylesheet.
///   2. Listens to mousedown/mouseup/mousemove in the capture phase and queues
///      `{kind, x, y}` records; moves are coalesced to the latest one.
///   3. Swallows page clicks while recording so the page does not react.
///   4. Does nothing at all while `running` is set (the bot's own clicks).
const CAPTURE_JS: &str = r#"
(() => {
  const state = window.__rpaRecorder || (window.__rpaRecorder = {});
  if (state.nextEid === undefined) state.nextEid = __FIRST_EID__;
  if (state.installed) return true;
  state.installed = true;
  state.events = [];
  state.lastMove = null;
  state.running = false;

  const style = document.createElement('style');
  style.textContent = `
    .__PREFIX__highlighted { outline: 2px dashed #f59e0b !important; }
    .__PREFIX__selected { outline: 2px solid #6366f1 !important; background: rgba(99,102,241,0.08) !important; }
    .__PREFIX__suggested { outline: 2px dashed #6366f1 !important; }
    .__PREFIX__action-target { outline: 3px solid #22c55e !important; }
    .__PREFIX__loop-target { outline: 2px dashed #22c55e !important; }
    .__PREFIX__not-clickable * { pointer-events: none !important; }
    #__MOUNT_ID__ {
      position: fixed; right: 16px; bottom: 16px; z-index: 2147483647;
      background: #0a0a0f; color: #e0e0e0; border-left: 3px solid #6366f1;
      border-radius: 8px; padding: 10px 14px; max-width: 320px;
      font: 13px 'Segoe UI', system-ui, sans-serif;
    }
    #__MOUNT_ID__ .notice { color: #fca5a5; margin-top: 6px; }
  `;
  (document.head || document.documentElement).appendChild(style);

  const mount = document.createElement('div');
  mount.id = '__MOUNT_ID__';
  mount.innerHTML = '<div class="step">Step 1: pick list elements</div><div class="notice"></div>';
  document.body.appendChild(mount);

  const inMount = (t) => t instanceof Node && mount.contains(t);
  const flushMove = () => {
    if (state.lastMove) {
      state.events.push(state.lastMove);
      state.lastMove = null;
    }
  };
  const swallow = (e) => {
    e.preventDefault();
    e.stopPropagation();
  };

  document.addEventListener('mousemove', (e) => {
    if (state.running) return;
    state.lastMove = { kind: 'move', x: e.clientX, y: e.clientY };
  }, true);
  document.addEventListener('mousedown', (e) => {
    if (state.running || inMount(e.target)) return;
    flushMove();
    state.events.push({ kind: 'press', x: e.clientX, y: e.clientY });
    swallow(e);
  }, true);
  document.addEventListener('mouseup', (e) => {
    if (state.running || inMount(e.target)) return;
    flushMove();
    state.events.push({ kind: 'release', x: e.clientX, y: e.clientY });
    swallow(e);
  }, true);
  document.addEventListener('click', (e) => {
    if (state.running || inMount(e.target)) return;
    swallow(e);
  }, true);

  state.drain = () => {
    flushMove();
    return JSON.stringify(state.events.splice(0));
  };
  return true;
})()
"#;

/// JavaScript producing a serialized element tree.
/// NON-DESTRUCTIVE apart from the `data-eid` attribute it assigns.
///
/// Ids are stable: an element keeps the `data-eid` it got in an earlier
/// snapshot and new elements get fresh numbers, so ids held by the session
/// stay valid across snapshots. A fresh page starts numbering at
/// `__FIRST_EID__`, past every id handed out on earlier pages. Recorder marker
/// classes are not reported.
const SNAPSHOT_JS: &str = r#"
(() => {
  const state = window.__rpaRecorder || (window.__rpaRecorder = {});
  if (state.nextEid === undefined) state.nextEid = __FIRST_EID__;
  const SKIP = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'LINK', 'META']);
  const seen = new Set();
  const nodes = [];

  function walk(el, parent) {
    if (SKIP.has(el.tagName)) return;
    let eid = el.getAttribute('data-eid');
    let id = eid ? parseInt(eid.slice(1), 10) : NaN;
    if (Number.isNaN(id) || seen.has(id)) {
      id = state.nextEid++;
      el.setAttribute('data-eid', 'e' + id);
    }
    seen.add(id);
    let text = '';
    for (const n of el.childNodes) {
      if (n.nodeType === Node.TEXT_NODE) text += n.nodeValue;
    }
    const classes = [...el.classList].filter((c) => !c.startsWith('__PREFIX__'));
    nodes.push({ id, parent, tag: el.tagName.toLowerCase(), classes, text });
    for (const child of el.children) walk(child, id);
  }

  walk(document.documentElement, null);
  const mount = document.getElementById('__MOUNT_ID__');
  const mountEid = mount ? mount.getAttribute('data-eid') : null;
  return JSON.stringify({ nodes, mount: mountEid ? parseInt(mountEid.slice(1), 10) : null });
})()
"#;

#[derive(Deserialize)]
struct Snapshot {
    nodes: Vec<NodeSpec>,
    mount: Option<usize>,
}

fn script(source: &str, first_eid: usize) -> String {
    source
        .replace("__MOUNT_ID__", MOUNT_ID)
        .replace("__PREFIX__", MARKER_CLASS_PREFIX)
        .replace("__FIRST_EID__", &first_eid.to_string())
}

fn evaluate_string(tab: &Arc<Tab>, source: &str) -> Result<Option<String>> {
    let result = tab.evaluate(source, false)?;
    Ok(result.value.and_then(|v| v.as_str().map(String::from)))
}

/// Install the pointer capture script and badge. Safe to call repeatedly.
///
/// `first_eid` seeds element numbering on a page that has none yet.
pub fn install_capture(tab: &Arc<Tab>, first_eid: usize) -> Result<()> {
    tab.wait_for_element("body")?;
    tab.evaluate(&script(CAPTURE_JS, first_eid), false)?;
    Ok(())
}

/// Whether the capture script is present on the current page.
pub fn capture_installed(tab: &Arc<Tab>) -> bool {
    tab.evaluate("!!(window.__rpaRecorder && window.__rpaRecorder.installed)", false)
        .ok()
        .and_then(|r| r.value)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Serialize the page into a [`DomTree`] whose `NodeId(n)` is `data-eid="en"`.
///
/// `first_eid` is only used when the page has not been numbered yet.
pub fn snapshot_document(tab: &Arc<Tab>, first_eid: usize) -> Result<DomTree> {
    let raw = evaluate_string(tab, &script(SNAPSHOT_JS, first_eid))?
        .context("snapshot script returned nothing")?;
    let snapshot: Snapshot = serde_json::from_str(&raw).context("malformed page snapshot")?;
    let count = snapshot.nodes.len();
    let mut tree = DomTree::from_specs(snapshot.nodes);
    if let Some(mount) = snapshot.mount {
        tree.set_mount_point(NodeId(mount));
    }
    tracing::debug!(elements = count, "page snapshot taken");
    Ok(tree)
}

/// Take the pointer events queued since the last call, in delivery order.
pub fn drain_pointer_events(tab: &Arc<Tab>) -> Result<Vec<PointerEvent>> {
    let raw = evaluate_string(tab, "window.__rpaRecorder.drain()")?
        .context("capture script is not installed")?;
    let events = serde_json::from_str(&raw).context("malformed pointer events")?;
    Ok(events)
}

/// Get the current page URL.
pub fn get_current_url(tab: &Arc<Tab>) -> Result<String> {
    Ok(evaluate_string(tab, "window.location.href")?.unwrap_or_else(|| "unknown".to_string()))
}
