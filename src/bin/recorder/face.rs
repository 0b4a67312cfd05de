use anyhow::{Result, anyhow};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use rpa_recorder::RunReport;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

use crate::types::{SessionView, TaskView, UiCommand};

/// Events streamed to the control panel via SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum PanelEvent {
    State(SessionView),
    Notice { message: String },
    TaskSaved { task: TaskView },
    RunFinished { report: RunReport },
}

impl PanelEvent {
    fn name(&self) -> &'static str {
        match self {
            PanelEvent::State(_) => "state",
            PanelEvent::Notice { .. } => "notice",
            PanelEvent::TaskSaved { .. } => "task_saved",
            PanelEvent::RunFinished { .. } => "run_finished",
        }
    }

    fn to_sse_event(&self) -> Event {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Event::default().event(self.name()).data(data)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cmd_tx: mpsc::Sender<UiCommand>,
    pub event_tx: broadcast::Sender<PanelEvent>,
}

/// Start the control panel on `port`, trying the next nine ports if taken.
pub async fn start_server(
    port: u16,
) -> Result<(mpsc::Receiver<UiCommand>, broadcast::Sender<PanelEvent>)> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<UiCommand>(16);
    let (event_tx, _) = broadcast::channel::<PanelEvent>(64);

    let state = Arc::new(AppState {
        cmd_tx,
        event_tx: event_tx.clone(),
    });

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/command", post(command_handler))
        .route("/events", get(sse_handler))
        .route(
            "/favicon.ico",
            get(|| async { axum::http::StatusCode::NO_CONTENT }),
        )
        .with_state(state);

    let mut bound = None;
    for p in port..port.saturating_add(10) {
        if let Ok(l) = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", p)).await {
            bound = Some((l, p));
            break;
        }
    }
    let (listener, port) = bound.ok_or_else(|| {
        anyhow!(
            "could not bind to any port {}-{}, is another recorder running?",
            port,
            port.saturating_add(9)
        )
    })?;

    info!("control panel running at http://localhost:{}", port);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "control panel server stopped");
        }
    });

    Ok((cmd_rx, event_tx))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<UiCommand>,
) -> &'static str {
    debug!(?command, "panel command");
    let _ = state.cmd_tx.send(command).await;
    "ok"
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();
    let stream =
        BroadcastStream::new(rx).filter_map(|result: Result<PanelEvent, _>| match result {
            Ok(event) => Some(Ok::<_, Infallible>(event.to_sse_event())),
            Err(_) => None,
        });
    Sse::new(stream)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>RPA Recorder</title>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    background: #101014;
    color: #d4d4d8;
    font: 14px/1.5 system-ui, -apple-system, 'Segoe UI', sans-serif;
    min-height: 100vh;
  }
  header {
    position: sticky; top: 0;
    background: #18181b;
    padding: 16px 28px;
    display: flex; gap: 10px; align-items: center;
  }
  header h1 { font-size: 17px; font-weight: 600; color: #fafafa; }
  header .dot { width: 10px; height: 10px; border-radius: 50%; background: #10b981; }
  header .dot.busy { background: #eab308; animation: pulse 1s infinite; }
  @keyframes pulse { 50% { opacity: .35; } }
  .main { max-width: 760px; margin: 0 auto; padding: 20px 28px; display: grid; gap: 14px; }
  .panel { background: #18181b; border: 1px solid #27272a; border-radius: 6px; padding: 14px; display: grid; gap: 10px; }
  .panel.hidden { display: none; }
  .row { display: flex; gap: 8px; align-items: center; flex-wrap: wrap; }
  .stat { color: #a1a1aa; }
  #log { display: grid; gap: 6px; }
  .entry { padding: 8px 12px; border-radius: 6px; }
  .entry.task { background: #18181b; border-left: 3px solid #0ea5e9; font-family: ui-monospace, 'Fira Code', monospace; font-size: 13px; }
  .entry.error { background: #2a1215; border-left: 3px solid #f43f5e; color: #fda4af; }
  .entry.done { background: #0f231a; border-left: 3px solid #10b981; color: #6ee7b7; }
  input[type=text] {
    flex: 1; min-width: 180px; background: #09090b; border: 1px solid #3f3f46; border-radius: 6px;
    padding: 8px 12px; color: #fafafa; font-size: 14px; outline: none;
  }
  button {
    background: #0ea5e9; color: #09090b; border: none; border-radius: 6px;
    padding: 8px 16px; font-weight: 600; cursor: pointer;
  }
  button:hover { background: #38bdf8; }
  button.secondary { background: #3f3f46; color: #fafafa; }
  button:disabled { opacity: .4; cursor: default; }
</style>
</head>
<body>
  <header>
    <div class="dot" id="status-dot"></div>
    <h1 id="title">Step 1: pick list elements</h1>
  </header>
  <main class="main">
    <div class="panel" id="step1">
      <div class="stat">Click elements of a list in the browser. <span id="counts"></span></div>
      <div class="row">
        <button id="accept" class="secondary" onclick="cmd({command:'AcceptSuggestions'})">Accept suggestions</button>
        <button id="confirm" onclick="cmd({command:'ConfirmElements'})">Done selecting</button>
      </div>
    </div>
    <div class="panel hidden" id="step2">
      <div class="stat">What should happen on every list element?</div>
      <div class="row">
        <button onclick="cmd({command:'SelectAction', kind:'Click'})">Click</button>
        <input type="text" id="text" placeholder="Text to type..." />
        <button onclick="setText().then(() => cmd({command:'SelectAction', kind:'SetText'}))">Set text</button>
      </div>
    </div>
    <div class="panel hidden" id="step3">
      <div class="stat">Click the element inside one list item the action should run on. <span id="targets"></span></div>
      <div class="row">
        <button id="save" onclick="setText().then(() => cmd({command:'SaveTask'}))">Save task</button>
      </div>
    </div>
    <div class="row">
      <button id="run" onclick="run()">Run bot</button>
      <button class="secondary" onclick="cmd({command:'Reset'})">Start over</button>
    </div>
    <div id="log"></div>
  </main>
<script>
  const log = document.getElementById('log');
  const dot = document.getElementById('status-dot');
  const esc = (s) => String(s).replace(/</g, '&lt;');

  function addEntry(cls, html) {
    const div = document.createElement('div');
    div.className = 'entry ' + cls;
    div.innerHTML = html;
    log.appendChild(div);
    div.scrollIntoView({block: 'end'});
  }

  async function cmd(body) {
    await fetch('/command', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify(body),
    });
  }

  function run() {
    dot.classList.add('busy');
    return cmd({command: 'Run'});
  }

  function setText() {
    return cmd({command: 'SetText', text: document.getElementById('text').value});
  }

  function describe(action) {
    return action.action === 'Click' ? 'click' : 'set text "' + esc(action.text) + '"';
  }

  const es = new EventSource('/events');

  es.addEventListener('state', e => {
    const s = JSON.parse(e.data);
    document.getElementById('title').textContent = 'Step ' + s.step_number + ': ' +
      ['pick list elements', 'pick an action', 'pick the action target'][s.step_number - 1];
    ['step1', 'step2', 'step3'].forEach((id, i) =>
      document.getElementById(id).classList.toggle('hidden', s.step_number !== i + 1));
    document.getElementById('counts').textContent =
      s.selected + ' selected, ' + s.suggested + ' suggested (' + s.total_elements + ' total)';
    document.getElementById('targets').textContent =
      s.has_target ? '1 target + ' + s.loop_targets + ' matched in other items' : '';
    document.getElementById('accept').disabled = s.suggested === 0;
    document.getElementById('confirm').disabled = s.selected === 0;
    document.getElementById('save').disabled = !s.has_target;
    document.getElementById('run').disabled = s.tasks.length === 0;
  });

  es.addEventListener('notice', e => {
    dot.classList.remove('busy');
    addEntry('error', esc(JSON.parse(e.data).message));
  });

  es.addEventListener('task_saved', e => {
    const t = JSON.parse(e.data).task;
    addEntry('task', describe(t.action) + ' on <b>' + esc(t.selector) + '</b> x' + t.targets);
  });

  es.addEventListener('run_finished', e => {
    dot.classList.remove('busy');
    const r = JSON.parse(e.data).report;
    addEntry('done', 'Ran ' + r.tasks + ' task(s): ' + r.executed + ' actions, ' + r.skipped + ' skipped.');
  });

  addEntry('done', 'Recorder ready. Pick elements of a list in the browser to begin.');
</script>
</body>
</html>
"##;
