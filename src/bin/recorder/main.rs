mod dom;
mod face;
mod hands;
mod types;

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenvy::dotenv;
use face::PanelEvent;
use hands::ChromeHost;
use rpa_recorder::{DomTree, NodeId, Notifier, PointerEvent, RecorderConfig, Session};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use types::{PAGE_CHANGED_NOTICE, POLL_INTERVAL_MS, SessionView, TaskView, UiCommand};

/// Point at a few items of a list, show the recorder what to do with one of
/// them, and replay it on all of them.
#[derive(Parser, Debug)]
#[command(name = "recorder", version)]
struct Args {
    /// Page to open before recording starts.
    #[arg(long, env = "RPA_START_URL")]
    url: Option<String>,

    /// Port of the control panel (the next nine are tried if taken).
    #[arg(long, env = "RPA_UI_PORT", default_value_t = 3000)]
    ui_port: u16,

    /// Remote debugging port of a Chrome to attach to.
    #[arg(long, env = "RPA_CHROME_PORT", default_value_t = 9222)]
    chrome_port: u16,

    /// Launch Chrome headless when no running instance is found.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = RecorderConfig::from_env()?;
    info!(weights = ?config.weights, "starting recorder");

    // 1. Control panel first, so the user sees something immediately
    let (cmd_rx, event_tx) = face::start_server(args.ui_port).await?;

    // 2. Browser launch blocks for a while
    let (port, headless) = (args.chrome_port, args.headless);
    let browser = tokio::task::spawn_blocking(move || hands::BrowserSession::launch(port, headless))
        .await
        .map_err(|e| anyhow!("Browser launch panicked: {}", e))??;

    if let Some(url) = args.url {
        info!(%url, "opening start page");
        browser.tab.navigate_to(&url)?;
        browser.tab.wait_until_navigated()?;
    }

    // 3. The engine is synchronous; it runs on its own blocking thread
    tokio::task::spawn_blocking(move || run_recorder(browser, config, cmd_rx, event_tx))
        .await
        .map_err(|e| anyhow!("Recorder loop panicked: {}", e))??;

    Ok(())
}

fn run_recorder(
    browser: hands::BrowserSession,
    config: RecorderConfig,
    mut commands: mpsc::Receiver<UiCommand>,
    events: broadcast::Sender<PanelEvent>,
) -> Result<()> {
    let tab = browser.tab.clone();
    dom::install_capture(&tab, 0)?;
    let mut doc = dom::snapshot_document(&tab, 0)?;
    let mut host = ChromeHost::new(tab.clone(), events.clone());
    let mut session: Session<NodeId> = Session::new(config);

    info!(url = %dom::get_current_url(&tab).unwrap_or_default(), "recording");
    publish(&session, &host, &events);

    loop {
        // Panel commands first, then page input, each in delivery order
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    handle_command(&mut session, &mut doc, &mut host, &events, command);
                    publish(&session, &host, &events);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("control panel closed, stopping");
                    return Ok(());
                }
            }
        }

        let pointer_events = match dom::drain_pointer_events(&tab) {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "no pointer events");
                if !dom::capture_installed(&tab) {
                    // Navigation wiped the page, start over on the new one
                    info!(url = %dom::get_current_url(&tab).unwrap_or_default(), "page changed");
                    if let Err(e) = dom::install_capture(&tab, doc.id_bound()) {
                        warn!(error = %e, "could not install capture script");
                    }
                    refresh(&tab, &mut doc);
                    session.reset(&mut host);
                    host.notify(PAGE_CHANGED_NOTICE);
                    publish(&session, &host, &events);
                }
                Vec::new()
            }
        };

        for event in pointer_events {
            if let PointerEvent::Press { .. } = event {
                refresh(&tab, &mut doc);
            }
            session.handle_pointer(&doc, &mut host, event);
            if let PointerEvent::Release { .. } = event {
                publish(&session, &host, &events);
            }
        }

        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

fn handle_command(
    session: &mut Session<NodeId>,
    doc: &mut DomTree,
    host: &mut ChromeHost,
    events: &broadcast::Sender<PanelEvent>,
    command: UiCommand,
) {
    let result = match command {
        UiCommand::ConfirmElements => session.confirm_elements(host),
        UiCommand::AcceptSuggestions => session.move_suggestions_into_selection(host),
        UiCommand::SelectAction { kind } => session.select_action(host, kind),
        UiCommand::SetText { text } => {
            session.set_action_text(text);
            Ok(())
        }
        UiCommand::SaveTask => session.save_task(&*doc, host).map(|task| {
            let _ = events.send(PanelEvent::TaskSaved {
                task: TaskView::of(task),
            });
        }),
        UiCommand::Run => {
            refresh(host.tab(), doc);
            host.set_running(true);
            let report = session.run_bot(&*doc, host);
            host.set_running(false);
            refresh(host.tab(), doc);
            let _ = events.send(PanelEvent::RunFinished { report });
            Ok(())
        }
        UiCommand::Reset => {
            session.reset(host);
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(error = %e, "command rejected");
        host.notify(&e.to_string());
    }
}

fn refresh(tab: &std::sync::Arc<headless_chrome::Tab>, doc: &mut DomTree) {
    match dom::snapshot_document(tab, doc.id_bound()) {
        Ok(fresh) => *doc = fresh,
        Err(e) => warn!(error = %e, "page snapshot failed, keeping the previous one"),
    }
}

fn publish(session: &Session<NodeId>, host: &ChromeHost, events: &broadcast::Sender<PanelEvent>) {
    host.show_step(session.step());
    let _ = events.send(PanelEvent::State(SessionView::of(session)));
}
