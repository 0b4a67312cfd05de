use anyhow::{Result, anyhow};
use headless_chrome::{Browser, LaunchOptions, Tab};
use rpa_recorder::{
    ActionError, ActionInvoker, InputCapture, Marker, NodeId, Notifier, Point, Renderer,
    WorkflowStep,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::face::PanelEvent;
use crate::types::{MARKER_CLASS_PREFIX, MOUNT_ID};

/// Persistent browser session. Created once, reused for every recording.
pub struct BrowserSession {
    _browser: Browser,
    pub tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(debug_port: u16, headless: bool) -> Result<Self> {
        // 1. Try to connect to an existing Chrome (attach mode)
        let endpoint = format!("http://127.0.0.1:{}", debug_port);
        info!(%endpoint, "attempting to attach to existing Chrome");
        if let Ok(browser) = Browser::connect(endpoint) {
            info!("attached to existing Chrome");
            let existing = {
                let tabs = browser.get_tabs();
                let tabs = tabs.lock().map_err(|_| anyhow!("Chrome tab list poisoned"))?;
                tabs.first().cloned()
            };
            let tab = match existing {
                Some(t) => t,
                None => browser.new_tab()?,
            };
            return Ok(Self {
                _browser: browser,
                tab,
            });
        }

        // 2. Launch our own, with a profile that survives restarts
        let chrome_path = find_chrome()?;
        let profile = recorder_profile_dir()?;
        std::fs::create_dir_all(&profile)?;
        info!(profile = %profile.display(), "launching Chrome");

        let options = LaunchOptions {
            headless,
            path: Some(chrome_path),
            user_data_dir: Some(profile),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-infobars"),
                std::ffi::OsStr::new("--password-store=basic"),
            ],
            idle_browser_timeout: std::time::Duration::from_secs(60 * 60),
            ..Default::default()
        };

        let browser =
            Browser::new(options).map_err(|e| anyhow!("Browser launch failed: {}", e))?;
        let tab = browser.new_tab()?;
        tab.navigate_to("about:blank")?;
        info!("Chrome ready");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

fn recorder_profile_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().ok_or_else(|| anyhow!("no local data directory"))?;
    Ok(base.join("rpa-recorder").join("chrome-profile"))
}

// Helper to find the Chrome executable
fn find_chrome() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROME_PATH") {
        return Ok(PathBuf::from(path));
    }
    let mut candidates = vec![
        PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        PathBuf::from("/usr/bin/google-chrome"),
        PathBuf::from("/usr/bin/chromium"),
        PathBuf::from("/usr/bin/chromium-browser"),
    ];
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join(r"Google\Chrome\Application\chrome.exe"));
    }

    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Chrome executable not found. Install Google Chrome or set CHROME_PATH."))
}

fn marker_class(marker: Marker) -> String {
    let name = match marker {
        Marker::Selected => "selected",
        Marker::Suggested => "suggested",
        Marker::Highlighted => "highlighted",
        Marker::ActionTarget => "action-target",
        Marker::LoopTarget => "loop-target",
        Marker::NotClickable => "not-clickable",
    };
    format!("{}{}", MARKER_CLASS_PREFIX, name)
}

fn element_js(id: NodeId) -> String {
    format!("document.querySelector('[data-eid=\"{}\"]')", id)
}

/// The live page as seen by the recorder engine.
pub struct ChromeHost {
    tab: Arc<Tab>,
    events: broadcast::Sender<PanelEvent>,
}

impl ChromeHost {
    pub fn new(tab: Arc<Tab>, events: broadcast::Sender<PanelEvent>) -> Self {
        Self { tab, events }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// While set, the capture script ignores all input, including the
    /// bot's own clicks.
    pub fn set_running(&self, running: bool) {
        let js = format!(
            "window.__rpaRecorder && (window.__rpaRecorder.running = {})",
            running
        );
        if let Err(e) = self.tab.evaluate(&js, false) {
            warn!(error = %e, "could not toggle running flag");
        }
    }

    /// Refresh the badge text for `step`.
    pub fn show_step(&self, step: WorkflowStep) {
        let label = format!("Step {}: {}", step.number(), step);
        self.set_badge(".step", &label);
    }

    fn set_badge(&self, part: &str, text: &str) {
        let js = format!(
            "(() => {{ const el = document.querySelector('#{} {}'); if (el) el.textContent = {}; }})()",
            MOUNT_ID,
            part,
            serde_json::json!(text)
        );
        if let Err(e) = self.tab.evaluate(&js, false) {
            warn!(error = %e, "could not update recorder badge");
        }
    }

    fn toggle_classes(&self, id: NodeId, markers: &[Marker], method: &str) {
        let classes: Vec<String> = markers.iter().map(|m| marker_class(*m)).collect();
        let js = format!(
            "(() => {{ const el = {}; if (el) el.classList.{}(...{}); }})()",
            element_js(id),
            method,
            serde_json::json!(classes)
        );
        if let Err(e) = self.tab.evaluate(&js, false) {
            warn!(%id, error = %e, "could not update markers");
        }
    }

    /// Run `body` against the element, `el` in scope. Returns false when the
    /// element is gone.
    fn with_element(&self, id: NodeId, body: &str) -> Result<(), ActionError> {
        let js = format!(
            "(() => {{ const el = {}; if (!el) return false; {}; return true; }})()",
            element_js(id),
            body
        );
        let result = self.tab.evaluate(&js, false).map_err(ActionError::Host)?;
        match result.value.and_then(|v| v.as_bool()) {
            Some(true) => Ok(()),
            _ => Err(ActionError::Detached),
        }
    }
}

impl InputCapture<NodeId> for ChromeHost {
    fn element_at_point(&self, point: Point) -> Option<NodeId> {
        let js = format!(
            "(() => {{ const el = document.elementFromPoint({}, {}); return el ? el.getAttribute('data-eid') : null; }})()",
            point.x, point.y
        );
        let eid = self
            .tab
            .evaluate(&js, false)
            .ok()?
            .value?
            .as_str()
            .map(String::from)?;
        eid.strip_prefix('e')?.parse().ok().map(NodeId)
    }
}

impl Renderer<NodeId> for ChromeHost {
    fn apply_markers(&mut self, element: NodeId, markers: &[Marker]) {
        self.toggle_classes(element, markers, "add");
    }

    fn remove_markers(&mut self, element: NodeId, markers: &[Marker]) {
        self.toggle_classes(element, markers, "remove");
    }
}

impl ActionInvoker<NodeId> for ChromeHost {
    fn activate(&mut self, element: NodeId) -> Result<(), ActionError> {
        let selector = format!("[data-eid=\"{}\"]", element);
        let el = self
            .tab
            .find_element(&selector)
            .map_err(|_| ActionError::Detached)?;
        el.click().map_err(ActionError::Host)?;
        Ok(())
    }

    fn set_value(&mut self, element: NodeId, text: &str) -> Result<(), ActionError> {
        let body = format!("el.value = {}", serde_json::json!(text));
        self.with_element(element, &body)
    }

    fn notify_input_changed(&mut self, element: NodeId) -> Result<(), ActionError> {
        self.with_element(element, "el.dispatchEvent(new Event('input', { bubbles: true }))")
    }
}

impl Notifier for ChromeHost {
    fn notify(&mut self, message: &str) {
        self.set_badge(".notice", message);
        let _ = self.events.send(PanelEvent::Notice {
            message: message.to_string(),
        });
    }
}
