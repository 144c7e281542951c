//! Page-context lifecycle.
//!
//! Drives one detection cycle per page load or SPA navigation:
//! `Idle → Detecting → (NotTicket | WaitingForHostUi → Injecting → Ready)`. Cycle errors are
//! retried a bounded number of times; a channel failure while announcing the page aborts
//! the cycle without retrying. Navigation tears the panel down and starts over after a
//! debounce; unload is terminal.

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::model::PageInfo;
use crate::page::{Document, ElementHandle, HostUiState, PageDetector, PanelInjector};
use crate::protocol::{OperationKind, Request};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Detecting,
    NotTicket,
    WaitingForHostUi,
    Injecting,
    Ready,
    /// The last cycle exhausted its attempts; the next navigation starts over.
    Failed,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Initial document load.
    Load,
    Navigated(String),
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NotTicket,
    Ready(ElementHandle),
    /// The page announcement could not be delivered.
    Aborted,
    Failed { attempts: u32 },
    /// The controller already reached `Terminal`.
    Ignored,
}

/// Renders the panel UI into the injected container
pub trait PanelRenderer: Send + Sync {
    fn mount(&self, container: &ElementHandle, page: &PageInfo) -> Result<(), LifecycleError>;

    fn unmount(&self);
}

pub struct LifecycleController {
    detector: PageDetector,
    injector: PanelInjector,
    transport: Transport,
    renderer: Arc<dyn PanelRenderer>,
    config: LifecycleConfig,
    state: LifecycleState,
    page: Option<PageInfo>,
    mounted: bool,
    last_attempts: u32,
}

impl LifecycleController {
    pub fn new(
        detector: PageDetector,
        injector: PanelInjector,
        transport: Transport,
        renderer: Arc<dyn PanelRenderer>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            detector,
            injector,
            transport,
            renderer,
            config,
            state: LifecycleState::Idle,
            page: None,
            mounted: false,
            last_attempts: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Page info from the last successful detection.
    pub fn page(&self) -> Option<&PageInfo> {
        self.page.as_ref()
    }

    /// Attempts made by the most recent cycle.
    pub fn last_attempts(&self) -> u32 {
        self.last_attempts
    }

    /// Watcher over the same document, polling at `lifecycle.location_poll_ms`.
    pub fn location_watcher(&self) -> LocationWatcher {
        LocationWatcher::new(
            Arc::clone(self.detector.document()),
            self.config.location_poll_interval(),
        )
    }

    /// Run one detection cycle with bounded retry.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.state == LifecycleState::Terminal {
            return CycleOutcome::Ignored;
        }

        let max_attempts = self.config.max_attempts.max(1);
        self.last_attempts = 0;

        for attempt in 1..=max_attempts {
            self.last_attempts = attempt;
            match self.attempt().await {
                Ok(outcome) => return outcome,
                Err(LifecycleError::Transport(e)) => {
                    debug!(error = %e, "Page announcement not delivered, cycle aborted");
                    self.state = LifecycleState::Idle;
                    return CycleOutcome::Aborted;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Initialization failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => {
                    error!(attempts = attempt, error = %e, "Initialization failed");
                    self.state = LifecycleState::Failed;
                    return CycleOutcome::Failed { attempts: attempt };
                }
            }
        }

        self.state = LifecycleState::Failed;
        CycleOutcome::Failed {
            attempts: max_attempts,
        }
    }

    async fn attempt(&mut self) -> Result<CycleOutcome, LifecycleError> {
        self.state = LifecycleState::Detecting;
        let page = self.detector.detect();

        let response = self
            .transport
            .send(Request::PageDetected(page.clone()))
            .await?;
        if let Err(message) = response.into_result() {
            return Err(LifecycleError::Rejected {
                operation: OperationKind::PageDetected.as_str(),
                message,
            });
        }

        if !page.is_ticket_page {
            debug!(url = %page.url, "Not a ticket page, skipping injection");
            self.state = LifecycleState::NotTicket;
            self.page = Some(page);
            return Ok(CycleOutcome::NotTicket);
        }

        info!(ticket_id = page.ticket_id.as_deref().unwrap_or("-"), "Ticket page detected");
        self.state = LifecycleState::WaitingForHostUi;
        if self.detector.wait_for_host_ui().await == HostUiState::TimedOut {
            debug!("Injecting without the host UI");
        }

        self.state = LifecycleState::Injecting;
        let container = self.injector.inject()?;
        if !self.mounted {
            self.renderer.mount(&container, &page)?;
            self.mounted = true;
        }

        info!(ticket_id = page.ticket_id.as_deref().unwrap_or("-"), "Initialization complete");
        self.state = LifecycleState::Ready;
        self.page = Some(page);
        Ok(CycleOutcome::Ready(container))
    }

    fn teardown(&mut self) {
        if self.mounted {
            self.renderer.unmount();
            self.mounted = false;
        }
        match self.injector.remove() {
            Ok(true) => debug!("Panel torn down"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to remove panel"),
        }
        self.page = None;
    }

    /// Tear down, wait out the navigation debounce, then run a fresh cycle.
    pub async fn on_location_changed(&mut self, url: &str) -> CycleOutcome {
        if self.state == LifecycleState::Terminal {
            return CycleOutcome::Ignored;
        }

        info!(url, "URL changed, re-initializing");
        self.teardown();
        self.state = LifecycleState::Idle;
        tokio::time::sleep(self.config.navigation_debounce()).await;
        self.run_cycle().await
    }

    /// Remove all UI; every later event is ignored.
    pub fn unload(&mut self) {
        if self.state == LifecycleState::Terminal {
            return;
        }
        self.teardown();
        self.state = LifecycleState::Terminal;
        info!("Cleanup complete");
    }

    async fn process(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Load => {
                self.run_cycle().await;
            }
            LifecycleEvent::Navigated(url) => {
                self.on_location_changed(&url).await;
            }
            LifecycleEvent::Unload => self.unload(),
        }
    }

    /// Consume events until unload or until every sender is gone.
    ///
    /// Starts with a [`LifecycleEvent::Load`]. An event arriving mid-cycle supersedes the
    /// cycle in progress.
    pub async fn run(mut self, mut events: mpsc::Receiver<LifecycleEvent>) -> Self {
        let mut pending = Some(LifecycleEvent::Load);
        let mut open = true;

        loop {
            let event = match pending.take() {
                Some(event) => event,
                None if open => match events.recv().await {
                    Some(event) => event,
                    None => break,
                },
                None => break,
            };
            let terminal = event == LifecycleEvent::Unload;

            {
                let work = self.process(event);
                tokio::pin!(work);
                loop {
                    tokio::select! {
                        _ = &mut work => break,
                        next = events.recv(), if open => match next {
                            Some(next) => {
                                debug!(?next, "Cycle superseded");
                                pending = Some(next);
                                break;
                            }
                            None => open = false,
                        },
                    }
                }
            }

            if terminal {
                break;
            }
        }
        self
    }
}

/// Shortest poll period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Emits [`LifecycleEvent::Navigated`] whenever the document location changes.
pub struct LocationWatcher {
    document: Arc<dyn Document>,
    last: String,
    interval: Duration,
}

impl LocationWatcher {
    pub fn new(document: Arc<dyn Document>, interval: Duration) -> Self {
        let last = document.href();
        Self {
            document,
            last,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn check(&mut self) -> Option<LifecycleEvent> {
        let current = self.document.href();
        if current == self.last {
            return None;
        }
        self.last = current.clone();
        Some(LifecycleEvent::Navigated(current))
    }

    /// Poll until the receiving side goes away.
    pub async fn watch(mut self, sender: mpsc::Sender<LifecycleEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = sender.closed() => break,
                _ = ticker.tick() => {
                    if let Some(event) = self.check() {
                        if sender.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        debug!("Location watcher stopped");
    }

    pub fn spawn(self, sender: mpsc::Sender<LifecycleEvent>) -> JoinHandle<()> {
        tokio::spawn(self.watch(sender))
    }
}
