use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use super::config::{ConfigError, SessionConfig};
use super::record::{Sample, SessionRecord};
use crate::signal::{Classification, ClassificationMetric, Classifier, LineParser, Smoother};
use crate::transport::{Transport, TransportError, TransportFactory};

/// Deadline used when the duration cap does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Stopping,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a session left `Streaming` (or never got there)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "cause", rename_all = "snake_case")]
pub enum EndReason {
    DurationCap,
    Stopped,
    TransportClosed,
    TransportError(String),
    OpenFailed(String),
}

impl EndReason {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TransportClosed | Self::TransportError(_) | Self::OpenFailed(_)
        )
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DurationCap => f.write_str("maximum session duration reached"),
            Self::Stopped => f.write_str("stopped by user"),
            Self::TransportClosed => f.write_str("connection closed by device"),
            Self::TransportError(cause) => write!(f, "transport error: {}", cause),
            Self::OpenFailed(cause) => write!(f, "could not connect: {}", cause),
        }
    }
}

/// Live view of a running session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub state: SessionState,
    pub elapsed_seconds: f64,
    pub sample_count: usize,
    pub malformed_lines: usize,
    /// Most recent smoothed values
    pub latest: Option<Vec<i64>>,
    pub metric: ClassificationMetric,
}

/// Result of running a session to a terminal state
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    pub end_reason: EndReason,
    pub classification: Classification,
    /// `None` when the transport never opened
    pub record: Option<SessionRecord>,
    pub malformed_lines: usize,
}

impl SessionOutcome {
    /// Human-readable cause for failed sessions
    pub fn failure(&self) -> Option<String> {
        (self.state == SessionState::Failed).then(|| self.end_reason.to_string())
    }
}

/// Cooperative stop signal for a running session
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Takes effect within one read timeout
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives one session: connect, stream, classify and record until the
/// duration cap, a stop request or a transport failure.
///
/// The controller is consumed by `run`, so each instance records exactly one
/// session. Callers observe it through `subscribe` and command it through
/// `stop_handle`.
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,
    stop_requested: Arc<AtomicBool>,
    progress_tx: watch::Sender<SessionProgress>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (progress_tx, _) = watch::channel(SessionProgress {
            state: SessionState::Idle,
            elapsed_seconds: 0.0,
            sample_count: 0,
            malformed_lines: 0,
            latest: None,
            metric: Classifier::new(config.classification).metric(),
        });

        Ok(Self {
            config,
            state: SessionState::Idle,
            stop_requested: Arc::new(AtomicBool::new(false)),
            progress_tx,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_requested),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionProgress> {
        self.progress_tx.subscribe()
    }

    /// Open the configured transport and run the session
    pub async fn run(self) -> SessionOutcome {
        let target = self.config.target();
        self.run_with(async move {
            match target {
                Ok(target) => TransportFactory::open(&target).await,
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Run the session over the transport produced by `open`
    pub async fn run_with<F>(mut self, open: F) -> SessionOutcome
    where
        F: Future<Output = Result<Box<dyn Transport>, TransportError>>,
    {
        let started_at = Utc::now();
        info!(
            "Starting session {} on {} ({}, window {}, cap {:.1}s)",
            self.config.session_id,
            self.config.transport_target,
            self.config.classification,
            self.config.smoothing_window,
            self.config.duration_cap_seconds
        );

        self.transition(SessionState::Connecting);

        let opened = match timeout(self.config.connect_timeout, open).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "timed out after {:?} opening {}",
                self.config.connect_timeout, self.config.transport_target
            )),
        };

        let mut transport = match opened {
            Ok(transport) => transport,
            Err(cause) => {
                error!("Session {} failed to connect: {}", self.config.session_id, cause);
                self.transition(SessionState::Failed);
                return self.outcome(started_at, EndReason::OpenFailed(cause), None, 0);
            }
        };

        let settle = self
            .config
            .settle_delay
            .unwrap_or_else(|| transport.settle_delay());
        if !settle.is_zero() {
            debug!("Waiting {:?} for {} to settle", settle, transport.name());
            tokio::time::sleep(settle).await;

            // Drop whatever the device printed while it was resetting
            if let Err(e) = transport.discard_input() {
                warn!("Failed to discard settle output from {}: {}", transport.name(), e);
            }
        }

        self.transition(SessionState::Streaming);
        let (end_reason, record, malformed) = self.stream(transport.as_mut()).await;

        if end_reason == EndReason::Stopped {
            self.transition(SessionState::Stopping);
        }

        // Released on every exit from streaming
        if let Err(e) = transport.close().await {
            warn!("Failed to close {}: {}", transport.name(), e);
        }
        drop(transport);

        let terminal = if end_reason.is_failure() {
            error!(
                "Session {} failed after {} samples: {}",
                self.config.session_id,
                record.len(),
                end_reason
            );
            SessionState::Failed
        } else {
            info!(
                "Session {} complete: {} samples ({})",
                self.config.session_id,
                record.len(),
                end_reason
            );
            SessionState::Completed
        };
        self.transition(terminal);

        self.outcome(started_at, end_reason, Some(record), malformed)
    }

    async fn stream(
        &mut self,
        transport: &mut dyn Transport,
    ) -> (EndReason, SessionRecord, usize) {
        let mut parser = LineParser::new(transport.line_format());
        let mut smoother = Smoother::new(self.config.smoothing_window);
        let mut classifier = Classifier::new(self.config.classification);
        let mut record = SessionRecord::new();
        let mut malformed = 0usize;

        let start = Instant::now();
        let deadline = start
            .checked_add(self.config.duration_cap())
            .unwrap_or_else(|| start + FAR_FUTURE);

        let end_reason = loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                break EndReason::Stopped;
            }

            let now = Instant::now();
            if now >= deadline {
                break EndReason::DurationCap;
            }

            let budget = self.config.read_timeout.min(deadline - now);
            let raw = match timeout(budget, transport.read_line()).await {
                Err(_) => continue,
                Ok(Ok(Some(raw))) => raw,
                Ok(Ok(None)) => break EndReason::TransportClosed,
                Ok(Err(e)) => break EndReason::TransportError(e.to_string()),
            };

            let values = match parser.parse(&raw) {
                Ok(values) => values,
                Err(reason) => {
                    malformed += 1;
                    debug!(
                        "Skipping malformed line {:?}: {}",
                        String::from_utf8_lossy(&raw),
                        reason
                    );
                    continue;
                }
            };

            let smoothed = smoother.smooth(&values);
            classifier.classify(&smoothed);

            let elapsed_seconds = start.elapsed().as_secs_f64();
            let sample = Sample {
                elapsed_seconds,
                channels: smoothed.clone(),
            };
            if let Err(e) = record.append(sample) {
                warn!("Dropping sample: {}", e);
                continue;
            }

            self.progress_tx.send_modify(|progress| {
                progress.elapsed_seconds = elapsed_seconds;
                progress.sample_count = record.len();
                progress.malformed_lines = malformed;
                progress.latest = Some(smoothed);
                progress.metric = classifier.metric();
            });
        };

        (end_reason, record, malformed)
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            "Session {}: {:?} -> {:?}",
            self.config.session_id, self.state, next
        );
        self.state = next;
        self.progress_tx.send_modify(|progress| progress.state = next);
    }

    fn outcome(
        &self,
        started_at: DateTime<Utc>,
        end_reason: EndReason,
        record: Option<SessionRecord>,
        malformed_lines: usize,
    ) -> SessionOutcome {
        SessionOutcome {
            session_id: self.config.session_id.clone(),
            started_at,
            state: self.state,
            end_reason,
            classification: self.config.classification,
            record,
            malformed_lines,
        }
    }
}
