// Scripted transport for driving sessions deterministically in tests

#![allow(dead_code)]

use async_trait::async_trait;
use cardinal_grip::session::SessionConfig;
use cardinal_grip::signal::{Classification, LineFormat};
use cardinal_grip::transport::{Transport, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver one raw line
    Line(Vec<u8>),
    /// Deliver the same line forever, one every `every`
    Repeat { line: Vec<u8>, every: Duration },
    /// Never deliver anything again
    Silent,
    /// Peer closes the stream
    Close,
    /// Read fails
    Fail(String),
}

pub fn line(text: &str) -> Step {
    Step::Line(text.as_bytes().to_vec())
}

pub fn lines(texts: &[&str]) -> Vec<Step> {
    texts.iter().map(|t| line(t)).collect()
}

pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    format: LineFormat,
    settle_delay: Duration,
    /// Leading steps that stand for output printed while settling
    settle_noise: usize,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(format: LineFormat, steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            format,
            settle_delay: Duration::ZERO,
            settle_noise: 0,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Queue `noise` ahead of the script; `discard_input` drops it
    pub fn with_settle_noise(mut self, noise: Vec<Step>) -> Self {
        self.settle_noise = noise.len();
        for step in noise.into_iter().rev() {
            self.steps.push_front(step);
        }
        self
    }

    /// Flag set once the session releases the transport
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn boxed(self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(self))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.steps.pop_front() {
            Some(Step::Line(bytes)) => Ok(Some(bytes)),
            Some(Step::Repeat { line, every }) => {
                self.steps.push_front(Step::Repeat {
                    line: line.clone(),
                    every,
                });
                tokio::time::sleep(every).await;
                Ok(Some(line))
            }
            Some(Step::Silent) => {
                self.steps.push_front(Step::Silent);
                std::future::pending().await
            }
            Some(Step::Fail(reason)) => Err(TransportError::Read {
                target: "scripted".to_string(),
                reason,
            }),
            Some(Step::Close) | None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn line_format(&self) -> LineFormat {
        self.format
    }

    fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        let noise = self.settle_noise.min(self.steps.len());
        self.steps.drain(..noise);
        self.settle_noise = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn session_config(classification: Classification) -> SessionConfig {
    SessionConfig {
        transport_target: "scripted".to_string(),
        smoothing_window: 1,
        duration_cap_seconds: 10.0,
        classification,
        read_timeout: Duration::from_millis(100),
        ..SessionConfig::default()
    }
}

pub fn was_closed(flag: &Arc<AtomicBool>) -> bool {
    flag.load(Ordering::SeqCst)
}
