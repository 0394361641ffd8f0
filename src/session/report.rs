use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::controller::{EndReason, SessionOutcome, SessionState};
use super::record::SessionRecord;
use super::summary::SessionSummary;
use crate::storage::{default_channel_names, SessionStore, StorageError};

/// A finished session with its persisted record and summary
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    pub end_reason: EndReason,
    pub malformed_lines: usize,
    /// `None` when the transport never opened
    pub record: Option<SessionRecord>,
    pub summary: SessionSummary,
}

impl SessionReport {
    pub fn failure(&self) -> Option<String> {
        (self.state == SessionState::Failed).then(|| self.end_reason.to_string())
    }
}

/// Persist and summarise a finished session
///
/// Failed sessions are handled like completed ones: whatever was recorded
/// before the failure is saved. Empty records are summarised but not saved.
/// Channel names that don't match the record fall back to the defaults.
pub fn finalize(
    outcome: SessionOutcome,
    store: &SessionStore,
    channel_names: Option<&[String]>,
) -> Result<SessionReport, StorageError> {
    let summary = match outcome.record.as_ref() {
        Some(record) if !record.is_empty() => {
            let channel_count = record.channel_count().unwrap_or_default();
            let names = match channel_names {
                Some(names) if names.len() == channel_count => names.to_vec(),
                Some(names) => {
                    warn!(
                        "Configured {} channel names but session has {} channels, using defaults",
                        names.len(),
                        channel_count
                    );
                    default_channel_names(channel_count)
                }
                None => default_channel_names(channel_count),
            };

            let path = store.save(record, &names)?;
            SessionSummary::compute(record, outcome.classification).with_saved_path(path)
        }
        _ => {
            info!("No data collected for {}; nothing saved", outcome.session_id);
            SessionSummary::NoData { saved_path: None }
        }
    };

    Ok(SessionReport {
        session_id: outcome.session_id,
        started_at: outcome.started_at,
        state: outcome.state,
        end_reason: outcome.end_reason,
        malformed_lines: outcome.malformed_lines,
        record: outcome.record,
        summary,
    })
}
