pub mod config;
pub mod session;
pub mod signal;
pub mod storage;
pub mod transport;

pub use config::Config;
pub use session::{
    finalize, EndReason, SessionConfig, SessionController, SessionOutcome, SessionProgress,
    SessionRecord, SessionReport, SessionState, SessionSummary, StopHandle,
};
pub use signal::{Classification, ClassificationMetric, Classifier, LineFormat, LineParser, Smoother};
pub use storage::{SessionStore, StorageError};
pub use transport::{Transport, TransportError, TransportFactory, TransportTarget};
