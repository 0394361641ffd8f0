//! Per-line signal processing
//!
//! Raw lines flow through the `LineParser`, then the `Smoother`, then the
//! `Classifier`. Each stage is synchronous and owned by one session.

mod classifier;
mod parser;
mod smoother;

pub use classifier::{Classification, ClassificationMetric, Classifier};
pub use parser::{parse_line, LineFormat, LineParser, Malformed};
pub use smoother::Smoother;
