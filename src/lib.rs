//! Headless image fetcher.
//!
//! Pulls a title, author and image URL out of a JSON-like snippet with
//! independent regex searches, plays a simulated progress sequence and then
//! downloads the image in fixed-size chunks. The whole run is cancellable
//! through a shared token and reports to its caller over an event channel.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod telemetry;
pub mod transfer;
pub mod ui;
pub mod worker;
pub mod workflow;

pub use error::{ExtractError, TransferError, WorkerError, WorkflowError};
pub use extractor::{ExtractionResult, Extractor, FieldPattern, extract_field};
pub use transfer::{Transfer, TransferJob, TransferOutcome};
pub use worker::{Spawner, Worker};
pub use workflow::{RunReport, Workflow, WorkflowEvent, WorkflowSettings, WorkflowState};
