//! Domain model (ids, records, messages, classification, errors).

pub mod classifier;
pub mod errors;
pub mod ids;
pub mod message;
pub mod record;

pub use classifier::{Classification, MessageClassifier};
pub use errors::{ErrorKind, QueueError, StoreError, WorkerError};
pub use ids::TaskId;
pub use message::{QueueMessage, ReceiptHandle};
pub use record::{OutcomeRecord, RecordTimestamp, RecordType};
