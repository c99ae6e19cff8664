//! Ports - 抽象化レイヤー
//!
//! Worker Loop が依存する外部システム（キュー、結果ストア、時計、ID 生成）への
//! インターフェースを定義します。実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod queue_client;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_client::QueueClient;
pub use self::record_store::RecordStore;
