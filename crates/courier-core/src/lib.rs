//! courier-core
//!
//! Building blocks for a reliable queue-consumer worker: receive a message,
//! classify it, append an outcome record, then acknowledge the message.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, OutcomeRecord, QueueMessage, classifier, errors）
//! - **ports**: 抽象化レイヤー（QueueClient, RecordStore, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（WorkerBuilder, WorkerLoop, RetryPolicy, shutdown, status）
//! - **impls**: ports の実装（InMemory*, feature `aws` で SQS / DynamoDB）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{ExitStatus, WorkerBuilder, WorkerLoop, WorkerStats};
pub use config::{ConfigError, WorkerConfig};
