//! App - アプリケーション層
//!
//! ports を組み合わせてワーカーのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: ワーカーの構築とワイヤリング
//! - **WorkerLoop**: receive→classify→append→delete のループ
//! - **RetryPolicy**: 一時的なエラーの backoff
//! - **shutdown**: 停止要求の受け渡し
//! - **status**: 集計値と終了コード

pub mod builder;
pub mod retry;
pub mod shutdown;
pub mod status;
pub mod worker_loop;

pub use self::builder::{BuildError, WorkerBuilder};
pub use self::retry::RetryPolicy;
pub use self::shutdown::{ShutdownHandle, ShutdownSignal};
pub use self::status::{ExitStatus, WorkerStats};
pub use self::worker_loop::WorkerLoop;
