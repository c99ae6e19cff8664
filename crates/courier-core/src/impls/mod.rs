//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueClient**: visibility timeout 付きのキュー（開発・テスト用）
//! - **InMemoryRecordStore**: Vec ベースの追記専用ストア（開発・テスト用）
//! - **SqsQueueClient** / **DynamoDbRecordStore**: 本番用（feature `aws`）

pub mod inmem_queue;
pub mod inmem_store;

#[cfg(feature = "aws")]
pub mod dynamodb;
#[cfg(feature = "aws")]
pub mod sqs;

#[cfg(test)]
pub(crate) mod testing;

pub use self::inmem_queue::InMemoryQueueClient;
pub use self::inmem_store::InMemoryRecordStore;

#[cfg(feature = "aws")]
pub use self::dynamodb::DynamoDbRecordStore;
#[cfg(feature = "aws")]
pub use self::sqs::SqsQueueClient;
#[cfg(feature = "aws")]
pub use aws_config::SdkConfig;

/// Load the standard AWS config chain (env, profile, container role) once for all clients.
#[cfg(feature = "aws")]
pub async fn load_aws_config() -> aws_config::SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}
