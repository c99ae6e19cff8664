//! DynamoDbRecordStore - Amazon DynamoDB を使う本番用 RecordStore
//!
//! # テーブル
//!
//! | Attribute  | Type   | Description                                  |
//! |------------|--------|----------------------------------------------|
//! | `type`     | String | Partition key: `initialization` / `message` / `error` |
//! | `datetime` | String | Sort key: `%Y-%m-%dT%H:%M:%SZ`               |
//! | `task_id`  | String | `task-<ULID>`                                |
//! | `body`     | String | raw message body (message / error only)      |
//! | `kind`     | String | classified error kind (error only)           |
//!
//! PutItem は同じキーの item を上書きする。同じ秒に同じ type の record が
//! 別のワーカーから書かれた場合は後勝ちになる（読み手は task_id で区別する）。

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;

use crate::domain::{OutcomeRecord, StoreError};
use crate::ports::RecordStore;

/// Service error codes that mean this record can never be stored as sent.
///
/// Everything else (throttling, auth and credential failures, missing table,
/// unknown codes) is `Unavailable`: a record is never dropped on a guess.
const REJECTED_CODES: &[&str] = &[
    "ValidationException",
    "SerializationException",
    "ItemCollectionSizeLimitExceededException",
    "ConditionalCheckFailedException",
];

#[derive(Debug, Clone)]
pub struct DynamoDbRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoDbRecordStore {
    /// The table must already exist with `type` (S, partition) and `datetime` (S, sort).
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a store with a shared SDK config (see [`load_aws_config`](super::load_aws_config)).
    pub fn from_config(config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(Client::new(config), table_name)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl RecordStore for DynamoDbRecordStore {
    async fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("type", AttributeValue::S(record.record_type().as_str().to_string()))
            .item("datetime", AttributeValue::S(record.timestamp().to_string()))
            .item("task_id", AttributeValue::S(record.task_id().to_string()));
        if let Some(body) = record.body() {
            request = request.item("body", AttributeValue::S(body.to_string()));
        }
        if let Some(kind) = record.error_kind() {
            request = request.item("kind", AttributeValue::S(kind.to_string()));
        }

        request.send().await.map(|_| ()).map_err(map_error)
    }
}

fn is_rejected_code(code: &str) -> bool {
    REJECTED_CODES.contains(&code)
}

fn map_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(_) if err.code().is_some_and(is_rejected_code) => {
            StoreError::Rejected(message)
        }
        _ => StoreError::Unavailable(message),
    }
}
