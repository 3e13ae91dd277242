//! Ingestion 错误类型

use thiserror::Error;

/// 根据配置构建注册表时的错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 无法组装同步器
    #[error(transparent)]
    Sync(#[from] sync_engine::SyncError),

    /// 注册表无法满足的配置内容
    #[error("sensor '{label}': {message}")]
    InvalidSensor { label: String, message: String },
}

impl IngestionError {
    pub fn invalid_sensor(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSensor {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
