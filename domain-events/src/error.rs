//! 统一错误定义
//!
//! 聚焦序列化、监听器、发布记录仓储与工作单元边界的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 监听器 ---
    #[error("unresolved listener type: {listener}")]
    UnresolvedListenerType { listener: String },
    #[error("listener invocation failed: listener={listener}, reason={reason}")]
    ListenerInvocation { listener: String, reason: String },

    // --- 仓储/持久化 ---
    #[error("publication repository error: {reason}")]
    PublicationRepository { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },

    // --- 工作单元 ---
    #[error("unit of work error: {reason}")]
    UnitOfWork { reason: String },
}

impl DomainError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        DomainError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn repository(reason: impl Into<String>) -> Self {
        DomainError::PublicationRepository {
            reason: reason.into(),
        }
    }

    pub fn unit_of_work(reason: impl Into<String>) -> Self {
        DomainError::UnitOfWork {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----
// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database {
            reason: err.to_string(),
        }
    }
}
