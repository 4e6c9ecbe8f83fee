//! 发布记录与登记簿（publication）
//!
//! 定义发布记录模型、存储协议与登记簿：
//! - 发布记录（`PublicationRecord`）与读取视图（`EventPublication`）；
//! - 存储协议（`EventPublicationRepository`）及内存实现；
//! - 编排序列化与存储的登记簿（`EventPublicationRegistry`）。
//!
//! 该模块聚焦协议与装配逻辑，具体存储后端（如 Postgres）可由上层提供实现并注入。
//!
mod inmemory;
#[cfg(feature = "infra-sqlx")]
mod postgres;
mod record;
mod registry;
mod repository;

pub use inmemory::InMemoryEventPublicationRepository;
#[cfg(feature = "infra-sqlx")]
pub use postgres::PgEventPublicationRepository;
pub use record::{EventPublication, PublicationRecord, PublicationTargetId};
pub use registry::{DefaultEventPublicationRegistry, EventPublicationRegistry};
pub use repository::EventPublicationRepository;
