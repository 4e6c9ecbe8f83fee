//! 领域事件可靠发布库（domain-events）
//!
//! 保证在事务性工作单元中发布的事件最终送达每个需要跟踪的监听器，
//! 即使进程在发布与监听器完成之间崩溃（outbox + 重放）：
//! - 领域事件（`domain_event`）与序列化器（`serializer`）
//! - 发布记录、存储协议与登记簿（`publication`）
//! - 工作单元边界（`transaction`）
//! - 多播器、监听器适配与启动重放（`eventing`）
//!
//! 本 crate 尽量保持与存储与事务实现解耦，仅定义协议与最小必要的错误类型，
//! 以便在不同基础设施（例如 Postgres）上进行适配实现。
//!
//! 典型用法：
//! 1. 为事件类型派生 `DomainEvent`，为业务实现 `EventHandler`；
//! 2. 以 `ListenerDescriptor` 声明监听器，选择 `InlineEventListener` 或 `TransactionalEventListener`；
//! 3. 用 `DefaultEventPublicationRegistry` + 仓储构建 `PersistentEventMulticaster`；
//! 4. 启动时调用 `replay_incomplete_publications`，之后在工作单元中发布事件。
//!
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod publication;
pub mod serializer;
pub mod transaction;

// 允许在本 crate 内部通过 ::domain_events 进行自引用，
// 以便派生宏在本 crate 的单元测试中也能解析到 ::domain_events 路径。
extern crate self as domain_events;
