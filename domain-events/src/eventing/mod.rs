//! 事件分发与持久化协调（eventing）
//!
//! 提供事件分发与“登记-完成-重放”的协调运行时：
//! - `EventListener` / `ListenerDescriptor`：监听器及其显式能力描述；
//! - `EventHandler`：业务处理逻辑，经 `InlineEventListener` / `TransactionalEventListener` 适配；
//! - `PublicationCompletion`：跟踪投递的完成/错误回调；
//! - `PersistentEventMulticaster`：分类、登记、调用监听器，并在启动时重放未完成的发布。
//!
//! 该模块仅依赖登记簿与工作单元协议，不绑定具体存储或事务实现。
//!
pub mod completion;
pub mod handler;
pub mod listener;
pub mod multicaster;
pub mod replay;

pub use completion::{CompletionErrorHandler, LoggingCompletionErrorHandler, PublicationCompletion};
pub use handler::{EventHandler, InlineEventListener, TransactionalEventListener};
pub use listener::{EventListener, HandledEventType, ListenerContext, ListenerDescriptor};
pub use multicaster::{MulticasterConfig, PersistentEventMulticaster};
pub use replay::ReplayReport;
