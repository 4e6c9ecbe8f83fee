use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 通常通过 `#[derive(DomainEvent)]` 实现，`EVENT_TYPE` 取全限定类型名。
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 事件类型（全限定名，形如 `shop::order::OrderPlaced`），持久化后用于还原事件
    const EVENT_TYPE: &'static str;
}
