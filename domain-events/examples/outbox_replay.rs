/// 可靠发布（内存版）示例
/// 展示 登记 -> 提交后执行 -> 标记完成；回滚不留下意图；
/// 监听器在提交后中途失败时，由下次启动的重放补投
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use domain_events::domain_event::ApplicationEvent;
use domain_events::eventing::{
    EventHandler, EventListener, HandledEventType, InlineEventListener, ListenerDescriptor,
    PersistentEventMulticaster, TransactionalEventListener,
};
use domain_events::publication::{
    DefaultEventPublicationRegistry, EventPublicationRepository,
    InMemoryEventPublicationRepository,
};
use domain_events::transaction::TransactionScope;
use domain_events_macros::DomainEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, DomainEvent)]
#[domain_event(name = "shop.OrderPlaced")]
struct OrderPlaced {
    order_id: String,
    amount: u64,
}

struct PrintHandler {
    name: &'static str,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl EventHandler for PrintHandler {
    async fn handle(&self, event: &ApplicationEvent) -> AnyResult<()> {
        let order = event.decode::<OrderPlaced>()?;
        if self.fail_on == Some(order.order_id.as_str()) {
            anyhow::bail!("[{}] 处理订单 {} 时进程退出", self.name, order.order_id);
        }
        println!("  [{}] 处理订单 {} (金额 {})", self.name, order.order_id, order.amount);
        Ok(())
    }
}

fn listeners(fail_on: Option<&'static str>) -> Vec<Arc<dyn EventListener>> {
    vec![
        Arc::new(TransactionalEventListener::new(
            ListenerDescriptor::durable("shipping", HandledEventType::of::<OrderPlaced>()),
            PrintHandler {
                name: "shipping",
                fail_on,
            },
        )),
        Arc::new(InlineEventListener::new(
            ListenerDescriptor::transient(HandledEventType::All),
            PrintHandler {
                name: "audit",
                fail_on: None,
            },
        )),
    ]
}

fn multicaster(
    repo: &InMemoryEventPublicationRepository,
    fail_on: Option<&'static str>,
) -> PersistentEventMulticaster {
    PersistentEventMulticaster::builder()
        .registry(Arc::new(DefaultEventPublicationRegistry::new(repo.clone())))
        .event_listeners(listeners(fail_on))
        .build()
}

async fn pending(repo: &InMemoryEventPublicationRepository) -> AnyResult<usize> {
    Ok(repo.find_by_completion_date_is_null().await?.len())
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("domain_events=debug")),
        )
        .init();

    println!("=== 可靠发布（内存版）示例 ===\n");
    // 充当数据库的共享存储
    let repo = InMemoryEventPublicationRepository::new();

    // 第一个进程：shipping 处理 o-2 时“崩溃”
    let first = multicaster(&repo, Some("o-2"));

    for (order_id, amount) in [("o-1", 120), ("o-2", 80)] {
        let scope = TransactionScope::new();
        first
            .publish_event_within(
                &OrderPlaced {
                    order_id: order_id.into(),
                    amount,
                },
                scope.clone(),
            )
            .await?;
        scope.commit().await?;
        println!("✅ {order_id} 已提交，未完成记录: {}", pending(&repo).await?);
    }

    let scope = TransactionScope::new();
    first
        .publish_event_within(
            &OrderPlaced {
                order_id: "o-3".into(),
                amount: 50,
            },
            scope.clone(),
        )
        .await?;
    scope.rollback().await?;
    println!("↩️  o-3 已回滚，未完成记录: {}", pending(&repo).await?);

    first.shutdown().await?;
    drop(first);

    // 第二个进程：注册监听器后先重放，再对外服务
    let second = multicaster(&repo, None);
    let report = second.replay_incomplete_publications().await?;
    println!(
        "✅ 重放完成: replayed={}, skipped={}, failed={}",
        report.replayed, report.skipped, report.failed
    );
    println!("✅ 未完成记录: {}", pending(&repo).await?);

    second.shutdown().await?;
    Ok(())
}
