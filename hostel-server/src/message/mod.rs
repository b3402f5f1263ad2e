//! 消息总线
//!
//! 持久化成功之后，处理器把变更发布到进程内的 broadcast 通道。
//!
//! ```text
//! handler ──▶ ServerState::broadcast_sync ──▶ EventBus::publish ──▶ subscribers
//!                                                                 (event log, device gateways)
//! ```
//!
//! 没有订阅者时发布会被静默丢弃，永远不会让请求失败。

use shared::message::{BusMessage, EventType, SyncPayload};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Default broadcast channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// 进程内事件总线 (cheap to clone)
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 发布消息，返回收到消息的订阅者数量
    pub fn publish(&self, msg: BusMessage) -> usize {
        self.tx.send(msg).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug-log every bus message until `shutdown` fires.
///
/// Registered as a listener task so bus traffic shows up next to request logs.
pub async fn run_event_logger(
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = rx.recv() => match received {
                Ok(msg) => log_message(&msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn log_message(msg: &BusMessage) {
    match msg.event_type {
        EventType::Sync => match msg.parse_payload::<SyncPayload>() {
            Ok(p) => tracing::debug!(
                resource = %p.resource,
                action = %p.action,
                id = %p.id,
                version = p.version,
                "sync event"
            ),
            Err(e) => tracing::warn!(error = %e, "Malformed sync payload"),
        },
        EventType::Notification => tracing::debug!(
            target_user = ?msg.target,
            request_id = %msg.request_id,
            "notification event"
        ),
    }
}
