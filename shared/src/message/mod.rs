//! 消息总线消息类型定义
//!
//! 持久化成功后，服务端把变更广播给已连接的客户端（进程内 broadcast）。
//! The transport that forwards these to devices is outside this crate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// 资源同步信号 (created / updated / deleted ...)
    Sync,
    /// 面向用户的通知 (订单状态变更、新公告 ...)
    Notification,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Sync => write!(f, "sync"),
            EventType::Notification => write!(f, "notification"),
        }
    }
}

/// 数据同步载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 资源类型 (例如: "order", "outpass", "announcement")
    pub resource: String,
    /// 版本号 (每个资源类型单调递增)
    pub version: u64,
    /// 变更类型 (例如: "created", "status_updated", "deleted")
    pub action: String,
    /// 资源 ID
    pub id: String,
    /// 资源数据 (deleted 时为 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 用户通知载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    /// 关联资源 (例如: "order:123")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    /// 目标用户 ID (None = 广播给所有连接)
    pub target: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            target: None,
            payload,
        }
    }

    /// 设置目标用户
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// 创建同步信号消息
    pub fn sync(payload: &SyncPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Sync, serde_json::to_vec(payload)?))
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Notification, serde_json::to_vec(payload)?))
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
