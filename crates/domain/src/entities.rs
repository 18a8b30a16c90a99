use std::fmt;

use bookshelf_errors::{BookshelfError, BookshelfResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 图书记录
///
/// `id == 0` 表示尚未由存储分配ID，这样的记录不允许作为
/// update/delete 的目标。`cover_url` 由外部上传服务写入，
/// Worker更新时原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
}

impl Book {
    pub fn has_assigned_id(&self) -> bool {
        self.id != 0
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} => Title: {}, Author: {}, CoverURL: {}",
            self.id,
            self.title,
            self.author,
            self.cover_url.as_deref().unwrap_or("")
        )
    }
}

/// 创建图书的候选数据，ID由存储分配
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

impl NewBook {
    pub fn new<T: Into<String>, A: Into<String>>(title: T, author: A) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }
}

/// 队列中的一条富化任务
///
/// 线上格式约定：消息体就是单个图书ID的JSON编码（例如 `42`），
/// 不携带信封。`id` 走Broker的消息属性（AMQP message_id），
/// 仅用于ack/nack的投递跟踪。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub id: String,
    pub payload: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,
    pub redelivered: bool,
}

impl JobMessage {
    /// 构造指定图书的富化任务
    pub fn enrich_book(book_id: i64) -> Self {
        // i64的JSON编码不会失败
        let payload = serde_json::to_vec(&book_id).unwrap_or_default();
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            enqueued_at: Utc::now(),
            redelivered: false,
        }
    }

    /// 从原始消息体构造（消费侧使用）
    pub fn from_payload(id: String, payload: Vec<u8>, redelivered: bool) -> Self {
        Self {
            id,
            payload,
            enqueued_at: Utc::now(),
            redelivered,
        }
    }

    /// 解码消息体中的图书ID
    ///
    /// 解码失败意味着毒消息：重投多少次都不会成功。
    pub fn book_id(&self) -> BookshelfResult<i64> {
        serde_json::from_slice::<i64>(&self.payload).map_err(|e| {
            BookshelfError::MessageDecode(format!(
                "消息体不是合法的图书ID JSON: {e}"
            ))
        })
    }
}
