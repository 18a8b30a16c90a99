use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_domain::{entities::JobMessage, messaging::MessageQueue};
use bookshelf_errors::BookshelfResult;
use tokio::sync::RwLock;
use tracing::debug;

/// 内存消息队列实现
///
/// 适用于嵌入式部署与测试。与RabbitMQ实现保持相同的投递语义：
/// consume取走的消息进入in-flight表，nack(requeue)重新入队并
/// 标记redelivered，从而在测试中还原at-least-once的重投行为。
#[derive(Debug, Default)]
pub struct InMemoryMessageQueue {
    queues: Arc<RwLock<HashMap<String, VecDeque<JobMessage>>>>,
    in_flight: Arc<RwLock<HashMap<String, InFlightMessage>>>,
}

#[derive(Debug, Clone)]
struct InFlightMessage {
    queue: String,
    message: JobMessage,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前等待决定的消息数（测试用）
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.read().await.len()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish_message(&self, queue: &str, message: &JobMessage) -> BookshelfResult<()> {
        let mut queues = self.queues.write().await;
        queues
            .entry(queue.to_string())
            .or_default()
            .push_back(message.clone());
        debug!("消息 {} 已入队: {}", message.id, queue);
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> BookshelfResult<Vec<JobMessage>> {
        let mut queues = self.queues.write().await;
        let Some(pending) = queues.get_mut(queue) else {
            return Ok(vec![]);
        };

        let messages: Vec<JobMessage> = pending.drain(..).collect();
        drop(queues);

        if !messages.is_empty() {
            let mut in_flight = self.in_flight.write().await;
            for message in &messages {
                in_flight.insert(
                    message.id.clone(),
                    InFlightMessage {
                        queue: queue.to_string(),
                        message: message.clone(),
                    },
                );
            }
        }

        Ok(messages)
    }

    async fn ack_message(&self, message_id: &str) -> BookshelfResult<()> {
        if self.in_flight.write().await.remove(message_id).is_none() {
            debug!("确认未知消息: {}", message_id);
        }
        Ok(())
    }

    async fn nack_message(&self, message_id: &str, requeue: bool) -> BookshelfResult<()> {
        let entry = self.in_flight.write().await.remove(message_id);

        match entry {
            Some(entry) if requeue => {
                let mut message = entry.message;
                message.redelivered = true;
                self.queues
                    .write()
                    .await
                    .entry(entry.queue)
                    .or_default()
                    .push_back(message);
                debug!("拒绝消息: {}, 已重新入队", message_id);
            }
            Some(_) => {
                debug!("拒绝消息: {}, 直接丢弃", message_id);
            }
            None => {
                debug!("拒绝未知消息: {}", message_id);
            }
        }
        Ok(())
    }

    async fn create_queue(&self, queue: &str, _durable: bool) -> BookshelfResult<()> {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> BookshelfResult<()> {
        self.queues.write().await.remove(queue);
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> BookshelfResult<u32> {
        let queues = self.queues.read().await;
        Ok(queues.get(queue).map(|q| q.len() as u32).unwrap_or(0))
    }

    async fn purge_queue(&self, queue: &str) -> BookshelfResult<()> {
        if let Some(pending) = self.queues.write().await.get_mut(queue) {
            pending.clear();
        }
        Ok(())
    }
}
