use async_trait::async_trait;

use crate::entities::JobMessage;
use bookshelf_errors::BookshelfResult;

/// 消息队列抽象接口
///
/// 投递语义为at-least-once：consume取走的消息处于in-flight状态，
/// 直到按消息ID ack或nack；进程崩溃时由Broker的租约超时重投。
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// 发布消息到指定队列
    async fn publish_message(&self, queue: &str, message: &JobMessage) -> BookshelfResult<()>;

    /// 从指定队列取出当前可用的消息（非阻塞，没有消息时返回空）
    async fn consume_messages(&self, queue: &str) -> BookshelfResult<Vec<JobMessage>>;

    /// 确认消息处理完成，不再重投
    async fn ack_message(&self, message_id: &str) -> BookshelfResult<()>;

    /// 拒绝消息，requeue为true时重新入队等待重投
    async fn nack_message(&self, message_id: &str, requeue: bool) -> BookshelfResult<()>;

    /// 创建队列（幂等，已存在视为成功）
    async fn create_queue(&self, queue: &str, durable: bool) -> BookshelfResult<()>;

    /// 删除队列
    async fn delete_queue(&self, queue: &str) -> BookshelfResult<()>;

    /// 获取队列中的消息数量
    async fn get_queue_size(&self, queue: &str) -> BookshelfResult<u32>;

    /// 清空队列
    async fn purge_queue(&self, queue: &str) -> BookshelfResult<()>;
}
