use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_config::MessageQueueConfig;
use bookshelf_domain::{entities::JobMessage, messaging::MessageQueue};
use bookshelf_errors::{BookshelfError, BookshelfResult};
use lapin::{
    options::*,
    types::{FieldTable, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties, Queue,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// RabbitMQ消息队列实现
///
/// consume取走的投递记录在pending表（消息ID -> delivery_tag），
/// ack/nack据此对Broker发出真正的basic_ack/basic_nack，消息在
/// 决定之前保持in-flight，进程崩溃时由Broker重投。
pub struct RabbitMQMessageQueue {
    connection: Connection,
    channel: Arc<Mutex<Channel>>,
    pending: Arc<Mutex<HashMap<String, u64>>>,
    config: MessageQueueConfig,
}

impl RabbitMQMessageQueue {
    /// 创建新的RabbitMQ消息队列实例
    pub async fn new(config: MessageQueueConfig) -> BookshelfResult<Self> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("创建通道失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", config.url);

        let queue = Self {
            connection,
            channel: Arc::new(Mutex::new(channel)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            config,
        };

        // 初始化任务队列
        queue.initialize_queues().await?;

        Ok(queue)
    }

    /// 声明启动所需的队列（幂等，已存在视为成功）
    async fn initialize_queues(&self) -> BookshelfResult<()> {
        let channel = self.channel.lock().await;
        self.declare_queue(&channel, &self.config.job_queue, true)
            .await?;
        info!("队列 {} 初始化完成", self.config.job_queue);
        Ok(())
    }

    async fn declare_queue(
        &self,
        channel: &Channel,
        queue_name: &str,
        durable: bool,
    ) -> BookshelfResult<Queue> {
        let queue = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                BookshelfError::MessageQueue(format!("声明队列 {queue_name} 失败: {e}"))
            })?;

        debug!("队列 {} 声明成功", queue_name);
        Ok(queue)
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭连接
    pub async fn close(&self) -> BookshelfResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for RabbitMQMessageQueue {
    /// 发布消息到指定队列
    ///
    /// 消息体就是任务负载本身（图书ID的JSON编码）；信封ID走
    /// AMQP的message_id属性，保持线上格式为裸JSON整数。
    async fn publish_message(&self, queue: &str, message: &JobMessage) -> BookshelfResult<()> {
        let channel = self.channel.lock().await;

        let properties = BasicProperties::default()
            .with_message_id(ShortString::from(message.id.clone()))
            .with_delivery_mode(2); // 2 = persistent

        let confirm = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &message.payload,
                properties,
            )
            .await
            .map_err(|e| {
                BookshelfError::MessageQueue(format!("发布消息到队列 {queue} 失败: {e}"))
            })?;

        confirm
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("消息发布确认失败: {e}")))?;

        debug!("消息 {} 已发布到队列: {}", message.id, queue);
        Ok(())
    }

    /// 从指定队列取出当前可用的消息
    ///
    /// 最多取consume_batch_size条；取走的投递登记到pending表，
    /// 等待ack/nack决定。
    async fn consume_messages(&self, queue: &str) -> BookshelfResult<Vec<JobMessage>> {
        let channel = self.channel.lock().await;
        let mut messages = Vec::new();

        for _ in 0..self.config.consume_batch_size {
            let get_result = channel.basic_get(queue, BasicGetOptions::default()).await;

            match get_result {
                Ok(Some(delivery)) => {
                    let message_id = delivery
                        .properties
                        .message_id()
                        .as_ref()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_else(|| delivery.delivery_tag.to_string());

                    self.pending
                        .lock()
                        .await
                        .insert(message_id.clone(), delivery.delivery_tag);

                    messages.push(JobMessage::from_payload(
                        message_id,
                        delivery.data.clone(),
                        delivery.redelivered,
                    ));
                }
                Ok(None) => break,
                Err(e) => {
                    // 队列不存在时返回已取到的消息而不是错误
                    let error_msg = e.to_string();
                    if error_msg.contains("NOT_FOUND") || error_msg.contains("404") {
                        debug!("队列 {} 不存在，返回空结果", queue);
                        break;
                    }
                    return Err(BookshelfError::MessageQueue(format!(
                        "从队列 {queue} 获取消息失败: {e}"
                    )));
                }
            }
        }

        Ok(messages)
    }

    /// 确认消息处理完成
    async fn ack_message(&self, message_id: &str) -> BookshelfResult<()> {
        let delivery_tag = self.pending.lock().await.remove(message_id);

        match delivery_tag {
            Some(tag) => {
                let channel = self.channel.lock().await;
                channel
                    .basic_ack(tag, BasicAckOptions::default())
                    .await
                    .map_err(|e| {
                        BookshelfError::MessageQueue(format!("确认消息 {message_id} 失败: {e}"))
                    })?;
                debug!("确认消息: {}", message_id);
            }
            None => {
                // 重复ack在at-least-once语义下无害
                debug!("确认未知消息: {}", message_id);
            }
        }
        Ok(())
    }

    /// 拒绝消息，requeue为true时重新入队
    async fn nack_message(&self, message_id: &str, requeue: bool) -> BookshelfResult<()> {
        let delivery_tag = self.pending.lock().await.remove(message_id);

        match delivery_tag {
            Some(tag) => {
                let channel = self.channel.lock().await;
                channel
                    .basic_nack(
                        tag,
                        BasicNackOptions {
                            requeue,
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| {
                        BookshelfError::MessageQueue(format!("拒绝消息 {message_id} 失败: {e}"))
                    })?;
                debug!("拒绝消息: {}, 重新入队: {}", message_id, requeue);
            }
            None => {
                debug!("拒绝未知消息: {}", message_id);
            }
        }
        Ok(())
    }

    /// 创建队列
    async fn create_queue(&self, queue: &str, durable: bool) -> BookshelfResult<()> {
        let channel = self.channel.lock().await;
        self.declare_queue(&channel, queue, durable).await?;
        Ok(())
    }

    /// 删除队列
    async fn delete_queue(&self, queue: &str) -> BookshelfResult<()> {
        let channel = self.channel.lock().await;
        channel
            .queue_delete(queue, QueueDeleteOptions::default())
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("删除队列 {queue} 失败: {e}")))?;

        debug!("队列 {} 已删除", queue);
        Ok(())
    }

    /// 获取队列中的消息数量
    async fn get_queue_size(&self, queue: &str) -> BookshelfResult<u32> {
        let channel = self.channel.lock().await;
        let queue_info = channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match queue_info {
            Ok(info) => Ok(info.message_count()),
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("NOT_FOUND") || error_msg.contains("404") {
                    debug!("队列 {} 不存在，返回大小为0", queue);
                    Ok(0)
                } else {
                    Err(BookshelfError::MessageQueue(format!(
                        "获取队列 {queue} 信息失败: {e}"
                    )))
                }
            }
        }
    }

    /// 清空队列
    async fn purge_queue(&self, queue: &str) -> BookshelfResult<()> {
        let channel = self.channel.lock().await;
        channel
            .queue_purge(queue, QueuePurgeOptions::default())
            .await
            .map_err(|e| BookshelfError::MessageQueue(format!("清空队列 {queue} 失败: {e}")))?;

        debug!("队列 {} 已清空", queue);
        Ok(())
    }
}
