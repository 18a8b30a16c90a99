use std::sync::Arc;

use bookshelf_config::{MessageQueueConfig, MessageQueueType};
use bookshelf_domain::messaging::MessageQueue;
use bookshelf_errors::BookshelfResult;
use tracing::{debug, info};

use crate::{InMemoryMessageQueue, RabbitMQMessageQueue};

pub struct MessageQueueFactory;

impl MessageQueueFactory {
    pub async fn create(
        config: &MessageQueueConfig,
    ) -> BookshelfResult<Arc<dyn MessageQueue>> {
        debug!("Creating message queue with type: {:?}", config.r#type);

        match config.r#type {
            MessageQueueType::Rabbitmq => {
                info!("Initializing RabbitMQ message queue");
                let rabbitmq = RabbitMQMessageQueue::new(config.clone()).await?;
                Ok(Arc::new(rabbitmq))
            }
            MessageQueueType::InMemory => {
                info!("Initializing in-memory message queue");
                Ok(Arc::new(InMemoryMessageQueue::new()))
            }
        }
    }
}
