use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookshelfError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("图书未找到: {id}")]
    BookNotFound { id: i64 },
    #[error("图书ID无效: {id}")]
    InvalidBookId { id: i64 },
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("消息解码错误: {0}")]
    MessageDecode(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type BookshelfResult<T> = Result<T, BookshelfError>;

impl BookshelfError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn book_not_found(id: i64) -> Self {
        Self::BookNotFound { id }
    }
    pub fn invalid_book_id(id: i64) -> Self {
        Self::InvalidBookId { id }
    }
    pub fn message_queue_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn decode_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageDecode(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 瞬时错误，交给Broker重新投递后可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookshelfError::Database(_)
                | BookshelfError::DatabaseOperation(_)
                | BookshelfError::MessageQueue(_)
                | BookshelfError::BookNotFound { .. }
        )
    }

    /// 永久错误，任何重试都不会成功
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BookshelfError::InvalidBookId { .. } | BookshelfError::MessageDecode(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BookshelfError::Internal(_) | BookshelfError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for BookshelfError {
    fn from(err: serde_json::Error) -> Self {
        BookshelfError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for BookshelfError {
    fn from(err: anyhow::Error) -> Self {
        BookshelfError::Internal(err.to_string())
    }
}
