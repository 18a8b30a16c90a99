use std::sync::Arc;
use std::time::Duration;

use bookshelf_config::DatabaseConfig;
use bookshelf_domain::repositories::BookRepository;
use bookshelf_errors::{BookshelfError, BookshelfResult};
use tracing::info;

use super::postgres::PostgresBookRepository;
use super::sqlite::SqliteBookRepository;

/// 按URL scheme识别数据库类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else {
            DatabaseType::SQLite
        }
    }
}

/// 数据库连接池
pub enum DatabasePool {
    PostgreSQL(sqlx::PgPool),
    SQLite(sqlx::SqlitePool),
}

impl DatabasePool {
    /// 根据URL自动选择后端并建立连接池
    pub async fn new(config: &DatabaseConfig) -> BookshelfResult<Self> {
        let db_type = DatabaseType::from_url(&config.url);

        match db_type {
            DatabaseType::PostgreSQL => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
                    .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
                    .connect(&config.url)
                    .await
                    .map_err(BookshelfError::Database)?;
                Ok(DatabasePool::PostgreSQL(pool))
            }
            DatabaseType::SQLite => {
                use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
                use std::str::FromStr;

                let connect_options = SqliteConnectOptions::from_str(&config.url)
                    .map_err(BookshelfError::Database)?
                    .create_if_missing(true)
                    .foreign_keys(true);

                // `:memory:` 库按连接隔离，连接池必须收敛到单连接
                let max_connections = if config.url.contains(":memory:") {
                    1
                } else {
                    config.max_connections
                };

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
                    .connect_with(connect_options)
                    .await
                    .map_err(BookshelfError::Database)?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        match self {
            DatabasePool::PostgreSQL(_) => DatabaseType::PostgreSQL,
            DatabasePool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    pub async fn health_check(&self) -> BookshelfResult<()> {
        match self {
            DatabasePool::PostgreSQL(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(BookshelfError::Database)?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(BookshelfError::Database)?;
            }
        }
        Ok(())
    }
}

/// 建立连接池、校验schema并返回图书仓储
///
/// 首次使用前的schema bootstrap在这里完成；启动失败直接向上
/// 传播，由进程以非零状态退出。
pub async fn create_book_repository(
    config: &DatabaseConfig,
) -> BookshelfResult<Arc<dyn BookRepository>> {
    let pool = DatabasePool::new(config).await?;
    pool.health_check().await?;

    match pool {
        DatabasePool::PostgreSQL(pool) => {
            info!("使用PostgreSQL图书存储");
            let repository = PostgresBookRepository::new(pool);
            repository.ensure_schema().await?;
            Ok(Arc::new(repository))
        }
        DatabasePool::SQLite(pool) => {
            info!("使用SQLite图书存储");
            let repository = SqliteBookRepository::new(pool);
            repository.ensure_schema().await?;
            Ok(Arc::new(repository))
        }
    }
}
