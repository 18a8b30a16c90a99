use async_trait::async_trait;
use bookshelf_domain::{
    entities::{Book, NewBook},
    repositories::BookRepository,
};
use bookshelf_errors::{BookshelfError, BookshelfResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

/// SQLite图书仓储，用于嵌入式部署与集成测试
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

const CREATE_TABLE_STATEMENT: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    cover_url TEXT
)
"#;

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建嵌入式SQLite图书仓储，自动初始化数据库
    pub async fn new_embedded(database_path: &str) -> BookshelfResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Creating embedded SQLite book repository at: {}", database_path);

        let connect_options = SqliteConnectOptions::from_str(database_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // `:memory:` 库按连接隔离，连接池必须收敛到单连接
        let max_connections = if database_path.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        let repository = Self { pool };
        repository.ensure_schema().await?;
        Ok(repository)
    }

    /// 校验books表存在，不存在则创建；并发bootstrap的
    /// "already exists" 竞态视为成功
    pub async fn ensure_schema(&self) -> BookshelfResult<()> {
        match sqlx::query(CREATE_TABLE_STATEMENT).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => {
                debug!("books表已由并发bootstrap创建");
                Ok(())
            }
            Err(e) => Err(BookshelfError::DatabaseOperation(format!(
                "sqlite: 创建books表失败: {e}"
            ))),
        }
    }

    fn row_to_book(row: &sqlx::sqlite::SqliteRow) -> BookshelfResult<Book> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover_url: row.try_get("cover_url")?,
        })
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> BookshelfResult<Vec<Book>> {
        let rows = sqlx::query("SELECT id, title, author, cover_url FROM books ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("sqlite: 查询图书列表失败: {e}"))
            })?;

        rows.iter().map(Self::row_to_book).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> BookshelfResult<Book> {
        let row = sqlx::query("SELECT id, title, author, cover_url FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("sqlite: 查询图书 {id} 失败: {e}"))
            })?;

        match row {
            Some(row) => Self::row_to_book(&row),
            None => Err(BookshelfError::BookNotFound { id }),
        }
    }

    #[instrument(skip(self, book), fields(title = %book.title))]
    async fn create(&self, book: &NewBook) -> BookshelfResult<i64> {
        let result = sqlx::query("INSERT INTO books (title, author) VALUES (?, ?)")
            .bind(&book.title)
            .bind(&book.author)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("sqlite: 保存图书失败: {e}"))
            })?;

        let id = result.last_insert_rowid();
        debug!("图书已保存, id={id}");
        Ok(id)
    }

    #[instrument(skip(self, book), fields(book_id = %book.id))]
    async fn update(&self, book: &Book) -> BookshelfResult<()> {
        if book.id == 0 {
            return Err(BookshelfError::InvalidBookId { id: book.id });
        }

        let result =
            sqlx::query("UPDATE books SET title = ?, author = ?, cover_url = ? WHERE id = ?")
                .bind(&book.title)
                .bind(&book.author)
                .bind(&book.cover_url)
                .bind(book.id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    BookshelfError::DatabaseOperation(format!(
                        "sqlite: 更新图书 {} 失败: {e}",
                        book.id
                    ))
                })?;

        if result.rows_affected() == 0 {
            return Err(BookshelfError::BookNotFound { id: book.id });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> BookshelfResult<()> {
        if id == 0 {
            return Err(BookshelfError::InvalidBookId { id });
        }

        // 删除不存在的行按"remove if present"语义视为成功
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("sqlite: 删除图书 {id} 失败: {e}"))
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
