use async_trait::async_trait;
use bookshelf_domain::{
    entities::{Book, NewBook},
    repositories::BookRepository,
};
use bookshelf_errors::{BookshelfError, BookshelfResult};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

pub struct PostgresBookRepository {
    pool: PgPool,
}

const CREATE_TABLE_STATEMENT: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL DEFAULT '',
    author VARCHAR(255) NOT NULL DEFAULT '',
    cover_url VARCHAR(255)
)
"#;

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 校验books表存在，不存在则创建
    ///
    /// 多个进程可能同时bootstrap：`IF NOT EXISTS` 内部的
    /// duplicate竞态（42P07/23505）视为成功而不是存储错误。
    pub async fn ensure_schema(&self) -> BookshelfResult<()> {
        match sqlx::query(CREATE_TABLE_STATEMENT).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) if Self::is_duplicate_object_error(&e) => {
                debug!("books表已由并发bootstrap创建");
                Ok(())
            }
            Err(e) => Err(BookshelfError::DatabaseOperation(format!(
                "postgres: 创建books表失败: {e}"
            ))),
        }
    }

    fn is_duplicate_object_error(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code == "42P07" || code == "23505" || code == "42710")
            .unwrap_or(false)
    }

    fn row_to_book(row: &sqlx::postgres::PgRow) -> BookshelfResult<Book> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover_url: row.try_get("cover_url")?,
        })
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> BookshelfResult<Vec<Book>> {
        let rows = sqlx::query("SELECT id, title, author, cover_url FROM books ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("postgres: 查询图书列表失败: {e}"))
            })?;

        rows.iter().map(Self::row_to_book).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> BookshelfResult<Book> {
        let row = sqlx::query("SELECT id, title, author, cover_url FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("postgres: 查询图书 {id} 失败: {e}"))
            })?;

        match row {
            Some(row) => Self::row_to_book(&row),
            None => Err(BookshelfError::BookNotFound { id }),
        }
    }

    #[instrument(skip(self, book), fields(title = %book.title))]
    async fn create(&self, book: &NewBook) -> BookshelfResult<i64> {
        let row = sqlx::query("INSERT INTO books (title, author) VALUES ($1, $2) RETURNING id")
            .bind(&book.title)
            .bind(&book.author)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("postgres: 保存图书失败: {e}"))
            })?;

        let id: i64 = row.try_get("id")?;
        debug!("图书已保存, id={id}");
        Ok(id)
    }

    #[instrument(skip(self, book), fields(book_id = %book.id))]
    async fn update(&self, book: &Book) -> BookshelfResult<()> {
        if book.id == 0 {
            return Err(BookshelfError::InvalidBookId { id: book.id });
        }

        let result =
            sqlx::query("UPDATE books SET title = $1, author = $2, cover_url = $3 WHERE id = $4")
                .bind(&book.title)
                .bind(&book.author)
                .bind(&book.cover_url)
                .bind(book.id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    BookshelfError::DatabaseOperation(format!(
                        "postgres: 更新图书 {} 失败: {e}",
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
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BookshelfError::DatabaseOperation(format!("postgres: 删除图书 {id} 失败: {e}"))
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
