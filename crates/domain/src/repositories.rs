//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;

use crate::entities::{Book, NewBook};
use bookshelf_errors::BookshelfResult;

/// 图书仓储抽象
///
/// 所有方法都必须在并发调用下安全；连接失败映射为
/// `Database`/`DatabaseOperation` 错误。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 按标题升序返回全部图书；空表返回空列表而不是错误
    async fn list(&self) -> BookshelfResult<Vec<Book>>;

    /// 按ID查询，不存在返回 `BookNotFound`
    async fn get(&self, id: i64) -> BookshelfResult<Book>;

    /// 保存新图书并返回分配的ID（对后续get立即可见）
    async fn create(&self, book: &NewBook) -> BookshelfResult<i64>;

    /// 更新已分配ID的记录
    ///
    /// `id == 0` 返回 `InvalidBookId`（不触达存储）；
    /// 行不存在返回 `BookNotFound`。同一负载重复调用是幂等的。
    async fn update(&self, book: &Book) -> BookshelfResult<()>;

    /// 按ID删除；`id == 0` 返回 `InvalidBookId`，删除不存在的行是no-op
    async fn delete(&self, id: i64) -> BookshelfResult<()>;

    /// 释放底层连接，仅在停机时调用一次
    async fn close(&self);
}
