use bookshelf_domain::entities::Book;

/// 富化后的标题前缀
pub const UPDATED_TITLE_PREFIX: &str = "Updated ";

/// 对图书记录应用元数据富化
///
/// 返回记录是否发生了变化。at-least-once投递下同一任务可能被
/// 重复处理，因此富化必须幂等：前缀只在缺失时补齐，已富化的
/// 记录原样返回false，重投不会把前缀叠加上去。
pub fn apply_update(book: &mut Book) -> bool {
    if book.title.starts_with(UPDATED_TITLE_PREFIX) {
        return false;
    }
    book.title = format!("{UPDATED_TITLE_PREFIX}{}", book.title);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_title(title: &str) -> Book {
        Book {
            id: 1,
            title: title.to_string(),
            author: "A".to_string(),
            cover_url: None,
        }
    }

    #[test]
    fn test_apply_update_prefixes_title() {
        let mut book = book_with_title("Go");
        assert!(apply_update(&mut book));
        assert_eq!(book.title, "Updated Go");
    }

    #[test]
    fn test_apply_update_is_idempotent() {
        let mut book = book_with_title("Go");
        assert!(apply_update(&mut book));
        // 第二次应用不再改写
        assert!(!apply_update(&mut book));
        assert_eq!(book.title, "Updated Go");
    }

    #[test]
    fn test_apply_update_empty_title() {
        let mut book = book_with_title("");
        assert!(apply_update(&mut book));
        assert_eq!(book.title, "Updated ");
        assert!(!apply_update(&mut book));
        assert_eq!(book.title, "Updated ");
    }

    #[test]
    fn test_apply_update_preserves_other_fields() {
        let mut book = book_with_title("Go");
        book.cover_url = Some("https://example.com/go.png".to_string());
        apply_update(&mut book);
        assert_eq!(book.author, "A");
        assert_eq!(book.cover_url.as_deref(), Some("https://example.com/go.png"));
    }
}
