//! Test data builders.

use bookshelf_domain::entities::Book;

/// Builder for `Book` instances in tests.
#[derive(Debug, Clone)]
pub struct BookBuilder {
    id: i64,
    title: String,
    author: String,
    cover_url: Option<String>,
}

impl Default for BookBuilder {
    fn default() -> Self {
        Self {
            id: 1,
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            cover_url: None,
        }
    }
}

impl BookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_author<S: Into<String>>(mut self, author: S) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_cover_url<S: Into<String>>(mut self, cover_url: S) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }

    pub fn build(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            cover_url: self.cover_url,
        }
    }
}
