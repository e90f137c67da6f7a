//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use bookshelf_mcp::application::service::CatalogService;
use bookshelf_mcp::domain::model::book::{Book, BookDraft};
use bookshelf_mcp::domain::model::catalog::Catalog;
use bookshelf_mcp::domain::model::id::BookId;
use bookshelf_mcp::domain::repository::CatalogRepository;
use bookshelf_mcp::domain::source::BookSource;

// =============================================================================
// InMemoryRepo — テスト用リポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

#[derive(Default)]
struct InMemoryState {
    store: RefCell<Option<String>>,
    saves: RefCell<Vec<String>>,
}

/// ファイルI/O不要のインメモリリポジトリ。write-throughの検証用に
/// save呼び出しの履歴を保持する。cloneは同じ内容を共有する。
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    state: Rc<InMemoryState>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定カタログを保存済みの状態で始める。
    pub fn seeded(catalog: &Catalog) -> Self {
        let repo = Self::new();
        *repo.state.store.borrow_mut() = Some(serde_json::to_string(catalog).unwrap());
        repo
    }

    /// 任意の生テキストを保存済みの状態で始める（破損データ用）。
    pub fn seeded_raw(content: &str) -> Self {
        let repo = Self::new();
        *repo.state.store.borrow_mut() = Some(content.to_string());
        repo
    }

    pub fn save_count(&self) -> usize {
        self.state.saves.borrow().len()
    }

    /// 最後にsaveされたスナップショット。
    pub fn last_saved(&self) -> Option<Catalog> {
        self.state
            .saves
            .borrow()
            .last()
            .map(|json| serde_json::from_str(json).unwrap())
    }
}

impl CatalogRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Catalog>, Self::Error> {
        match self.state.store.borrow().as_deref() {
            Some(json) => match serde_json::from_str(json) {
                Ok(catalog) => Ok(Some(catalog)),
                Err(_) => Err(InMemoryError),
            },
            None => Ok(None),
        }
    }

    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error> {
        let json = serde_json::to_string(catalog).map_err(|_| InMemoryError)?;
        *self.state.store.borrow_mut() = Some(json.clone());
        self.state.saves.borrow_mut().push(json);
        Ok(())
    }
}

// =============================================================================
// StaticSource — 固定データのBookSource
// =============================================================================

/// ネットワーク不要のBookSource。常に同じリスト（のコピー）を返す。
pub struct StaticSource {
    books: Vec<Book>,
}

impl StaticSource {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl BookSource for StaticSource {
    fn generate(&self, count: usize) -> impl Future<Output = Vec<Book>> + Send {
        std::future::ready(self.books.iter().take(count).cloned().collect())
    }
}

// =============================================================================
// TestCatalog — 構造化済みテスト用カタログ作成ヘルパー
// =============================================================================

/// テスト用のカタログ。idを名前で引ける。
pub struct TestCatalog {
    pub catalog: Catalog,
    pub ids: HashMap<&'static str, BookId>,
}

impl TestCatalog {
    /// 標準的なテスト用カタログ:
    /// ```text
    /// 1. 1984 — George Orwell (Dystopia, 1949, 4.8)
    /// 2. Brave New World — Aldous Huxley (Dystopia, 1932, 4.5)
    /// 3. The Hobbit — J. R. R. Tolkien (Fantasy, 1937, rating欠損)
    /// 4. Notes from Underground — Fyodor Dostoevsky (genre/year/rating欠損)
    /// ```
    pub fn standard() -> Self {
        let books = vec![
            Self::book("1984", "George Orwell", Some("Dystopia"), Some(1949), Some(4.8)),
            Self::book(
                "Brave New World",
                "Aldous Huxley",
                Some("Dystopia"),
                Some(1932),
                Some(4.5),
            ),
            Self::book(
                "The Hobbit",
                "J. R. R. Tolkien",
                Some("Fantasy"),
                Some(1937),
                None,
            ),
            Self::book("Notes from Underground", "Fyodor Dostoevsky", None, None, None),
        ];

        let mut ids = HashMap::new();
        ids.insert("orwell", books[0].id());
        ids.insert("huxley", books[1].id());
        ids.insert("tolkien", books[2].id());
        ids.insert("dostoevsky", books[3].id());

        Self {
            catalog: Catalog::from_books(books),
            ids,
        }
    }

    pub fn book(
        title: &str,
        author: &str,
        genre: Option<&str>,
        year: Option<i32>,
        rating: Option<f64>,
    ) -> Book {
        Book::new(BookDraft {
            title: title.into(),
            author: author.into(),
            genre: genre.map(Into::into),
            year,
            rating,
        })
    }

    pub fn draft(title: &str, author: &str) -> BookDraft {
        BookDraft {
            title: title.into(),
            author: author.into(),
            genre: None,
            year: None,
            rating: None,
        }
    }

    /// カタログを保存済みにしたInMemoryRepoでCatalogServiceを返す。
    pub fn service_with_catalog(
        catalog: &Catalog,
    ) -> CatalogService<InMemoryRepo, StaticSource> {
        CatalogService::open(InMemoryRepo::seeded(catalog), StaticSource::empty())
    }
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
#[allow(dead_code)]
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
