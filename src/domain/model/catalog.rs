use serde::{Deserialize, Serialize};

use super::book::{Book, BookDraft};
use super::id::BookId;

/// ソート対象のカラム。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Author,
    Genre,
    Year,
    Rating,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Genre => "genre",
            SortField::Year => "year",
            SortField::Rating => "rating",
        }
    }
}

/// 蔵書カタログ — 集約ルート。挿入順を保持し、idで一意。
/// 入力検証は行わない。採否の判定はapplication層の責務。
///
/// JSONにはレコードの配列としてそのまま直列化される（永続化・
/// エクスポート共通のフォーマット）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_books(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id() == id)
    }

    pub fn push(&mut self, book: Book) {
        self.books.push(book);
    }

    /// idのレコードが残っていれば内容を置き換えてtrue。
    /// 見つからなければ何もせずfalse。
    pub fn update(&mut self, id: BookId, draft: BookDraft) -> bool {
        match self.books.iter_mut().find(|b| b.id() == id) {
            Some(book) => {
                book.apply(draft);
                true
            }
            None => false,
        }
    }

    /// idのレコードを取り除く。取り除けたらtrue。
    pub fn remove(&mut self, id: BookId) -> bool {
        let before = self.books.len();
        self.books.retain(|b| b.id() != id);
        self.books.len() < before
    }

    pub fn clear(&mut self) {
        self.books.clear();
    }

    pub fn replace_all(&mut self, books: Vec<Book>) {
        self.books = books;
    }

    /// フィールド値の文字列表現の辞書順で安定ソートする。欠損値は空文字列。
    /// 数値フィールドも文字列として比較される（"10" < "9"）。
    pub fn sort_by(&mut self, field: SortField) {
        self.books
            .sort_by(|a, b| sort_key(a, field).cmp(&sort_key(b, field)));
    }

    /// title/authorの部分一致検索（大文字小文字無視）。空クエリは全件。
    /// 読み取り専用で、並び順は保持される。
    pub fn filter(&self, query: &str) -> Vec<&Book> {
        let query = query.trim().to_lowercase();
        self.books.iter().filter(|b| matches(b, &query)).collect()
    }
}

/// 検索クエリ一致判定。queryは小文字化済みであること。
pub(crate) fn matches(book: &Book, query: &str) -> bool {
    book.title().to_lowercase().contains(query) || book.author().to_lowercase().contains(query)
}

fn sort_key(book: &Book, field: SortField) -> String {
    match field {
        SortField::Title => book.title().to_string(),
        SortField::Author => book.author().to_string(),
        SortField::Genre => book.genre().unwrap_or_default().to_string(),
        SortField::Year => book.year().map(|y| y.to_string()).unwrap_or_default(),
        SortField::Rating => book.rating().map(|r| r.to_string()).unwrap_or_default(),
    }
}
