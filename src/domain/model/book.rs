use serde::{Deserialize, Serialize};

use super::id::BookId;
use crate::domain::error::ValidationError;

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 5.0;

/// 登録・編集フォーム入力。idは持たず、採番はカタログ側で行う。
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

impl BookDraft {
    /// 前後空白を除去して必須項目とレーティング範囲を検証する。
    /// 空になったgenreはNoneに正規化する。失格時はカタログを変更させない。
    pub fn normalize(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_string();
        let author = self.author.trim().to_string();

        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if author.is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        if let Some(rating) = self.rating {
            if !(RATING_MIN..=RATING_MAX).contains(&rating) {
                return Err(ValidationError::RatingOutOfRange(rating));
            }
        }

        let genre = self
            .genre
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());

        Ok(Self {
            title,
            author,
            genre,
            year: self.year,
            rating: self.rating,
        })
    }
}

/// 蔵書1冊分のレコード。idは生成時に採番され、以後不変。
/// フィールドの変更はカタログ経由でのみ行う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    genre: Option<String>,
    year: Option<i32>,
    rating: Option<f64>,
}

impl Book {
    /// 新しいIDを採番してレコードを作る。draftは正規化済みであること。
    pub fn new(draft: BookDraft) -> Self {
        Self {
            id: BookId::new(),
            title: draft.title,
            author: draft.author,
            genre: draft.genre,
            year: draft.year,
            rating: draft.rating,
        }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    // --- 内部操作（Catalog経由でのみ呼ばれる） ---

    /// 編集可能フィールドを一括で置き換える。idは保持する。
    pub(crate) fn apply(&mut self, draft: BookDraft) {
        self.title = draft.title;
        self.author = draft.author;
        self.genre = draft.genre;
        self.year = draft.year;
        self.rating = draft.rating;
    }
}
