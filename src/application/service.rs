use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::model::book::{Book, BookDraft};
use crate::domain::model::catalog::{Catalog, SortField};
use crate::domain::model::id::BookId;
use crate::domain::repository::CatalogRepository;
use crate::domain::source::BookSource;

use super::error::AppError;
use super::view::{self, TableView};

/// 初期取り込みとreloadの既定冊数。
pub const DEFAULT_FETCH_COUNT: usize = 8;

/// upsertの結果。通知メッセージの組み立て用に区別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added(BookId),
    Updated(BookId),
    /// 指定idのレコードが既に存在しない（無言のno-op）
    Unchanged,
}

/// 起動時初期化の結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// 保存済みスナップショットを復元した（冊数）
    Restored(usize),
    /// スナップショットが無く、Providerから取得した（冊数）
    Fetched(usize),
}

/// カタログ操作のユースケース層。
///
/// セッション中のカタログ本体をメモリ上に保持し、データを変更する操作の
/// たびに全体を永続化する（write-through）。並べ替えは変更に数えない。
pub struct CatalogService<R: CatalogRepository, S: BookSource> {
    repo: R,
    source: S,
    catalog: RwLock<Catalog>,
    restored: bool,
}

impl<R: CatalogRepository, S: BookSource> CatalogService<R, S> {
    /// スナップショットを復元してサービスを作る。読めないスナップショットは
    /// 「保存なし」として扱い、空のカタログで開始する。
    pub fn open(repo: R, source: S) -> Self {
        let (catalog, restored) = match repo.load() {
            Ok(Some(catalog)) => (catalog, true),
            Ok(None) => (Catalog::new(), false),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable catalog snapshot");
                (Catalog::new(), false)
            }
        };

        Self {
            repo,
            source,
            catalog: RwLock::new(catalog),
            restored,
        }
    }

    /// 起動時の初期化。復元済みならそのまま、無ければProviderから取得する。
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome, AppError> {
        if self.restored {
            return Ok(BootstrapOutcome::Restored(self.read()?.len()));
        }
        let catalog = self.reload(DEFAULT_FETCH_COUNT).await?;
        Ok(BootstrapOutcome::Fetched(catalog.len()))
    }

    /// カタログ全体をProviderの結果で置き換えて永続化する。
    /// 取得失敗時はProvider側のフォールバックがそのまま入る。
    ///
    /// ロックはfetch完了後にのみ取る。fetch中の読み取りは直前の状態を見る。
    pub async fn reload(&self, count: usize) -> Result<Catalog, AppError> {
        let books = self.source.generate(count).await;

        let mut catalog = self.write()?;
        catalog.replace_all(books);
        self.persist(&catalog)?;
        Ok(catalog.clone())
    }

    /// 登録または編集。検証に失格した場合はカタログも永続化も変更しない。
    /// idありで該当レコードが消えている場合は無言のno-op。
    pub fn upsert(&self, id: Option<BookId>, draft: BookDraft) -> Result<UpsertOutcome, AppError> {
        let draft = draft.normalize()?;

        let mut catalog = self.write()?;
        let outcome = match id {
            Some(id) if catalog.update(id, draft.clone()) => UpsertOutcome::Updated(id),
            Some(_) => UpsertOutcome::Unchanged,
            None => {
                let book = Book::new(draft);
                let id = book.id();
                catalog.push(book);
                UpsertOutcome::Added(id)
            }
        };
        self.persist(&catalog)?;
        Ok(outcome)
    }

    /// idのレコードを削除する。居なければno-op。どちらでも永続化する。
    pub fn remove(&self, id: BookId) -> Result<bool, AppError> {
        let mut catalog = self.write()?;
        let removed = catalog.remove(id);
        self.persist(&catalog)?;
        Ok(removed)
    }

    /// カタログを無条件に空にする。削除した冊数を返す。
    pub fn clear(&self) -> Result<usize, AppError> {
        let mut catalog = self.write()?;
        let removed = catalog.len();
        catalog.clear();
        self.persist(&catalog)?;
        Ok(removed)
    }

    /// その場で並べ替える。データ自体は変わらないため永続化はしない。
    /// 次のデータ変更が現在の並び順ごと保存する。
    pub fn sort(&self, field: SortField) -> Result<Catalog, AppError> {
        let mut catalog = self.write()?;
        catalog.sort_by(field);
        Ok(catalog.clone())
    }

    /// 表示用の検索。読み取り専用で、カタログも保存内容も変更しない。
    pub fn search(&self, query: &str) -> Result<TableView, AppError> {
        let catalog = self.read()?;
        Ok(view::project(&catalog, query))
    }

    /// 現在のカタログの複製。
    pub fn snapshot(&self) -> Result<Catalog, AppError> {
        Ok(self.read()?.clone())
    }

    // --- private ---

    fn read(&self) -> Result<RwLockReadGuard<'_, Catalog>, AppError> {
        self.catalog.read().map_err(|_| AppError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Catalog>, AppError> {
        self.catalog.write().map_err(|_| AppError::LockPoisoned)
    }

    fn persist(&self, catalog: &Catalog) -> Result<(), AppError> {
        self.repo
            .save(catalog)
            .map_err(|e| AppError::Storage(Box::new(e)))
    }
}
