use std::path::PathBuf;

use crate::domain::model::catalog::Catalog;
use crate::domain::repository::CatalogRepository;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSONファイルによるCatalogRepository実装。
/// 固定の1ファイルに、BookレコードのJSON配列として保存する。
///
/// 中身が読み解けないファイルは「保存なし」として扱う。フォーマットの
/// バージョン管理や移行は行わない。
pub struct JsonCatalogRepository {
    path: PathBuf,
}

impl JsonCatalogRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogRepository for JsonCatalogRepository {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Option<Catalog>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(catalog) => Ok(Some(catalog)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "stored catalog is unreadable, treating as absent"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(catalog)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::book::{Book, BookDraft};

    fn sample_catalog() -> Catalog {
        Catalog::from_books(vec![
            Book::new(BookDraft {
                title: "1984".into(),
                author: "George Orwell".into(),
                genre: Some("Dystopia".into()),
                year: Some(1949),
                rating: Some(4.8),
            }),
            Book::new(BookDraft {
                title: "The Hobbit".into(),
                author: "J. R. R. Tolkien".into(),
                genre: None,
                year: Some(1937),
                rating: None,
            }),
        ])
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = std::env::temp_dir().join("bookshelf-mcp-test-roundtrip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("catalog.json");

        let repo = JsonCatalogRepository::new(&path);

        // 初回loadはNone
        assert!(repo.load().unwrap().is_none());

        let catalog = sample_catalog();
        repo.save(&catalog).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded, catalog);

        // cleanup
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_content_loads_as_absent() {
        let dir = std::env::temp_dir().join("bookshelf-mcp-test-malformed");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        std::fs::write(&path, "{ not json [").unwrap();

        let repo = JsonCatalogRepository::new(&path);
        assert!(repo.load().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_writes_a_json_array() {
        let dir = std::env::temp_dir().join("bookshelf-mcp-test-format");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("catalog.json");

        let repo = JsonCatalogRepository::new(&path);
        repo.save(&sample_catalog()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["title"], "1984");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
