use std::path::{Path, PathBuf};

use crate::domain::model::catalog::Catalog;

use super::error::AppError;

/// エクスポートの固定ファイル名
pub const EXPORT_FILENAME: &str = "books.json";

/// カタログ → ダウンロード成果物（JSONファイル）への変換。
/// カタログ状態には一切触れない。
pub struct ExportService;

impl ExportService {
    /// 全レコードをインデント付きJSON配列にする。空カタログはエラー。
    pub fn render_json(catalog: &Catalog) -> Result<String, AppError> {
        if catalog.is_empty() {
            return Err(AppError::EmptyCatalog);
        }
        serde_json::to_string_pretty(catalog.books()).map_err(|e| AppError::Storage(Box::new(e)))
    }

    /// output_dirに books.json を書き出し、そのパスを返す。
    /// 空カタログの場合はファイルを作らない。
    pub fn export(catalog: &Catalog, output_dir: &Path) -> Result<PathBuf, AppError> {
        let content = Self::render_json(catalog)?;

        let path = output_dir.join(EXPORT_FILENAME);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(AppError::ExportIo)?;
        }
        std::fs::write(&path, content).map_err(AppError::ExportIo)?;
        Ok(path)
    }
}
