use crate::domain::model::catalog::{self, Catalog};

/// 欠損フィールドの表示プレースホルダ
pub const EMPTY_FIELD: &str = "-";

/// 表示1行分。全フィールドを表示用文字列に落とした形。
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    /// フィルタ適用前のカタログ内での1始まりの行番号。
    /// 行指定操作（編集・削除）のターゲットになる。
    pub position: usize,
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: String,
    pub rating: String,
}

/// 一覧表示のモデル。matchedは絞り込み後、totalはカタログ全体の冊数。
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub rows: Vec<BookRow>,
    pub matched: usize,
    pub total: usize,
}

/// カタログ + 検索クエリ → 表示行の純粋な射影。状態は変更しない。
pub fn project(catalog: &Catalog, query: &str) -> TableView {
    let query = query.trim().to_lowercase();
    let rows: Vec<BookRow> = catalog
        .books()
        .iter()
        .enumerate()
        .filter(|(_, book)| catalog::matches(book, &query))
        .map(|(i, book)| BookRow {
            position: i + 1,
            id: book.id().to_string(),
            title: book.title().to_string(),
            author: book.author().to_string(),
            genre: book.genre().unwrap_or(EMPTY_FIELD).to_string(),
            year: book
                .year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| EMPTY_FIELD.to_string()),
            rating: book
                .rating()
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| EMPTY_FIELD.to_string()),
        })
        .collect();

    TableView {
        matched: rows.len(),
        total: catalog.len(),
        rows,
    }
}

/// TableViewをMCP応答用の一覧テキストに整形する。
pub fn format_table(view: &TableView) -> String {
    let mut out = format!("# Bookshelf — {} of {} books\n\n", view.matched, view.total);
    for row in &view.rows {
        out.push_str(&format!(
            "{}. {} — {} ({}, {}, rating {}) [{}]\n",
            row.position,
            row.title,
            row.author,
            row.genre,
            row.year,
            row.rating,
            short_id(&row.id),
        ));
    }
    out
}

/// IDの先頭8文字。表示用。
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
