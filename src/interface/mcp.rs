//! MCP Server for bookshelf-mcp
//!
//! MCP Protocol (stdio) <-> application::CatalogService / ExportService
//!
//! 7 tools: list, sort, upsert, remove, reload, export, clear

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::error::AppError;
use crate::application::export::ExportService;
use crate::application::service::{
    BootstrapOutcome, CatalogService, UpsertOutcome, DEFAULT_FETCH_COUNT,
};
use crate::application::view;
use crate::domain::model::book::BookDraft;
use crate::domain::model::catalog::{Catalog, SortField};
use crate::domain::model::id::BookId;
use crate::infra::json_store::JsonCatalogRepository;
use crate::infra::openlibrary::{OpenLibraryProvider, FETCH_LIMIT};

type Service = CatalogService<JsonCatalogRepository, OpenLibraryProvider>;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。store_pathはカタログJSONの保存先。
pub async fn run(store_path: PathBuf) -> anyhow::Result<()> {
    let repo = JsonCatalogRepository::new(store_path);
    let service = CatalogService::open(repo, OpenLibraryProvider::new());

    match service.bootstrap().await {
        Ok(BootstrapOutcome::Restored(n)) => {
            tracing::info!(books = n, "catalog restored from snapshot");
        }
        Ok(BootstrapOutcome::Fetched(n)) => {
            tracing::info!(books = n, "catalog seeded from Open Library");
        }
        Err(e) => {
            tracing::warn!(error = %e, "bootstrap failed, starting with an empty catalog");
        }
    }

    let server = BookshelfServer::new(service);
    let running = server.serve(stdio()).await?;
    running.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct BookshelfServer {
    service: Arc<Service>,
    tool_router: ToolRouter<Self>,
}

impl BookshelfServer {
    fn new(service: Service) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    fn to_mcp_error(e: AppError) -> McpError {
        match e {
            AppError::Validation(_) | AppError::EmptyCatalog => {
                McpError::invalid_params(format!("{e}"), None)
            }
            _ => McpError::internal_error(format!("{e}"), None),
        }
    }

    /// 行番号 / Full UUID / short prefix / タイトル部分一致 → BookId。
    ///
    /// 優先順位:
    /// 1. 行番号 (e.g. "3") — `list` 出力と対応
    /// 2. Full UUID
    /// 3. 短縮UUIDプレフィックス
    /// 4. タイトル部分一致（フォールバック）
    fn resolve_book(&self, s: &str) -> Result<BookId, McpError> {
        let catalog = self.service.snapshot().map_err(Self::to_mcp_error)?;

        // 1. 行番号
        if is_row_number(s) {
            let n: usize = s
                .parse()
                .map_err(|_| McpError::invalid_params(format!("Invalid row number: '{s}'"), None))?;
            if n == 0 || n > catalog.len() {
                return Err(McpError::invalid_params(
                    format!(
                        "Row {} out of range (1-{}). Run `list` to see current rows.",
                        n,
                        catalog.len()
                    ),
                    None,
                ));
            }
            return Ok(catalog.books()[n - 1].id());
        }

        // 2. Full UUIDとして解析
        if let Ok(id) = parse_book_id(s) {
            return Ok(id);
        }

        // 3. 短縮プレフィックスでカタログ内を検索
        let id_matches: Vec<BookId> = catalog
            .books()
            .iter()
            .map(|b| b.id())
            .filter(|id| id.to_string().starts_with(s))
            .collect();
        match id_matches.len() {
            1 => return Ok(id_matches[0]),
            n if n > 1 => {
                return Err(McpError::invalid_params(
                    format!("Ambiguous ID prefix: '{s}' matches {n} books"),
                    None,
                ))
            }
            _ => {}
        }

        // 4. タイトル部分一致（case-insensitive, フォールバック）
        let query = s.to_lowercase();
        let title_matches: Vec<(usize, BookId, &str)> = catalog
            .books()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.title().to_lowercase().contains(&query))
            .map(|(i, b)| (i + 1, b.id(), b.title()))
            .collect();
        match title_matches.len() {
            0 => Err(McpError::invalid_params(
                format!("No book found matching: '{s}'"),
                None,
            )),
            1 => Ok(title_matches[0].1),
            n => Err(McpError::invalid_params(
                format!(
                    "Ambiguous title match: '{s}' matches {n} books: {}",
                    title_matches
                        .iter()
                        .map(|(row, _, title)| format!("'{title}' (row {row})"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                None,
            )),
        }
    }

    fn render_catalog(catalog: &Catalog) -> String {
        view::format_table(&view::project(catalog, ""))
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookshelfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bookshelf-mcp".to_string(),
                title: Some("Bookshelf MCP — Personal Book Catalog".to_string()),
                description: Some(
                    "Searchable, sortable book catalog persisted to a JSON file. \
                     Seed it from Open Library with `reload`."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Manage a personal book catalog.\n\
                 \n\
                 Intended flow: `list` shows numbered rows (optionally filtered by a search \
                 query), `upsert` adds a new book or edits an existing one, `remove` deletes \
                 a row. Books are referenced by row number, id, or title fragment.\n\
                 \n\
                 `reload` replaces the whole catalog with a fresh batch from Open Library, \
                 `export` writes books.json, `clear` empties the catalog. Every change is \
                 saved immediately."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_sort_field(s: &str) -> Result<SortField, McpError> {
    match s {
        "title" => Ok(SortField::Title),
        "author" => Ok(SortField::Author),
        "genre" => Ok(SortField::Genre),
        "year" => Ok(SortField::Year),
        "rating" => Ok(SortField::Rating),
        other => Err(McpError::invalid_params(
            format!("Unknown sort field: '{other}'. Use: title, author, genre, year, rating"),
            None,
        )),
    }
}

fn parse_book_id(s: &str) -> Result<BookId, McpError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| McpError::invalid_params(format!("Invalid book id: '{s}'"), None))
}

/// 行番号かどうか判定（純粋な数字列）
fn is_row_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpListRequest {
    #[schemars(
        description = "Search text. Matches title or author, case-insensitive substring. Omit for all books."
    )]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSortRequest {
    #[schemars(description = "Column to sort by: title, author, genre, year, rating")]
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpUpsertRequest {
    #[schemars(
        description = "Existing book to edit: row number from `list` output, id, or title fragment. Omit to add a new book."
    )]
    pub book: Option<String>,
    #[schemars(description = "Book title (required)")]
    pub title: String,
    #[schemars(description = "Author name(s), comma-separated (required)")]
    pub author: String,
    #[schemars(description = "Optional genre tag")]
    pub genre: Option<String>,
    #[schemars(description = "Optional publication year")]
    pub year: Option<i32>,
    #[schemars(description = "Optional rating from 0.0 to 5.0")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpRemoveRequest {
    #[schemars(
        description = "Book to delete: row number from `list` output, id, or title fragment"
    )]
    pub book: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpReloadRequest {
    #[schemars(description = "How many books to import (default: 8, max: 50)")]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpExportRequest {
    #[schemars(description = "Output directory path (default: current directory)")]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpClearRequest {}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookshelfServer {
    #[tool(
        name = "list",
        description = "Show the catalog as numbered rows, optionally filtered by a search query over title and author. Use the row numbers to reference books in `upsert` and `remove`.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn list(
        &self,
        Parameters(req): Parameters<McpListRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query = req.query.unwrap_or_default();
        let view = self
            .service
            .search(&query)
            .map_err(Self::to_mcp_error)?;

        if view.total == 0 {
            return Ok(CallToolResult::success(vec![Content::text(
                "Catalog is empty. Use `reload` to import books from Open Library \
                 or `upsert` to add one.",
            )]));
        }
        if view.matched == 0 {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No books match '{}'. ({} books total)",
                query.trim(),
                view.total
            ))]));
        }

        Ok(CallToolResult::success(vec![Content::text(
            view::format_table(&view),
        )]))
    }

    #[tool(
        name = "sort",
        description = "Reorder the catalog by a column (title, author, genre, year, or rating) and show the result. The order sticks for the session.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn sort(
        &self,
        Parameters(req): Parameters<McpSortRequest>,
    ) -> Result<CallToolResult, McpError> {
        let field = parse_sort_field(&req.field)?;
        let catalog = self.service.sort(field).map_err(Self::to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Sorted by {}.\n\n{}",
            field.as_str(),
            Self::render_catalog(&catalog)
        ))]))
    }

    #[tool(
        name = "upsert",
        description = "Add a new book, or edit an existing one referenced by row number from `list` output, id, or title fragment. Title and author are required; rating must be 0.0-5.0.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn upsert(
        &self,
        Parameters(req): Parameters<McpUpsertRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = req
            .book
            .as_deref()
            .map(|s| self.resolve_book(s))
            .transpose()?;

        let draft = BookDraft {
            title: req.title,
            author: req.author,
            genre: req.genre,
            year: req.year,
            rating: req.rating,
        };

        let outcome = self
            .service
            .upsert(id, draft)
            .map_err(Self::to_mcp_error)?;

        let message = match outcome {
            UpsertOutcome::Added(id) | UpsertOutcome::Updated(id) => {
                let catalog = self.service.snapshot().map_err(Self::to_mcp_error)?;
                let title = catalog.get(id).map(|b| b.title().to_string()).unwrap_or_default();
                let verb = match outcome {
                    UpsertOutcome::Added(_) => "Added",
                    _ => "Updated",
                };
                format!("{}: {} [{}]", verb, title, id.short())
            }
            UpsertOutcome::Unchanged => {
                "No book with that id remains in the catalog. Nothing changed.".to_string()
            }
        };

        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    #[tool(
        name = "remove",
        description = "Delete one book, referenced by row number from `list` output, id, or title fragment.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn remove(
        &self,
        Parameters(req): Parameters<McpRemoveRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = self.resolve_book(&req.book)?;

        // 削除前にタイトルを取得
        let catalog = self.service.snapshot().map_err(Self::to_mcp_error)?;
        let title = catalog
            .get(id)
            .map(|b| b.title().to_string())
            .unwrap_or_default();

        let removed = self.service.remove(id).map_err(Self::to_mcp_error)?;
        let message = if removed {
            format!("Removed: {} [{}]", title, id.short())
        } else {
            "Book already absent. Catalog unchanged.".to_string()
        };

        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    #[tool(
        name = "reload",
        description = "Replace the entire catalog with a fresh batch of books from Open Library (random subject). Falls back to a small demo catalog when the API is unreachable.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn reload(
        &self,
        Parameters(req): Parameters<McpReloadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let count = req.count.unwrap_or(DEFAULT_FETCH_COUNT);
        if count == 0 || count > FETCH_LIMIT {
            return Err(McpError::invalid_params(
                format!("count must be between 1 and {FETCH_LIMIT}"),
                None,
            ));
        }

        let catalog = self.service.reload(count).await.map_err(Self::to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Catalog replaced: {} books.\n\n{}",
            catalog.len(),
            Self::render_catalog(&catalog)
        ))]))
    }

    #[tool(
        name = "export",
        description = "Write the whole catalog to books.json in the given directory (default: current directory). Fails when the catalog is empty.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn export(
        &self,
        Parameters(req): Parameters<McpExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output_dir = req
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let catalog = self.service.snapshot().map_err(Self::to_mcp_error)?;
        let path = ExportService::export(&catalog, &output_dir).map_err(Self::to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Exported {} books to: {}",
            catalog.len(),
            path.display()
        ))]))
    }

    #[tool(
        name = "clear",
        description = "Delete every book in the catalog. The empty catalog is saved immediately.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn clear(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpClearRequest>,
    ) -> Result<CallToolResult, McpError> {
        let removed = self.service.clear().map_err(Self::to_mcp_error)?;

        let message = if removed == 0 {
            "Catalog was already empty.".to_string()
        } else {
            format!("Removed all {removed} books.")
        };

        Ok(CallToolResult::success(vec![Content::text(message)]))
    }
}

// =============================================================================
// Tests
// =============================================================================
