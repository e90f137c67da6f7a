use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::domain::model::book::{Book, BookDraft};
use crate::domain::source::BookSource;

/// 取得時にランダムに1つ選ばれる主題タグ。
pub const SUBJECTS: [&str; 6] = [
    "fantasy",
    "science",
    "history",
    "biography",
    "romance",
    "mystery",
];

/// 1リクエストで取得する候補数。クライアント側でcountまで間引く。
pub const FETCH_LIMIT: usize = 50;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("bookshelf-mcp/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("response has no 'works' list")]
    MissingWorks,
}

/// Open Library subjects APIのレスポンス。必要なフィールドのみ。
#[derive(Debug, Deserialize)]
struct SubjectResponse {
    #[serde(default)]
    works: Option<Vec<SubjectWork>>,
}

#[derive(Debug, Deserialize)]
struct SubjectWork {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<WorkAuthor>,
    #[serde(default)]
    first_publish_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    #[serde(default)]
    name: String,
}

/// Open LibraryからのBookSource実装。
///
/// 取得に失敗した場合は固定のデモカタログを返し、失敗自体は
/// 呼び出し側に伝播させない。
pub struct OpenLibraryProvider {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OpenLibraryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenLibraryProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// テストや別ミラー向けにエンドポイントを差し替える。
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_subject(&self, subject: &str, count: usize) -> Result<Vec<Book>, ProviderError> {
        let url = format!(
            "{}/subjects/{}.json?limit={}",
            self.base_url, subject, FETCH_LIMIT
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(ProviderError::Request)?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let payload: SubjectResponse = response.json().await.map_err(ProviderError::Decode)?;
        let works = payload.works.ok_or(ProviderError::MissingWorks)?;

        Ok(map_works(subject, works, count))
    }
}

impl BookSource for OpenLibraryProvider {
    fn generate(&self, count: usize) -> impl Future<Output = Vec<Book>> + Send {
        async move {
            let subject = pick_subject();
            match self.fetch_subject(subject, count).await {
                Ok(books) => {
                    tracing::debug!(subject, count = books.len(), "fetched books");
                    books
                }
                Err(e) => {
                    tracing::warn!(error = %e, subject, "book fetch failed, using demo catalog");
                    fallback_books()
                }
            }
        }
    }
}

fn pick_subject() -> &'static str {
    let mut rng = rand::thread_rng();
    SUBJECTS[rng.gen_range(0..SUBJECTS.len())]
}

/// 候補works → Bookレコード。タイトルか著者が無いものは捨て、count件に
/// 切り詰める。genreは選ばれた主題タグ、ratingは[3.0, 5.0]の乱数（小数1桁）。
fn map_works(subject: &str, works: Vec<SubjectWork>, count: usize) -> Vec<Book> {
    let mut rng = rand::thread_rng();
    works
        .into_iter()
        .filter(|w| {
            w.title.as_deref().is_some_and(|t| !t.is_empty()) && !w.authors.is_empty()
        })
        .take(count)
        .map(|w| {
            let authors: Vec<String> = w.authors.into_iter().map(|a| a.name).collect();
            Book::new(BookDraft {
                title: w.title.unwrap_or_default(),
                author: authors.join(", "),
                genre: Some(subject.to_string()),
                year: w.first_publish_year,
                rating: Some(random_rating(&mut rng)),
            })
        })
        .collect()
}

fn random_rating(rng: &mut impl Rng) -> f64 {
    (rng.gen_range(3.0f64..5.0) * 10.0).round() / 10.0
}

/// APIが使えないときの固定デモカタログ。
pub fn fallback_books() -> Vec<Book> {
    vec![
        demo("1984", "George Orwell", "Fantasy", 1949, 4.8),
        demo(
            "The Master and Margarita",
            "Mikhail Bulgakov",
            "Classics",
            1967,
            4.9,
        ),
    ]
}

fn demo(title: &str, author: &str, genre: &str, year: i32, rating: f64) -> Book {
    Book::new(BookDraft {
        title: title.into(),
        author: author.into(),
        genre: Some(genre.into()),
        year: Some(year),
        rating: Some(rating),
    })
}
