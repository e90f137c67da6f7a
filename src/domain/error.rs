#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("author must not be empty")]
    EmptyAuthor,

    #[error("rating {0} out of range (0.0-5.0)")]
    RatingOutOfRange(f64),
}
