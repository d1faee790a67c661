use thiserror::Error;

/// Crawl failures the per-page retry loop needs to tell apart.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The server redirected the session to its blocked page. Retrying only
    /// makes the block worse, so this aborts the page immediately.
    #[error("redirected to the blocked page: {0}")]
    Blocked(String),

    #[error("cannot find the {0} tab on the product page")]
    ReviewTabMissing(&'static str),

    #[error("review count badge is not a number: {0:?}")]
    BadReviewCount(String),

    #[error("star badge is not a rating: {0:?}")]
    BadRating(String),

    /// A non-final page rendered fewer than the expected 20 items, which
    /// means the review list had not finished loading.
    #[error("page {page} rendered only {got} review items")]
    ShortPage { page: usize, got: usize },
}
