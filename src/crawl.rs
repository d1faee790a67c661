use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use fantoccini::Locator;
use fantoccini::elements::Element;
use futures::StreamExt;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::cli::SortOrder;
use crate::driver::DriverSession;
use crate::error::CrawlError;
use crate::export::Review;
use crate::site::Site;

pub const ITEMS_PER_PAGE: usize = 20;
pub const MAX_NUM_PAGE: usize = 100;

const MAX_PAGE_ATTEMPTS: usize = 3;

const LIST_SETTLE_POLLS: usize = 5;
const LIST_SETTLE_INTERVAL: Duration = Duration::from_millis(400);

/// chromedriver's default port; the probe session uses it as-is and page
/// workers offset from it by page number so concurrent sessions never collide.
const BASE_PORT: u16 = 9515;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub url: String,
    pub site: Site,
    pub sort_with: SortOrder,
    pub chromedriver_path: String,
    pub max_page: usize,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub name: String,
    pub num_review: usize,
}

/// Derives the page range from the review badge count, one page per 20
/// reviews, capped at 100 pages like the site's own pagination.
pub fn page_count_for(num_review: usize) -> usize {
    (num_review / ITEMS_PER_PAGE + 1).min(MAX_NUM_PAGE)
}

/// Resolves the page limit: the `--max-page` flag wins over the badge count,
/// but the site only paginates to 100 pages either way.
pub fn resolve_max_page(flag: Option<usize>, num_review: usize) -> usize {
    flag.unwrap_or_else(|| page_count_for(num_review)).clamp(1, MAX_NUM_PAGE)
}

/// Opens a probe session and reads the product name and the total review
/// count off the review tab badge.
pub async fn fetch_product_info(config: &CrawlConfig) -> Result<ProductInfo> {
    let session = DriverSession::open(&config.chromedriver_path, BASE_PORT, config.debug).await?;
    match read_product_info(&session, config).await {
        Ok(info) => {
            session.quit().await?;
            Ok(info)
        }
        // Dropping the failed session leaves it open in debug mode.
        Err(e) => Err(e),
    }
}

async fn read_product_info(session: &DriverSession, config: &CrawlConfig) -> Result<ProductInfo> {
    let site = config.site;
    session.goto(&config.url, site).await?;
    let name = session.wait_for(site.product_name_xpath()).await?.text().await?;
    // The review tab has no stable id, so scan the tab bar for its label.
    session.wait_for(site.tabs_xpath()).await?;
    let tabs = session.client().find_all(Locator::XPath(site.tabs_xpath())).await?;
    for tab in tabs {
        if tab.text().await?.contains(site.review_tab_text()) {
            let badge = tab.find(Locator::XPath(site.review_count_xpath())).await?;
            let num_review = parse_count(&badge.text().await?)
                .ok_or_else(|| CrawlError::BadReviewCount(name.clone()))?;
            return Ok(ProductInfo { name, num_review });
        }
    }
    Err(CrawlError::ReviewTabMissing(site.review_tab_text()).into())
}

/// Button-index sequence that walks the pagination widget to `page`.
///
/// The first block (pages 1-10) exposes its page buttons directly at indices
/// 1-10. Every later block is reached through the next-block arrow, which
/// sits at index 11 in the first block and index 12 afterwards because a
/// prev-block arrow appears at index 1. Within such a block the page buttons
/// start at index 2.
pub fn pagination_clicks(page: usize) -> Vec<usize> {
    let mut clicks = Vec::new();
    if page <= 10 {
        clicks.push(page);
        return clicks;
    }
    for i in 0..(page - 1) / 10 {
        clicks.push(if i == 0 { 11 } else { 12 });
    }
    let offset = (page - 1) % 10;
    if offset > 0 {
        clicks.push(offset + 2);
    }
    clicks
}

/// Crawls one page with bounded retries. A blocked session aborts
/// immediately; any other failure gets another attempt with a fresh session.
/// Returns whatever rows were extracted, possibly none.
pub async fn crawl_page(config: CrawlConfig, page: usize) -> Vec<Review> {
    for attempt in 1..=MAX_PAGE_ATTEMPTS {
        match crawl_page_once(&config, page).await {
            Ok(reviews) => {
                info!(page, rows = reviews.len(), "page crawled");
                return reviews;
            }
            Err(e) if is_blocked(&e) => {
                error!(page, "the server blocked this session, giving up on the page");
                return Vec::new();
            }
            Err(e) => {
                warn!(page, attempt, error = %e, "page crawl failed");
            }
        }
    }
    error!(page, "page crawl failed {MAX_PAGE_ATTEMPTS} times, skipping it");
    Vec::new()
}

fn is_blocked(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<CrawlError>(), Some(CrawlError::Blocked(_)))
}

async fn crawl_page_once(config: &CrawlConfig, page: usize) -> Result<Vec<Review>> {
    let port = BASE_PORT.saturating_add(page as u16);
    let session = DriverSession::open(&config.chromedriver_path, port, config.debug).await?;
    match crawl_page_in_session(&session, config, page).await {
        Ok(reviews) => {
            session.quit().await?;
            Ok(reviews)
        }
        // Dropping the failed session leaves it open in debug mode.
        Err(e) => Err(e),
    }
}

async fn crawl_page_in_session(
    session: &DriverSession,
    config: &CrawlConfig,
    page: usize,
) -> Result<Vec<Review>> {
    let site = config.site;
    session.goto(&config.url, site).await?;
    if config.sort_with == SortOrder::Recent {
        session.wait_and_click(site.sort_button_recent_xpath()).await?;
    }
    for index in pagination_clicks(page) {
        session.wait_and_click(&site.pagination_button_xpath(index)).await?;
    }

    let items = wait_for_review_items(session, site).await?;
    if items.len() < ITEMS_PER_PAGE && page < config.max_page {
        return Err(CrawlError::ShortPage { page, got: items.len() }.into());
    }

    let mut reviews = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let star_text = item.find(Locator::XPath(site.review_star_xpath())).await?.text().await?;
        let rating =
            parse_rating(&star_text).ok_or_else(|| CrawlError::BadRating(star_text.clone()))?;
        let date = item.find(Locator::XPath(site.review_date_xpath())).await?.text().await?;
        let text = item.find(Locator::XPath(site.review_text_xpath())).await?.text().await?;
        let author = match item.find(Locator::XPath(site.review_author_xpath())).await {
            Ok(element) => Some(element.text().await?),
            Err(_) => None,
        };
        let helpful_count = match site.review_helpful_xpath() {
            Some(xpath) => match item.find(Locator::XPath(xpath)).await {
                Ok(element) => parse_count(&element.text().await?),
                Err(_) => None,
            },
            None => None,
        };
        reviews.push(Review {
            page,
            position: i + 1,
            rating,
            author,
            date,
            text,
            helpful_count,
        });
    }
    Ok(reviews)
}

/// Waits for the review list and re-counts it until it stops growing. The
/// list renders item by item, so a single element wait can catch a final
/// page mid-render and hand back fewer rows than exist.
async fn wait_for_review_items(session: &DriverSession, site: Site) -> Result<Vec<Element>> {
    let locator = Locator::XPath(site.review_items_xpath());
    session.wait_for(site.review_items_xpath()).await?;
    let mut items = session.client().find_all(locator).await?;
    for _ in 0..LIST_SETTLE_POLLS {
        if items.len() >= ITEMS_PER_PAGE {
            break;
        }
        tokio::time::sleep(LIST_SETTLE_INTERVAL).await;
        let recounted = session.client().find_all(locator).await?;
        let settled = list_settled(items.len(), recounted.len());
        items = recounted;
        if settled {
            break;
        }
    }
    Ok(items)
}

/// A review list is settled once it holds a full page or two consecutive
/// counts agree.
fn list_settled(previous: usize, current: usize) -> bool {
    current >= ITEMS_PER_PAGE || current == previous
}

/// Fans page crawls out across at most `cpu_count` concurrent sessions and
/// collects the rows in (page, position) order.
pub async fn crawl_all_pages(
    config: CrawlConfig,
    pages: Vec<usize>,
    cpu_count: usize,
) -> Vec<Review> {
    let total = pages.len();
    info!(pages = total, cpu_count, "crawling review pages");

    let results = futures::stream::iter(pages)
        .map(|page| {
            let config = config.clone();
            tokio::spawn(crawl_page(config, page))
        })
        .buffer_unordered(cpu_count.max(1));

    let reviews_arc = Arc::new(Mutex::new(Vec::new()));
    results
        .for_each(|joined| {
            let reviews_arc = reviews_arc.clone();
            async move {
                match joined {
                    Ok(page_reviews) => {
                        reviews_arc.lock().unwrap().extend(page_reviews);
                    }
                    Err(e) => error!(error = %e, "page task panicked"),
                }
            }
        })
        .await;

    let mut reviews = std::mem::take(&mut *reviews_arc.lock().unwrap());
    reviews.sort_by_key(|r| (r.page, r.position));
    reviews
}

/// Parses an integer badge, tolerating thousands separators ("1,234").
fn parse_count(raw: &str) -> Option<usize> {
    raw.replace(',', "").trim().parse().ok()
}

/// The star badge reads "평점5"; strip the label and keep the digit.
fn parse_rating(raw: &str) -> Option<u8> {
    raw.replace("평점", "").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up_and_caps() {
        assert_eq!(page_count_for(0), 1);
        assert_eq!(page_count_for(19), 1);
        assert_eq!(page_count_for(20), 2);
        assert_eq!(page_count_for(385), 20);
        assert_eq!(page_count_for(1999), 100);
        assert_eq!(page_count_for(1_000_000), 100);
    }

    #[test]
    fn max_page_flag_is_clamped_to_the_pagination_limit() {
        // An oversized flag value must not leak into the page range, where it
        // would overflow the per-page port arithmetic.
        assert_eq!(resolve_max_page(Some(60000), 0), MAX_NUM_PAGE);
        assert_eq!(resolve_max_page(Some(101), 1_000_000), MAX_NUM_PAGE);
        assert_eq!(resolve_max_page(Some(5), 1_000_000), 5);
        assert_eq!(resolve_max_page(Some(0), 385), 1);
        assert_eq!(resolve_max_page(None, 385), 20);
    }

    #[test]
    fn short_review_lists_settle_only_when_the_count_stops_growing() {
        assert!(list_settled(18, 20));
        assert!(list_settled(0, 20));
        assert!(!list_settled(5, 12));
        assert!(list_settled(12, 12));
        assert!(!list_settled(12, 13));
    }

    #[test]
    fn pagination_first_block_is_a_single_click() {
        assert_eq!(pagination_clicks(1), vec![1]);
        assert_eq!(pagination_clicks(7), vec![7]);
        assert_eq!(pagination_clicks(10), vec![10]);
    }

    #[test]
    fn pagination_block_starts_need_no_inner_click() {
        assert_eq!(pagination_clicks(11), vec![11]);
        assert_eq!(pagination_clicks(21), vec![11, 12]);
        assert_eq!(pagination_clicks(31), vec![11, 12, 12]);
    }

    #[test]
    fn pagination_inner_pages_click_past_the_prev_arrow() {
        assert_eq!(pagination_clicks(12), vec![11, 3]);
        assert_eq!(pagination_clicks(15), vec![11, 6]);
        assert_eq!(pagination_clicks(20), vec![11, 11]);
        assert_eq!(pagination_clicks(25), vec![11, 12, 6]);
        assert_eq!(pagination_clicks(30), vec![11, 12, 11]);
    }

    #[test]
    fn pagination_reaches_the_last_page() {
        let clicks = pagination_clicks(100);
        assert_eq!(clicks[0], 11);
        assert_eq!(clicks[1..9], [12; 8]);
        assert_eq!(*clicks.last().unwrap(), 11);
    }

    #[test]
    fn count_badges_drop_thousands_separators() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("87"), Some(87));
        assert_eq!(parse_count(" 5 "), Some(5));
        assert_eq!(parse_count("많음"), None);
    }

    #[test]
    fn star_badges_strip_their_label() {
        assert_eq!(parse_rating("평점5"), Some(5));
        assert_eq!(parse_rating("평점 4"), Some(4));
        assert_eq!(parse_rating("3"), Some(3));
        assert_eq!(parse_rating("평점"), None);
    }
}
