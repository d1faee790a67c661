use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing::info;

use naver_review_spider_rs::Args;
use naver_review_spider_rs::CrawlConfig;
use naver_review_spider_rs::Site;
use naver_review_spider_rs::crawl_all_pages;
use naver_review_spider_rs::default_out_path;
use naver_review_spider_rs::fetch_product_info;
use naver_review_spider_rs::resolve_max_page;
use naver_review_spider_rs::write_to_csv;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let site = Site::detect(&args.url).ok_or_else(|| {
        anyhow!("url matches none of the supported patterns: {:?}", Site::url_patterns())
    })?;

    let mut config = CrawlConfig {
        url: args.url,
        site,
        sort_with: args.sort_with,
        chromedriver_path: args.chromedriver_path.unwrap_or_else(|| "chromedriver".to_string()),
        max_page: 0,
        debug: args.debug,
    };

    let product_info = fetch_product_info(&config).await?;
    info!(
        product = %product_info.name,
        reviews = product_info.num_review,
        "probed product page"
    );

    config.max_page = resolve_max_page(args.max_page, product_info.num_review);
    let pages = (1..=config.max_page).collect();
    let reviews = crawl_all_pages(config, pages, args.cpu_count).await;

    let out_path = args.out_path.unwrap_or_else(|| default_out_path(&product_info.name));
    write_to_csv(&reviews, &out_path)?;
    info!(rows = reviews.len(), path = %out_path.display(), "done");

    Ok(())
}
