pub mod cli;
pub mod crawl;
pub mod driver;
pub mod error;
pub mod export;
pub mod site;

pub use cli::{Args, SortOrder};
pub use crawl::{
    CrawlConfig, ProductInfo, crawl_all_pages, fetch_product_info, page_count_for,
    resolve_max_page,
};
pub use error::CrawlError;
pub use export::{Review, default_out_path, write_to_csv};
pub use site::Site;
