use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// The site's default ranking order.
    Ranking,
    /// Newest reviews first, via the site's sort button.
    Recent,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ranking => write!(f, "ranking"),
            SortOrder::Recent => write!(f, "recent"),
        }
    }
}

#[derive(Parser, Debug)]
#[clap(about, version, author)]
pub struct Args {
    /// Product URL, either a shopping catalog page or a brand store page
    pub url: String,

    /// Path to the chromedriver binary (defaults to "chromedriver" on PATH)
    #[clap(short = 'p', long)]
    pub chromedriver_path: Option<String>,

    #[clap(short = 's', long, value_enum, default_value_t = SortOrder::Recent)]
    pub sort_with: SortOrder,

    /// Concurrent browser sessions. High counts tend to trigger
    /// server-side blocking.
    #[clap(short = 'c', long, default_value_t = 1)]
    pub cpu_count: usize,

    /// Crawl at most this many pages instead of deriving the count
    /// from the review badge
    #[clap(short = 'm', long)]
    pub max_page: Option<usize>,

    /// The default path is "out/<PRODUCT_NAME>.csv"
    #[clap(short = 'o', long)]
    pub out_path: Option<PathBuf>,

    /// Run the browser headed and leave failed sessions open
    #[clap(short = 'd', long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args =
            Args::try_parse_from(["spider", "https://search.shopping.naver.com/catalog/1"])
                .unwrap();
        assert_eq!(args.sort_with, SortOrder::Recent);
        assert_eq!(args.cpu_count, 1);
        assert_eq!(args.max_page, None);
        assert_eq!(args.out_path, None);
        assert!(!args.debug);
    }

    #[test]
    fn short_flags() {
        let args = Args::try_parse_from([
            "spider",
            "https://brand.naver.com/pupping/products/1",
            "-s",
            "ranking",
            "-c",
            "4",
            "-m",
            "10",
            "-o",
            "reviews.csv",
            "-p",
            "/usr/bin/chromedriver",
        ])
        .unwrap();
        assert_eq!(args.sort_with, SortOrder::Ranking);
        assert_eq!(args.cpu_count, 4);
        assert_eq!(args.max_page, Some(10));
        assert_eq!(args.out_path, Some(PathBuf::from("reviews.csv")));
        assert_eq!(args.chromedriver_path.as_deref(), Some("/usr/bin/chromedriver"));
    }

    #[test]
    fn unknown_sort_order_is_rejected() {
        let result = Args::try_parse_from([
            "spider",
            "https://search.shopping.naver.com/catalog/1",
            "--sort-with",
            "oldest",
        ]);
        assert!(result.is_err());
    }
}
