use std::sync::LazyLock;

use regex::Regex;

const SHOPPING_URL_PATTERN: &str = r"^https://search\.shopping\.naver\.com/catalog/[0-9]+($|\?)";
const BRAND_URL_PATTERN: &str = r"^https://brand\.naver\.com/pupping/products/[0-9]+($|\?)";

static SHOPPING_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SHOPPING_URL_PATTERN).unwrap());
static BRAND_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(BRAND_URL_PATTERN).unwrap());

/// The two review-listing layouts the spider knows how to read. Each variant
/// carries its own XPath table because the catalog page and the brand store
/// render reviews with completely different markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Shopping,
    Brand,
}

impl Site {
    pub fn detect(url: &str) -> Option<Self> {
        if SHOPPING_URL_REGEX.is_match(url) {
            Some(Site::Shopping)
        } else if BRAND_URL_REGEX.is_match(url) {
            Some(Site::Brand)
        } else {
            None
        }
    }

    pub fn url_patterns() -> [&'static str; 2] {
        [SHOPPING_URL_PATTERN, BRAND_URL_PATTERN]
    }

    pub fn product_name_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "/html/body/div/div/div[2]/div[2]/div[1]/h2",
            Site::Brand => r#"//*[@id="content"]/div/div[2]/div[2]/fieldset/div[1]/div[1]/h3"#,
        }
    }

    pub fn tabs_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "/html/body/div/div/div[2]/div[2]/div[2]/div[3]/div[1]/ul/li",
            Site::Brand => r#"//*[@id="content"]/div/div[3]/div[3]/ul/li"#,
        }
    }

    pub fn review_tab_text(self) -> &'static str {
        match self {
            Site::Shopping => "쇼핑몰리뷰",
            Site::Brand => "리뷰",
        }
    }

    // Relative to the review tab element.
    pub fn review_count_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "./a/em",
            Site::Brand => "./a/span",
        }
    }

    pub fn sort_button_recent_xpath(self) -> &'static str {
        match self {
            Site::Shopping => r#"//*[@id="section_review"]/div[2]/div[1]/div[1]/a[2]"#,
            Site::Brand => r#"//*[@id="REVIEW"]/div/div[3]/div[1]/div[1]/ul/li[2]/a"#,
        }
    }

    pub fn pagination_button_xpath(self, index: usize) -> String {
        match self {
            Site::Shopping => format!(r#"//*[@id="section_review"]/div[3]/a[{index}]"#),
            Site::Brand => format!(r#"//*[@id="REVIEW"]/div/div[3]/div[2]/div/div/a[{index}]"#),
        }
    }

    pub fn review_items_xpath(self) -> &'static str {
        match self {
            Site::Shopping => r#"//*[@id="section_review"]/ul/li"#,
            Site::Brand => r#"//*[@id="REVIEW"]/div/div[3]/div[2]/ul/li"#,
        }
    }

    // The remaining XPaths are relative to one review item.

    pub fn review_star_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "./div[1]/span[1]",
            Site::Brand => "./div/div/div/div[1]/div/div[1]/div[1]/div[2]/div[1]/em",
        }
    }

    pub fn review_author_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "./div[1]/span[2]",
            Site::Brand => "./div/div/div/div[1]/div/div[1]/div[1]/div[1]/strong",
        }
    }

    pub fn review_date_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "./div[1]/span[4]",
            Site::Brand => "./div/div/div/div[1]/div/div[1]/div[1]/div[2]/div[2]/span",
        }
    }

    pub fn review_text_xpath(self) -> &'static str {
        match self {
            Site::Shopping => "./div[2]/div[1]",
            Site::Brand => "./div/div/div/div[1]/div/div[1]/div[2]/div/span",
        }
    }

    /// The helpful-count badge only exists on the catalog layout.
    pub fn review_helpful_xpath(self) -> Option<&'static str> {
        match self {
            Site::Shopping => Some("./div[2]/div[2]/a/em"),
            Site::Brand => None,
        }
    }

    pub fn blocked_url(self) -> Option<&'static str> {
        match self {
            Site::Shopping => Some("https://search.shopping.naver.com/blocked.html"),
            Site::Brand => None,
        }
    }
}
