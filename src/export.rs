use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

/// One scraped review row, in the column order of the exported file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub page: usize,
    pub position: usize,
    pub rating: u8,
    pub author: Option<String>,
    pub date: String,
    pub text: String,
    pub helpful_count: Option<usize>,
}

/// Default export path, named after the product. Path separators in the
/// product name would escape the out directory, so they become underscores.
pub fn default_out_path(product_name: &str) -> PathBuf {
    let file_name: String = product_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    Path::new("out").join(format!("{file_name}.csv"))
}

pub fn write_to_csv(reviews: &[Review], out_path: &Path) -> Result<()> {
    info!(rows = reviews.len(), path = %out_path.display(), "writing csv");

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut csv_writer = csv::Writer::from_path(out_path)?;
    for review in reviews {
        csv_writer.serialize(review)?;
    }
    csv_writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(page: usize, position: usize) -> Review {
        Review {
            page,
            position,
            rating: 5,
            author: Some("구매자".to_string()),
            date: "23.04.01.".to_string(),
            text: "배송이 빨라요".to_string(),
            helpful_count: Some(3),
        }
    }

    #[test]
    fn default_path_is_named_after_the_product() {
        assert_eq!(default_out_path("강아지 간식"), PathBuf::from("out/강아지 간식.csv"));
    }

    #[test]
    fn path_separators_in_product_names_are_neutralized() {
        assert_eq!(default_out_path("a/b\\c"), PathBuf::from("out/a_b_c.csv"));
    }

    #[test]
    fn csv_has_a_header_and_one_row_per_review() {
        let dir = std::env::temp_dir().join("review-spider-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reviews.csv");

        write_to_csv(&[review(1, 1), review(1, 2)], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "page,position,rating,author,date,text,helpful_count"
        );
        assert_eq!(lines.clone().count(), 2);
        assert!(lines.next().unwrap().starts_with("1,1,5,"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_optional_fields_serialize_as_empty_cells() {
        let dir = std::env::temp_dir().join("review-spider-export-empty-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reviews.csv");

        let mut r = review(2, 1);
        r.author = None;
        r.helpful_count = None;
        write_to_csv(&[r], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(row, "2,1,5,,23.04.01.,배송이 빨라요,");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn writing_creates_the_parent_directory() {
        let dir = std::env::temp_dir().join("review-spider-export-nested-test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("out").join("reviews.csv");

        write_to_csv(&[review(1, 1)], &path).unwrap();

        assert!(path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
