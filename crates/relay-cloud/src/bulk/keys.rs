use chrono::NaiveDate;

use relay_core::errors::{BulkError, RelayResult};
use relay_core::models::ArtifactCategory;

/// `<site>/<YYYY-MM-DD>/<category>/<file name>`.
pub fn destination_key(
    site: &str,
    date: NaiveDate,
    category: ArtifactCategory,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}/{}",
        site,
        date.format("%Y-%m-%d"),
        category.as_str(),
        file_name
    )
}

/// Keys are relative, slash-separated, and never climb out of the bucket.
pub fn validate_key(key: &str) -> RelayResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(BulkError::UploadFailed {
            key: key.to_string(),
            reason: "invalid destination key".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_site_date_category_file() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            destination_key("farm-7", date, ArtifactCategory::Thermal, "frame_001.npy"),
            "farm-7/2024-03-07/thermal/frame_001.npy"
        );
    }

    #[test]
    fn escaping_keys_are_rejected() {
        for key in ["", "/abs/key", "a/../b", "a//b", "a/./b", "a\\b"] {
            assert!(validate_key(key).is_err(), "{key}");
        }
        assert!(validate_key("site/2024-01-01/visual/img.jpg").is_ok());
    }
}
