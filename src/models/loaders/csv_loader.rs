use crate::error::FileError;
use crate::models::work_item::WorkItem;
use std::path::Path;
use tokio::fs;

/// 从 CSV 文件加载作品队列，保持文件中的顺序
///
/// 至少需要 `title` 和 `prompt_text`（或 `promptText` / `description`）两列，
/// 多余的列会被忽略。
pub async fn load_work_items(csv_path: &Path) -> Result<Vec<WorkItem>, FileError> {
    let display = csv_path.display().to_string();

    if !fs::try_exists(csv_path).await.unwrap_or(false) {
        return Err(FileError::NotFound { path: display });
    }

    let content = fs::read_to_string(csv_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: display.clone(),
            source,
        })?;

    parse_work_items(&content).map_err(|source| FileError::CsvParseFailed {
        path: display,
        source,
    })
}

fn parse_work_items(content: &str) -> Result<Vec<WorkItem>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    reader.deserialize().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generator_columns() {
        let csv = "title,genre,moods,context_tags,bpm,description\n\
                   Lo-fi / calm,lo-fi,calm|warm,study,80,\"Title: \"\"Lo-fi\"\"\nBPM: 80\"\n\
                   House / bright,house,bright|fun,party,126,Make it bounce\n";
        let items = parse_work_items(csv).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Lo-fi / calm");
        assert_eq!(items[0].prompt_text, "Title: \"Lo-fi\"\nBPM: 80");
        assert_eq!(items[1], WorkItem::new("House / bright", "Make it bounce"));
    }

    #[test]
    fn test_parse_rejects_missing_prompt_column() {
        let csv = "title,genre\nA,rock\n";
        assert!(parse_work_items(csv).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_work_items(&dir.path().join("nope.csv")).await.unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        std::fs::write(&path, "title\nonly-a-title\n").unwrap();

        let err = tokio_test::block_on(load_work_items(&path)).unwrap_err();
        assert!(matches!(err, FileError::CsvParseFailed { .. }));
    }
}
