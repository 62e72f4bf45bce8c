use std::fs;
use std::path::PathBuf;

use crate::exam::model::ExamPaper;

/// Papers kept on disk by id, so finished results can be reopened with their questions.
pub struct PaperCache {
    base_dir: PathBuf,
}

impl PaperCache {
    pub fn new() -> Option<Self> {
        let base = dirs::data_dir()?.join("examdr").join("papers");
        Self::with_base_dir(base)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Option<Self> {
        fs::create_dir_all(&base_dir).ok()?;
        Some(Self { base_dir })
    }

    pub fn get(&self, paper_id: &str) -> Option<ExamPaper> {
        let path = self.base_dir.join(Self::file_name(paper_id));
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn put(&self, paper: &ExamPaper) -> bool {
        let path = self.base_dir.join(Self::file_name(&paper.id));
        match serde_json::to_string(paper) {
            Ok(json) => fs::write(path, json).is_ok(),
            Err(_) => false,
        }
    }

    fn file_name(paper_id: &str) -> String {
        let key: String = paper_id
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{key}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{Difficulty, Subject};

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = PaperCache::with_base_dir(dir.path().to_path_buf()).unwrap();
        let paper = ExamPaper::new(
            "paper_1/../x".to_string(),
            "Archived".to_string(),
            Subject::History,
            Difficulty::Hard,
            Vec::new(),
            40,
            Vec::new(),
        );
        assert!(cache.put(&paper));
        assert_eq!(cache.get(&paper.id), Some(paper));
        assert!(cache.get("paper_missing").is_none());
        assert!(dir.path().join("paper_1_.._x.json").exists());
    }
}
