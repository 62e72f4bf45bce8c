use std::collections::HashMap;

use rust_embed::Embed;
use serde::Deserialize;

use crate::exam::model::Subject;

#[derive(Embed)]
#[folder = "assets/curriculum/"]
struct CurriculumAssets;

const CATALOGUE_FILE: &str = "grade7.toml";

#[derive(Clone, Debug, Default, Deserialize)]
struct SubjectEntry {
    #[serde(default)]
    chapters: Vec<String>,
}

/// Chapter catalogue per subject, bundled with the binary.
#[derive(Clone, Debug, Default)]
pub struct Curriculum {
    subjects: HashMap<String, SubjectEntry>,
}

impl Curriculum {
    pub fn load() -> Self {
        let Some(file) = CurriculumAssets::get(CATALOGUE_FILE) else {
            tracing::warn!("bundled curriculum missing");
            return Self::default();
        };
        match std::str::from_utf8(file.data.as_ref()) {
            Ok(content) => Self::from_toml(content).unwrap_or_else(|e| {
                tracing::warn!("bundled curriculum unreadable: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let subjects: HashMap<String, SubjectEntry> = toml::from_str(content)?;
        Ok(Self { subjects })
    }

    pub fn chapters(&self, subject: Subject) -> &[String] {
        self.subjects
            .get(subject.key())
            .map(|e| e.chapters.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::ALL_SUBJECTS;

    #[test]
    fn test_bundled_catalogue_covers_every_subject() {
        let curriculum = Curriculum::load();
        for subject in ALL_SUBJECTS {
            assert!(
                !curriculum.chapters(subject).is_empty(),
                "no chapters for {subject:?}"
            );
        }
        assert_eq!(curriculum.chapters(Subject::Math)[0], "有理数");
    }

    #[test]
    fn test_unknown_subject_key_yields_no_chapters() {
        let curriculum = Curriculum::from_toml("[math]\nchapters = [\"a\"]\n").unwrap();
        assert_eq!(curriculum.chapters(Subject::Math), ["a".to_string()]);
        assert!(curriculum.chapters(Subject::Biology).is_empty());
    }
}
