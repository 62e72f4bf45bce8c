use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "数学", alias = "math", alias = "Math")]
    Math,
    #[serde(rename = "语文", alias = "chinese", alias = "Chinese")]
    Chinese,
    #[serde(rename = "英语", alias = "english", alias = "English")]
    English,
    #[serde(rename = "历史", alias = "history", alias = "History")]
    History,
    #[serde(rename = "地理", alias = "geography", alias = "Geography")]
    Geography,
    #[serde(rename = "生物", alias = "biology", alias = "Biology")]
    Biology,
    #[serde(rename = "道德与法治", alias = "ethics", alias = "Ethics")]
    Ethics,
}

pub const ALL_SUBJECTS: [Subject; 7] = [
    Subject::Math,
    Subject::Chinese,
    Subject::English,
    Subject::History,
    Subject::Geography,
    Subject::Biology,
    Subject::Ethics,
];

impl Subject {
    pub fn label(self) -> &'static str {
        match self {
            Subject::Math => "数学",
            Subject::Chinese => "语文",
            Subject::English => "英语",
            Subject::History => "历史",
            Subject::Geography => "地理",
            Subject::Biology => "生物",
            Subject::Ethics => "道德与法治",
        }
    }

    /// Stable ASCII key, used for the curriculum catalogue and CLI input.
    pub fn key(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Chinese => "chinese",
            Subject::English => "english",
            Subject::History => "history",
            Subject::Geography => "geography",
            Subject::Biology => "biology",
            Subject::Ethics => "ethics",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "简单", alias = "easy", alias = "Easy")]
    Easy,
    #[default]
    #[serde(rename = "中等", alias = "medium", alias = "Medium")]
    Medium,
    #[serde(rename = "困难", alias = "hard", alias = "Hard")]
    Hard,
}

pub const ALL_DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "简单",
            Difficulty::Medium => "中等",
            Difficulty::Hard => "困难",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "单选题", alias = "single-choice", alias = "single_choice")]
    SingleChoice,
    #[serde(rename = "多选题", alias = "multi-choice", alias = "multi_choice")]
    MultiChoice,
    #[serde(rename = "填空题", alias = "fill-in", alias = "fill_in")]
    FillIn,
    #[serde(rename = "简答题", alias = "subjective")]
    Subjective,
}

impl QuestionType {
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "单选题",
            QuestionType::MultiChoice => "多选题",
            QuestionType::FillIn => "填空题",
            QuestionType::Subjective => "简答题",
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSource {
    pub title: String,
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    pub points: u32,
    pub subject: Subject,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Option label for a zero-based option index: 0 -> 'A', 1 -> 'B', ...
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPaper {
    pub id: String,
    pub title: String,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    /// Minutes.
    pub duration: u32,
    pub total_points: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<QuestionSource>,
}

impl ExamPaper {
    /// Builds a paper whose `total_points` is the sum of its question points,
    /// saturating at `u32::MAX`.
    pub fn new(
        id: String,
        title: String,
        subject: Subject,
        difficulty: Difficulty,
        questions: Vec<Question>,
        duration: u32,
        sources: Vec<QuestionSource>,
    ) -> Self {
        let total_points = questions
            .iter()
            .fold(0u32, |sum, q| sum.saturating_add(q.points));
        Self {
            id,
            title,
            subject,
            difficulty,
            questions,
            duration,
            total_points,
            sources,
        }
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration.saturating_mul(60)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub user_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl UserAnswer {
    pub fn empty(question_id: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            user_value: String::new(),
            is_correct: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.user_value.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: String,
    pub paper_id: String,
    pub paper_title: String,
    pub subject: Subject,
    pub score: u32,
    pub total_points: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub answers: Vec<UserAnswer>,
}

impl ExamResult {
    /// Score as a percentage of the paper's total; 0 for an empty paper.
    pub fn percent(&self) -> f64 {
        if self.total_points == 0 {
            return 0.0;
        }
        self.score as f64 / self.total_points as f64 * 100.0
    }

    pub fn incorrect_answers(&self) -> impl Iterator<Item = &UserAnswer> {
        self.answers.iter().filter(|a| a.is_correct != Some(true))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeRecord {
    pub id: String,
    pub question: Question,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_attempt_date: DateTime<Utc>,
    pub incorrect_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: "user_1".to_string(),
            username: "张同学".to_string(),
            email: "zhang@example.com".to_string(),
        }
    }
}

/// `<prefix>_<epoch-ms>_<6 hex digits>`.
pub fn generate_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random::<u32>() & 0x00ff_ffff;
    format!("{prefix}_{}_{suffix:06x}", now.timestamp_millis())
}
