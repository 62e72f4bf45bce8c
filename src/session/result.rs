use chrono::{DateTime, Utc};

use crate::engine::grading::GradedSheet;
use crate::exam::model::{ExamPaper, ExamResult, generate_id};

impl ExamResult {
    pub fn from_graded(
        paper: &ExamPaper,
        graded: GradedSheet,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id("res", end_time),
            paper_id: paper.id.clone(),
            paper_title: paper.title.clone(),
            subject: paper.subject,
            score: graded.score,
            total_points: paper.total_points,
            start_time,
            end_time,
            answers: graded.answers,
        }
    }

    pub fn elapsed_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::engine::grading;
    use crate::exam::model::{Difficulty, Question, QuestionType, Subject, UserAnswer};

    #[test]
    fn test_result_carries_paper_total_not_earned_points() {
        let question = Question {
            id: "q1".to_string(),
            kind: QuestionType::FillIn,
            content: "1 + 1 = ?".to_string(),
            options: Vec::new(),
            answer: "2".to_string(),
            explanation: String::new(),
            points: 4,
            subject: Subject::Math,
            chapter: "有理数".to_string(),
            difficulty: Difficulty::Easy,
        };
        let paper = ExamPaper::new(
            "paper_1".to_string(),
            "Quick check".to_string(),
            Subject::Math,
            Difficulty::Easy,
            vec![question],
            5,
            Vec::new(),
        );
        let answers = vec![UserAnswer {
            question_id: "q1".to_string(),
            user_value: "3".to_string(),
            is_correct: None,
        }];
        let start = Utc::now();
        let end = start + Duration::seconds(90);
        let result = ExamResult::from_graded(&paper, grading::grade(&paper, &answers), start, end);

        assert_eq!(result.score, 0);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.paper_id, "paper_1");
        assert_eq!(result.elapsed_secs(), 90);
        assert!(result.id.starts_with("res_"));
    }
}
