use crate::exam::model::{ExamPaper, UserAnswer};

/// In-progress answers for the active paper, one entry per question in paper order.
#[derive(Clone, Debug, Default)]
pub struct AnswerSheet {
    answers: Vec<UserAnswer>,
}

impl AnswerSheet {
    pub fn for_paper(paper: &ExamPaper) -> Self {
        Self {
            answers: paper
                .questions
                .iter()
                .map(|q| UserAnswer::empty(&q.id))
                .collect(),
        }
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn value(&self, question_id: &str) -> &str {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| a.user_value.as_str())
            .unwrap_or("")
    }

    /// Replace the value for `question_id`. Returns false for ids not on the sheet.
    pub fn set(&mut self, question_id: &str, value: &str) -> bool {
        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(answer) => {
                answer.user_value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Toggle one option label in a multi-choice answer, keeping labels sorted
    /// and comma-joined (`"A,C"`).
    pub fn toggle_choice(&mut self, question_id: &str, label: char) -> bool {
        let label = label.to_ascii_uppercase().to_string();
        let mut selected: Vec<String> = self
            .value(question_id)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(pos) = selected.iter().position(|s| *s == label) {
            selected.remove(pos);
        } else {
            selected.push(label);
        }
        selected.sort();
        self.set(question_id, &selected.join(","))
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }

    pub fn progress(&self) -> f64 {
        if self.answers.is_empty() {
            return 0.0;
        }
        self.answered_count() as f64 / self.answers.len() as f64
    }

    pub fn into_answers(self) -> Vec<UserAnswer> {
        self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{Difficulty, Question, QuestionType, Subject};

    fn paper() -> ExamPaper {
        let q = |id: &str, kind| Question {
            id: id.to_string(),
            kind,
            content: String::new(),
            options: vec!["x".into(), "y".into(), "z".into()],
            answer: "A".to_string(),
            explanation: String::new(),
            points: 5,
            subject: Subject::Math,
            chapter: String::new(),
            difficulty: Difficulty::Easy,
        };
        ExamPaper::new(
            "p".to_string(),
            "t".to_string(),
            Subject::Math,
            Difficulty::Easy,
            vec![q("q1", QuestionType::SingleChoice), q("q2", QuestionType::MultiChoice)],
            10,
            Vec::new(),
        )
    }

    #[test]
    fn test_sheet_seeded_in_paper_order() {
        let sheet = AnswerSheet::for_paper(&paper());
        let ids: Vec<&str> = sheet.answers().iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2"]);
        assert!(sheet.answers().iter().all(|a| a.user_value.is_empty()));
        assert_eq!(sheet.answered_count(), 0);
    }

    #[test]
    fn test_set_unknown_id_is_ignored() {
        let mut sheet = AnswerSheet::for_paper(&paper());
        assert!(!sheet.set("nope", "A"));
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_toggle_choice_keeps_sorted_labels() {
        let mut sheet = AnswerSheet::for_paper(&paper());
        sheet.toggle_choice("q2", 'c');
        sheet.toggle_choice("q2", 'A');
        assert_eq!(sheet.value("q2"), "A,C");
        sheet.toggle_choice("q2", 'C');
        assert_eq!(sheet.value("q2"), "A");
        sheet.toggle_choice("q2", 'a');
        assert_eq!(sheet.value("q2"), "");
    }

    #[test]
    fn test_progress_counts_non_blank_values() {
        let mut sheet = AnswerSheet::for_paper(&paper());
        sheet.set("q1", "  ");
        assert_eq!(sheet.answered_count(), 0);
        sheet.set("q1", "B");
        assert!((sheet.progress() - 0.5).abs() < f64::EPSILON);
    }
}
