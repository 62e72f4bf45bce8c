//! Answer normalization and scoring.
//!
//! Grading is a pure function of a paper and an answer sheet. Free-text and
//! single-choice answers compare after normalization; multi-choice answers
//! compare as sorted token lists so `"C,A"` matches `"A,C"`.

use std::collections::HashSet;

use icu_normalizer::ComposingNormalizerBorrowed;

use crate::exam::model::{ExamPaper, Question, QuestionType, UserAnswer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GradedSheet {
    pub answers: Vec<UserAnswer>,
    pub score: u32,
}

impl GradedSheet {
    pub fn correct_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| a.is_correct == Some(true))
            .count()
    }
}

/// Folds compatibility forms (full-width letters and punctuation from CJK
/// input methods) into their plain equivalents.
fn fold_compat(text: &str) -> String {
    ComposingNormalizerBorrowed::new_nfkc()
        .normalize(text)
        .into_owned()
}

fn normalize_token(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim, case-fold and collapse internal whitespace runs to a single space.
pub fn normalize_text(text: &str) -> String {
    normalize_token(&fold_compat(text))
}

/// Split a comma-joined choice list into normalized, sorted tokens.
pub fn normalize_choices(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = fold_compat(text).split(',').map(normalize_token).collect();
    tokens.sort();
    tokens
}

pub fn is_correct(question: &Question, user_value: &str) -> bool {
    if normalize_text(user_value).is_empty() {
        return false;
    }
    match question.kind {
        QuestionType::MultiChoice => {
            normalize_choices(user_value) == normalize_choices(&question.answer)
        }
        QuestionType::SingleChoice | QuestionType::FillIn | QuestionType::Subjective => {
            normalize_text(user_value) == normalize_text(&question.answer)
        }
    }
}

/// Grade every answer against the paper.
///
/// Answers keep their order. An answer naming a question the paper does not
/// contain is marked incorrect. Only the first answer to a question is
/// graded; later copies are marked incorrect, so the score is always the sum
/// of the points of the answers marked correct and never exceeds the total.
pub fn grade(paper: &ExamPaper, answers: &[UserAnswer]) -> GradedSheet {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut score = 0u32;

    let graded = answers
        .iter()
        .map(|answer| {
            let first = seen.insert(answer.question_id.as_str());
            let correct = match paper.question(&answer.question_id) {
                Some(question) if first && is_correct(question, &answer.user_value) => {
                    score = score.saturating_add(question.points);
                    true
                }
                _ => false,
            };
            UserAnswer {
                question_id: answer.question_id.clone(),
                user_value: answer.user_value.clone(),
                is_correct: Some(correct),
            }
        })
        .collect();

    GradedSheet {
        answers: graded,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{Difficulty, Subject};

    fn question(id: &str, kind: QuestionType, answer: &str, points: u32) -> Question {
        Question {
            id: id.to_string(),
            kind,
            content: format!("question {id}"),
            options: if kind.is_choice() {
                vec!["one".into(), "two".into(), "three".into(), "four".into()]
            } else {
                Vec::new()
            },
            answer: answer.to_string(),
            explanation: String::new(),
            points,
            subject: Subject::Math,
            chapter: "有理数".to_string(),
            difficulty: Difficulty::Medium,
        }
    }

    fn paper(questions: Vec<Question>) -> ExamPaper {
        ExamPaper::new(
            "paper_1".to_string(),
            "Unit test".to_string(),
            Subject::Math,
            Difficulty::Medium,
            questions,
            30,
            Vec::new(),
        )
    }

    fn answer(id: &str, value: &str) -> UserAnswer {
        UserAnswer {
            question_id: id.to_string(),
            user_value: value.to_string(),
            is_correct: None,
        }
    }

    #[test]
    fn test_single_choice_ignores_case_and_padding() {
        let q = question("q1", QuestionType::SingleChoice, "B", 5);
        assert!(is_correct(&q, " b "));
        assert!(!is_correct(&q, "c"));
    }

    #[test]
    fn test_fill_in_collapses_internal_whitespace() {
        let q = question("q1", QuestionType::FillIn, "Hello World", 5);
        assert!(is_correct(&q, "  hello    world "));
        assert!(!is_correct(&q, "helloworld"));
    }

    #[test]
    fn test_full_width_input_matches_ascii_answer() {
        let single = question("q1", QuestionType::SingleChoice, "A", 5);
        assert!(is_correct(&single, "Ａ"));
        let multi = question("q2", QuestionType::MultiChoice, "A,C", 5);
        assert!(is_correct(&multi, "Ｃ，Ａ"));
    }

    #[test]
    fn test_multi_choice_is_order_independent() {
        let q = question("q1", QuestionType::MultiChoice, "A,C", 5);
        assert!(is_correct(&q, "C,A"));
        assert!(is_correct(&q, " c , a "));
        assert!(!is_correct(&q, "A,B"));
        assert!(!is_correct(&q, "A"));
        assert!(!is_correct(&q, "A,C,D"));
    }

    #[test]
    fn test_empty_answer_is_always_incorrect() {
        let q = question("q1", QuestionType::FillIn, "", 5);
        assert!(!is_correct(&q, ""));
        assert!(!is_correct(&q, "   "));
        let multi = question("q2", QuestionType::MultiChoice, "A", 5);
        assert!(!is_correct(&multi, ""));
    }

    #[test]
    fn test_grade_scores_correct_points_only() {
        let p = paper(vec![
            question("q1", QuestionType::SingleChoice, "A", 5),
            question("q2", QuestionType::MultiChoice, "A,B", 5),
        ]);
        let sheet = grade(&p, &[answer("q1", "A"), answer("q2", "B,A")]);
        assert_eq!(sheet.score, 10);
        assert_eq!(sheet.correct_count(), 2);

        let sheet = grade(&p, &[answer("q1", "A"), answer("q2", "")]);
        assert_eq!(sheet.score, 5);
        assert_eq!(sheet.answers[0].is_correct, Some(true));
        assert_eq!(sheet.answers[1].is_correct, Some(false));
    }

    #[test]
    fn test_unknown_question_id_grades_incorrect() {
        let p = paper(vec![question("q1", QuestionType::SingleChoice, "A", 5)]);
        let sheet = grade(&p, &[answer("q1", "A"), answer("ghost", "A")]);
        assert_eq!(sheet.answers[1].is_correct, Some(false));
        assert_eq!(sheet.score, 5);
    }

    #[test]
    fn test_repeated_answer_is_credited_once() {
        let p = paper(vec![question("q1", QuestionType::SingleChoice, "A", 5)]);
        let sheet = grade(&p, &[answer("q1", "A"), answer("q1", "a")]);
        assert_eq!(sheet.score, 5);
        assert!(sheet.score <= p.total_points);
        assert_eq!(sheet.answers[0].is_correct, Some(true));
        assert_eq!(sheet.answers[1].is_correct, Some(false));
    }

    #[test]
    fn test_repeated_answer_only_first_copy_counts() {
        let p = paper(vec![question("q1", QuestionType::SingleChoice, "A", 5)]);
        let sheet = grade(&p, &[answer("q1", "B"), answer("q1", "A")]);
        assert_eq!(sheet.score, 0);
        assert!(sheet.answers.iter().all(|a| a.is_correct == Some(false)));
    }

    #[test]
    fn test_huge_points_saturate_within_total() {
        let p = paper(vec![
            question("q1", QuestionType::FillIn, "1", u32::MAX),
            question("q2", QuestionType::FillIn, "2", u32::MAX),
        ]);
        assert_eq!(p.total_points, u32::MAX);
        let sheet = grade(&p, &[answer("q1", "1"), answer("q2", "2")]);
        assert_eq!(sheet.score, u32::MAX);
        assert!(sheet.score <= p.total_points);
    }

    #[test]
    fn test_score_matches_sum_of_correct_points() {
        let p = paper(vec![
            question("q1", QuestionType::SingleChoice, "A", 2),
            question("q2", QuestionType::FillIn, "42", 3),
            question("q3", QuestionType::Subjective, "photosynthesis", 7),
            question("q4", QuestionType::MultiChoice, "B,D", 4),
        ]);
        let sheet = grade(
            &p,
            &[
                answer("q1", "b"),
                answer("q2", "42"),
                answer("q3", "Photosynthesis"),
                answer("q4", "D,B"),
            ],
        );
        let expected: u32 = sheet
            .answers
            .iter()
            .filter(|a| a.is_correct == Some(true))
            .filter_map(|a| p.question(&a.question_id))
            .map(|q| q.points)
            .sum();
        assert_eq!(sheet.score, expected);
        assert_eq!(sheet.score, 14);
        assert!(sheet.score <= p.total_points);
    }
}
