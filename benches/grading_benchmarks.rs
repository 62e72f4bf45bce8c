use criterion::{Criterion, black_box, criterion_group, criterion_main};

use examdr::engine::grading::{grade, normalize_text};
use examdr::exam::model::{
    Difficulty, ExamPaper, Question, QuestionType, Subject, UserAnswer,
};

fn make_paper(count: usize) -> ExamPaper {
    let questions = (0..count)
        .map(|i| {
            let (kind, options, answer) = match i % 4 {
                0 => (
                    QuestionType::SingleChoice,
                    vec!["甲".into(), "乙".into(), "丙".into(), "丁".into()],
                    "B".to_string(),
                ),
                1 => (
                    QuestionType::MultiChoice,
                    vec!["甲".into(), "乙".into(), "丙".into(), "丁".into()],
                    "A,C,D".to_string(),
                ),
                2 => (QuestionType::FillIn, Vec::new(), "Photosynthesis".to_string()),
                _ => (
                    QuestionType::Subjective,
                    Vec::new(),
                    "秦始皇统一六国 推行郡县制".to_string(),
                ),
            };
            Question {
                id: format!("bench-q{i}"),
                kind,
                content: format!("第{i}题"),
                options,
                answer,
                explanation: String::new(),
                points: 5,
                subject: Subject::Math,
                chapter: String::new(),
                difficulty: Difficulty::Medium,
            }
        })
        .collect();
    ExamPaper::new(
        "bench".to_string(),
        "Bench".to_string(),
        Subject::Math,
        Difficulty::Medium,
        questions,
        45,
        Vec::new(),
    )
}

fn make_answers(paper: &ExamPaper) -> Vec<UserAnswer> {
    paper
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| UserAnswer {
            question_id: q.id.clone(),
            // Full-width and reordered forms on every third answer.
            user_value: match (q.kind, i % 3) {
                (QuestionType::MultiChoice, 0) => "Ｄ，Ａ，Ｃ".to_string(),
                (QuestionType::FillIn, 0) => "  photosynthesis ".to_string(),
                _ => q.answer.clone(),
            },
            is_correct: None,
        })
        .collect()
}

fn bench_grade(c: &mut Criterion) {
    let paper = make_paper(50);
    let answers = make_answers(&paper);

    c.bench_function("grade (50 questions)", |b| {
        b.iter(|| grade(black_box(&paper), black_box(&answers)))
    });
}

fn bench_normalize(c: &mut Criterion) {
    let text = "  Ｔｈｅ   Ｑｕｉｃｋ  brown　fox ，jumps ";

    c.bench_function("normalize_text (full-width input)", |b| {
        b.iter(|| normalize_text(black_box(text)))
    });
}

criterion_group!(benches, bench_grade, bench_normalize);
criterion_main!(benches);
