pub mod curriculum;
pub mod model;

pub use model::{
    Difficulty, ExamPaper, ExamResult, MistakeRecord, Question, QuestionSource, QuestionType,
    Subject, User, UserAnswer,
};
