use crate::exam::model::{ExamPaper, ExamResult, MistakeRecord};
use crate::gateway::PaperRequest;

/// Characters of question content quoted in summaries.
pub const EXCERPT_CHARS: usize = 50;

pub const ALL_CORRECT: &str = "全部正确，表现完美！";

/// First `max` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn paper_prompt(request: &PaperRequest, region: &str, grade: &str, use_search: bool) -> String {
    let research = if use_search {
        format!(
            "First, use Google Search to find the latest {grade} curriculum requirements for {} in {region}.\n",
            request.subject.label()
        )
    } else {
        format!(
            "Follow the {grade} curriculum requirements for {} in {region}.\n",
            request.subject.label()
        )
    };
    format!(
        "{research}Then, generate a professional exam paper.\n\
         - Target Chapters: {}\n\
         - Difficulty: {}\n\
         - Total Questions: {}\n\
         - IMPORTANT: Each question 'type' field MUST be exactly one of: '单选题', '多选题', '填空题', '简答题'.\n\
         - For 多选题, the answer is the comma separated option letters, like A,C.\n",
        request.chapters.join(", "),
        request.difficulty.label(),
        request.count,
    )
}

/// One line per incorrect answer whose question is on the paper.
pub fn mistake_lines(result: &ExamResult, paper: &ExamPaper) -> Vec<String> {
    result
        .incorrect_answers()
        .filter_map(|answer| {
            let q = paper.question(&answer.question_id)?;
            Some(format!(
                "[{}] 题目: {}... | 你的回答: {} | 正确答案: {}",
                q.kind.label(),
                excerpt(&q.content, EXCERPT_CHARS),
                answer.user_value,
                q.answer
            ))
        })
        .collect()
}

pub fn commentary_prompt(result: &ExamResult, paper: &ExamPaper, region: &str) -> String {
    let lines = mistake_lines(result, paper);
    let mistakes = if lines.is_empty() {
        ALL_CORRECT.to_string()
    } else {
        lines.join("\n")
    };
    format!(
        "作为{region}中考教研专家，对学生的这次{}考试表现进行深度点评。\n\
         得分: {}/{}。\n\
         错题情况：\n\
         {mistakes}\n\n\
         请输出一份鼓励性的、专业的考后分析，包括：\n\
         1. 知识点掌握现状。\n\
         2. 针对错题的具体建议。\n\
         3. 下一阶段复习重点。\n\
         使用中文书写。",
        result.subject.label(),
        result.score,
        result.total_points,
    )
}

/// `<subject>: <excerpt>...` per record, one per line.
pub fn mistake_summary(records: &[MistakeRecord]) -> String {
    records
        .iter()
        .map(|m| {
            format!(
                "{}: {}...",
                m.question.subject.label(),
                excerpt(&m.question.content, EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analysis_prompt(summary: &str) -> String {
    format!("分析错题记录并给出策略：{summary}")
}
