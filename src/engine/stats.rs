use crate::exam::model::{ALL_SUBJECTS, ExamResult, MistakeRecord, Subject};

pub const TREND_LEN: usize = 10;
pub const RECENT_LEN: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct SubjectAverage {
    pub subject: Subject,
    pub attempts: usize,
    /// Mean percentage, 0 when the subject has no results.
    pub average: f64,
}

/// Figures shown on the history dashboard.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardStats {
    pub exam_count: usize,
    pub average_percent: f64,
    pub by_subject: Vec<SubjectAverage>,
    /// Percentages of the last results in the order they were taken.
    pub trend: Vec<f64>,
    /// Indices into the result list, newest end time first.
    pub recent: Vec<usize>,
    pub mistake_count: usize,
}

impl DashboardStats {
    pub fn compute(results: &[ExamResult], mistakes: &[MistakeRecord]) -> Self {
        let exam_count = results.len();
        let average_percent = mean(results.iter().map(ExamResult::percent));

        let by_subject = ALL_SUBJECTS
            .iter()
            .map(|&subject| {
                let scores: Vec<f64> = results
                    .iter()
                    .filter(|r| r.subject == subject)
                    .map(ExamResult::percent)
                    .collect();
                SubjectAverage {
                    subject,
                    attempts: scores.len(),
                    average: mean(scores.iter().copied()),
                }
            })
            .collect();

        let trend = results
            .iter()
            .skip(exam_count.saturating_sub(TREND_LEN))
            .map(ExamResult::percent)
            .collect();

        let mut recent: Vec<usize> = (0..exam_count).collect();
        recent.sort_by(|&a, &b| results[b].end_time.cmp(&results[a].end_time));
        recent.truncate(RECENT_LEN);

        Self {
            exam_count,
            average_percent,
            by_subject,
            trend,
            recent,
            mistake_count: mistakes.len(),
        }
    }

    pub fn best_subject(&self) -> Option<&SubjectAverage> {
        self.by_subject
            .iter()
            .filter(|s| s.attempts > 0)
            .max_by(|a, b| a.average.total_cmp(&b.average))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn result(subject: Subject, score: u32, minutes_ago: i64) -> ExamResult {
        let end = Utc::now() - Duration::minutes(minutes_ago);
        ExamResult {
            id: format!("res_{minutes_ago}"),
            paper_id: "p".to_string(),
            paper_title: "t".to_string(),
            subject,
            score,
            total_points: 100,
            start_time: end - Duration::minutes(30),
            end_time: end,
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_empty_history() {
        let stats = DashboardStats::compute(&[], &[]);
        assert_eq!(stats.exam_count, 0);
        assert_eq!(stats.average_percent, 0.0);
        assert_eq!(stats.by_subject.len(), 7);
        assert!(stats.by_subject.iter().all(|s| s.average == 0.0));
        assert!(stats.trend.is_empty());
        assert!(stats.best_subject().is_none());
    }

    #[test]
    fn test_averages_and_recent_order() {
        let results = vec![
            result(Subject::Math, 80, 30),
            result(Subject::Math, 60, 10),
            result(Subject::History, 90, 50),
        ];
        let stats = DashboardStats::compute(&results, &[]);
        assert!((stats.average_percent - 230.0 / 3.0).abs() < 1e-9);

        let math = &stats.by_subject[0];
        assert_eq!(math.subject, Subject::Math);
        assert_eq!(math.attempts, 2);
        assert!((math.average - 70.0).abs() < 1e-9);

        assert_eq!(stats.recent, vec![1, 0, 2]);
        assert_eq!(stats.best_subject().unwrap().subject, Subject::History);
    }

    #[test]
    fn test_trend_keeps_last_ten() {
        let results: Vec<ExamResult> = (0..14)
            .map(|i| result(Subject::English, i * 5, 100 - i as i64))
            .collect();
        let stats = DashboardStats::compute(&results, &[]);
        assert_eq!(stats.trend.len(), TREND_LEN);
        assert_eq!(stats.trend[0], 20.0);
        assert_eq!(stats.recent.len(), RECENT_LEN);
        assert_eq!(stats.recent[0], 13);
    }
}
