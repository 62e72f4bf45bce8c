//! Result history and the mistake bank.
//!
//! Results are appended unconditionally. Each incorrectly answered question
//! is upserted into the mistake bank by question id: first miss inserts with
//! count 1, later misses bump the count and refresh the date. A correct
//! answer never removes a record.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

use crate::exam::model::{
    Difficulty, ExamPaper, ExamResult, MistakeRecord, Question, Subject, User, generate_id,
};
use crate::store::StateStore;
use crate::store::schema::AppStateData;

/// Insert or bump a mistake record for every incorrect answer in `result`.
/// Answers whose question is not on `paper` are skipped. Returns how many
/// records were newly created.
pub fn upsert_mistakes(
    bank: &mut Vec<MistakeRecord>,
    result: &ExamResult,
    paper: &ExamPaper,
    now: DateTime<Utc>,
) -> usize {
    let mut created = 0;
    for answer in result.incorrect_answers() {
        let Some(question) = paper.question(&answer.question_id) else {
            continue;
        };
        match bank.iter_mut().find(|m| m.question.id == question.id) {
            Some(record) => {
                record.incorrect_count += 1;
                record.last_attempt_date = now;
            }
            None => {
                bank.push(MistakeRecord {
                    id: format!("mistake_{}_{}", now.timestamp_millis(), question.id),
                    question: question.clone(),
                    last_attempt_date: now,
                    incorrect_count: 1,
                });
                created += 1;
            }
        }
    }
    created
}

/// Build a practice paper from the most-missed questions, optionally for one subject.
/// Returns `None` when no record matches.
pub fn build_review_paper(
    bank: &[MistakeRecord],
    subject: Option<Subject>,
    limit: usize,
    minutes: u32,
    now: DateTime<Utc>,
) -> Option<ExamPaper> {
    let mut records: Vec<&MistakeRecord> = bank
        .iter()
        .filter(|m| subject.is_none_or(|s| m.question.subject == s))
        .collect();
    if records.is_empty() || limit == 0 {
        return None;
    }
    records.sort_by(|a, b| {
        b.incorrect_count
            .cmp(&a.incorrect_count)
            .then(b.last_attempt_date.cmp(&a.last_attempt_date))
    });
    records.truncate(limit);

    let questions: Vec<Question> = records.iter().map(|m| m.question.clone()).collect();
    let paper_subject = subject.unwrap_or(questions[0].subject);
    let title = match subject {
        Some(s) => format!("{} 错题重练", s.label()),
        None => "错题重练".to_string(),
    };
    Some(ExamPaper::new(
        generate_id("review", now),
        title,
        paper_subject,
        Difficulty::Medium,
        questions,
        minutes,
        Vec::new(),
    ))
}

/// Owns the persisted state and writes it back through the injected store
/// after every mutation.
pub struct ProgressTracker {
    store: Box<dyn StateStore>,
    state: AppStateData,
    /// Set when unusable saved state could not be moved aside; saving would
    /// overwrite it.
    saves_blocked: bool,
}

impl ProgressTracker {
    /// Load saved state. Missing, unreadable or incompatible state starts empty.
    ///
    /// Unreadable or incompatible state is first handed to
    /// [`StateStore::set_aside`]. If that fails, the tracker refuses to save
    /// for the rest of the run.
    pub fn load(store: Box<dyn StateStore>) -> Self {
        let mut unusable = false;
        let state = match store.load_state() {
            Ok(Some(state)) if !state.needs_reset() => {
                tracing::info!(
                    results = state.exam_results.len(),
                    mistakes = state.mistake_bank.len(),
                    "loaded saved progress"
                );
                state
            }
            Ok(Some(state)) => {
                tracing::warn!(
                    schema = state.schema_version,
                    "saved progress has an unsupported schema, starting fresh"
                );
                unusable = true;
                AppStateData::default()
            }
            Ok(None) => AppStateData::default(),
            Err(e) => {
                tracing::warn!("could not load saved progress: {e:#}");
                unusable = true;
                AppStateData::default()
            }
        };
        let saves_blocked = unusable
            && store
                .set_aside()
                .inspect_err(|e| {
                    tracing::error!("could not set saved progress aside, saving disabled: {e:#}");
                })
                .is_err();
        Self {
            store,
            state,
            saves_blocked,
        }
    }

    pub fn state(&self) -> &AppStateData {
        &self.state
    }

    pub fn results(&self) -> &[ExamResult] {
        &self.state.exam_results
    }

    pub fn mistakes(&self) -> &[MistakeRecord] {
        &self.state.mistake_bank
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    /// Append a finished result and upsert its mistakes, then save.
    ///
    /// The in-memory state is updated even when saving fails; the error is
    /// returned so the caller can tell the user.
    pub fn record_result(
        &mut self,
        result: &ExamResult,
        paper: &ExamPaper,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        self.state.exam_results.push(result.clone());
        let created = upsert_mistakes(&mut self.state.mistake_bank, result, paper, now);
        tracing::info!(
            result_id = %result.id,
            new_mistakes = created,
            total_mistakes = self.state.mistake_bank.len(),
            "result recorded"
        );
        self.save()?;
        Ok(created)
    }

    fn save(&self) -> Result<()> {
        if self.saves_blocked {
            bail!("saved progress could not be set aside, refusing to overwrite it");
        }
        self.store.save_state(&self.state).inspect_err(|e| {
            tracing::error!("saving progress failed: {e:#}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{QuestionType, UserAnswer};
    use crate::store::MemoryStore;
    use crate::store::json_store::JsonStore;
    use chrono::Duration;

    fn question(id: &str, subject: Subject) -> Question {
        Question {
            id: id.to_string(),
            kind: QuestionType::SingleChoice,
            content: format!("content {id}"),
            options: vec!["a".into(), "b".into()],
            answer: "A".to_string(),
            explanation: String::new(),
            points: 5,
            subject,
            chapter: String::new(),
            difficulty: Difficulty::Easy,
        }
    }

    fn paper() -> ExamPaper {
        ExamPaper::new(
            "paper_h".to_string(),
            "History test".to_string(),
            Subject::Math,
            Difficulty::Easy,
            vec![question("q1", Subject::Math), question("q2", Subject::Math)],
            10,
            Vec::new(),
        )
    }

    fn result(correct: &[bool]) -> ExamResult {
        let now = Utc::now();
        ExamResult {
            id: generate_id("res", now),
            paper_id: "paper_h".to_string(),
            paper_title: "History test".to_string(),
            subject: Subject::Math,
            score: correct.iter().filter(|c| **c).count() as u32 * 5,
            total_points: 10,
            start_time: now,
            end_time: now,
            answers: correct
                .iter()
                .enumerate()
                .map(|(i, c)| UserAnswer {
                    question_id: format!("q{}", i + 1),
                    user_value: if *c { "A".into() } else { String::new() },
                    is_correct: Some(*c),
                })
                .collect(),
        }
    }

    #[test]
    fn test_first_miss_creates_record() {
        let mut bank = Vec::new();
        let created = upsert_mistakes(&mut bank, &result(&[true, false]), &paper(), Utc::now());
        assert_eq!(created, 1);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].question.id, "q2");
        assert_eq!(bank[0].incorrect_count, 1);
    }

    #[test]
    fn test_repeat_miss_counts_without_duplicating() {
        let mut bank = Vec::new();
        let t1 = Utc::now();
        let t2 = t1 + Duration::minutes(5);
        upsert_mistakes(&mut bank, &result(&[true, false]), &paper(), t1);
        let created = upsert_mistakes(&mut bank, &result(&[true, false]), &paper(), t2);
        assert_eq!(created, 0);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].incorrect_count, 2);
        assert_eq!(bank[0].last_attempt_date, t2);
    }

    #[test]
    fn test_correct_answer_keeps_existing_record() {
        let mut bank = Vec::new();
        upsert_mistakes(&mut bank, &result(&[false, false]), &paper(), Utc::now());
        upsert_mistakes(&mut bank, &result(&[true, true]), &paper(), Utc::now());
        assert_eq!(bank.len(), 2);
        assert!(bank.iter().all(|m| m.incorrect_count == 1));
    }

    #[test]
    fn test_answer_for_unknown_question_is_skipped() {
        let mut bank = Vec::new();
        let mut r = result(&[false]);
        r.answers[0].question_id = "ghost".to_string();
        assert_eq!(upsert_mistakes(&mut bank, &r, &paper(), Utc::now()), 0);
        assert!(bank.is_empty());
    }

    #[test]
    fn test_record_result_appends_and_saves() {
        let store = MemoryStore::new();
        let mut tracker = ProgressTracker::load(Box::new(store.clone()));
        let r = result(&[true, false]);
        tracker.record_result(&r, &paper(), Utc::now()).unwrap();
        tracker.record_result(&r, &paper(), Utc::now()).unwrap();

        assert_eq!(tracker.results().len(), 2, "repeat attempts are all kept");
        assert_eq!(tracker.mistakes().len(), 1);
        assert_eq!(store.save_count(), 2);
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.exam_results.len(), 2);
        assert_eq!(saved.mistake_bank[0].incorrect_count, 2);
    }

    #[test]
    fn test_record_result_keeps_memory_state_when_save_fails() {
        let store = MemoryStore::new();
        store.fail_saves(true);
        let mut tracker = ProgressTracker::load(Box::new(store.clone()));
        let outcome = tracker.record_result(&result(&[false, true]), &paper(), Utc::now());
        assert!(outcome.is_err());
        assert_eq!(tracker.results().len(), 1);
        assert_eq!(tracker.mistakes().len(), 1);
    }

    struct UnreadableStore;

    impl StateStore for UnreadableStore {
        fn load_state(&self) -> Result<Option<AppStateData>> {
            bail!("state.json is unreadable")
        }

        fn save_state(&self, _state: &AppStateData) -> Result<()> {
            panic!("unreadable state must not be overwritten");
        }

        fn set_aside(&self) -> Result<()> {
            bail!("read-only directory")
        }
    }

    #[test]
    fn test_corrupt_state_file_survives_next_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(&state_path, "\"broken\"").unwrap();

        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut tracker = ProgressTracker::load(Box::new(store));
        assert!(tracker.results().is_empty());
        tracker
            .record_result(&result(&[false, true]), &paper(), Utc::now())
            .unwrap();

        let backup = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("state.json.bak-")
            })
            .expect("corrupt file kept as a backup");
        assert_eq!(std::fs::read_to_string(backup.path()).unwrap(), "\"broken\"");

        let reloaded = ProgressTracker::load(Box::new(
            JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap(),
        ));
        assert_eq!(reloaded.results().len(), 1);
    }

    #[test]
    fn test_unsupported_schema_is_set_aside() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut old = AppStateData::default();
        old.schema_version += 1;
        store.save_state(&old).unwrap();

        let mut tracker = ProgressTracker::load(Box::new(store));
        tracker
            .record_result(&result(&[true, true]), &paper(), Utc::now())
            .unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("state.json.bak-")));
        assert!(names.iter().any(|n| n == "state.json"));
    }

    #[test]
    fn test_saving_blocked_when_state_cannot_be_set_aside() {
        let mut tracker = ProgressTracker::load(Box::new(UnreadableStore));
        let outcome = tracker.record_result(&result(&[false, false]), &paper(), Utc::now());
        assert!(outcome.is_err());
        assert_eq!(tracker.results().len(), 1, "memory state still updated");
    }

    #[test]
    fn test_load_uses_saved_state() {
        let mut state = AppStateData::default();
        state.exam_results.push(result(&[true, true]));
        let tracker = ProgressTracker::load(Box::new(MemoryStore::with_state(state)));
        assert_eq!(tracker.results().len(), 1);
        assert!(tracker.user().is_some());
    }

    #[test]
    fn test_review_paper_prefers_most_missed() {
        let now = Utc::now();
        let mut bank = Vec::new();
        for (id, count, subject) in [
            ("m1", 1, Subject::Math),
            ("m2", 4, Subject::Math),
            ("h1", 9, Subject::History),
            ("m3", 2, Subject::Math),
        ] {
            bank.push(MistakeRecord {
                id: format!("mistake_{id}"),
                question: question(id, subject),
                last_attempt_date: now,
                incorrect_count: count,
            });
        }

        let review = build_review_paper(&bank, Some(Subject::Math), 2, 15, now).unwrap();
        let ids: Vec<&str> = review.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m3"]);
        assert_eq!(review.total_points, 10);
        assert_eq!(review.subject, Subject::Math);

        let all = build_review_paper(&bank, None, 10, 15, now).unwrap();
        assert_eq!(all.questions[0].id, "h1");
        assert!(build_review_paper(&bank, Some(Subject::Biology), 5, 15, now).is_none());
    }
}
