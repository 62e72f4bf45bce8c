use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_i18n::t;

use crate::config::Config;
use crate::engine::history::{ProgressTracker, build_review_paper};
use crate::engine::stats::DashboardStats;
use crate::exam::curriculum::Curriculum;
use crate::exam::model::{
    ALL_DIFFICULTIES, ALL_SUBJECTS, Difficulty, ExamPaper, ExamResult, Subject,
};
use crate::gateway::prompt::mistake_summary;
use crate::gateway::task::{PendingTask, TaskPoll};
use crate::gateway::{
    self, ANALYSIS_FAILURE, COMMENTARY_FALLBACK, ExamAi, GatewayError, PaperRequest,
};
use crate::session::{ExamSession, SessionPhase, SubmitTrigger};
use crate::store::StateStore;
use crate::store::paper_cache::PaperCache;
use crate::ui::components::menu::Menu;
use crate::ui::theme::Theme;

pub const MAX_QUESTIONS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Menu,
    Generator,
    Generating,
    Exam,
    ExamResult,
    Dashboard,
    Mistakes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    Submit,
    LeaveExam,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

/// Text fetched in the background for the result or mistake screens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AiText {
    #[default]
    Idle,
    Loading,
    Ready(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Subject,
    Chapters,
    Difficulty,
    Count,
}

const FORM_FIELDS: [FormField; 4] = [
    FormField::Subject,
    FormField::Chapters,
    FormField::Difficulty,
    FormField::Count,
];

/// Paper parameters picked on the generator screen.
#[derive(Clone, Debug)]
pub struct GeneratorForm {
    pub field: FormField,
    pub subject_index: usize,
    pub difficulty_index: usize,
    pub chapter_cursor: usize,
    pub selected: Vec<bool>,
    pub count: usize,
}

impl GeneratorForm {
    pub fn new(curriculum: &Curriculum, count: usize) -> Self {
        let difficulty_index = ALL_DIFFICULTIES
            .iter()
            .position(|d| *d == Difficulty::default())
            .unwrap_or(0);
        let mut form = Self {
            field: FormField::Subject,
            subject_index: 0,
            difficulty_index,
            chapter_cursor: 0,
            selected: Vec::new(),
            count: count.clamp(1, MAX_QUESTIONS),
        };
        form.reset_chapters(curriculum);
        form
    }

    pub fn subject(&self) -> Subject {
        ALL_SUBJECTS[self.subject_index % ALL_SUBJECTS.len()]
    }

    pub fn difficulty(&self) -> Difficulty {
        ALL_DIFFICULTIES[self.difficulty_index % ALL_DIFFICULTIES.len()]
    }

    fn reset_chapters(&mut self, curriculum: &Curriculum) {
        self.selected = vec![false; curriculum.chapters(self.subject()).len()];
        self.chapter_cursor = 0;
    }

    /// Selected chapter names in catalogue order.
    pub fn chapters(&self, curriculum: &Curriculum) -> Vec<String> {
        curriculum
            .chapters(self.subject())
            .iter()
            .zip(&self.selected)
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn next_field(&mut self) {
        let i = FORM_FIELDS.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = FORM_FIELDS[(i + 1) % FORM_FIELDS.len()];
    }

    pub fn prev_field(&mut self) {
        let i = FORM_FIELDS.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = FORM_FIELDS[(i + FORM_FIELDS.len() - 1) % FORM_FIELDS.len()];
    }

    /// Left/right on the focused field. Changing subject clears the chapter selection.
    pub fn adjust(&mut self, forward: bool, curriculum: &Curriculum) {
        let step = |i: usize, n: usize| if forward { (i + 1) % n } else { (i + n - 1) % n };
        match self.field {
            FormField::Subject => {
                self.subject_index = step(self.subject_index, ALL_SUBJECTS.len());
                self.reset_chapters(curriculum);
            }
            FormField::Difficulty => {
                self.difficulty_index = step(self.difficulty_index, ALL_DIFFICULTIES.len());
            }
            FormField::Count => {
                self.count = if forward {
                    (self.count + 1).min(MAX_QUESTIONS)
                } else {
                    self.count.saturating_sub(1).max(1)
                };
            }
            FormField::Chapters => {
                if forward {
                    self.cursor_down();
                } else {
                    self.cursor_up();
                }
            }
        }
    }

    pub fn cursor_down(&mut self) {
        if self.chapter_cursor + 1 < self.selected.len() {
            self.chapter_cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.chapter_cursor = self.chapter_cursor.saturating_sub(1);
    }

    pub fn toggle_chapter(&mut self) {
        if let Some(on) = self.selected.get_mut(self.chapter_cursor) {
            *on = !*on;
        }
    }

    pub fn select_all_chapters(&mut self) {
        let all_on = self.selected.iter().all(|on| *on);
        self.selected.iter_mut().for_each(|on| *on = !all_on);
    }
}

pub struct App {
    pub screen: AppScreen,
    pub config: Config,
    pub theme: &'static Theme,
    pub menu: Menu<'static>,
    pub curriculum: Curriculum,
    pub form: GeneratorForm,
    pub session: ExamSession,
    pub progress: ProgressTracker,
    pub papers: Option<PaperCache>,
    pub gateway: Arc<dyn ExamAi>,
    pub last_result: Option<ExamResult>,
    /// Paper behind `last_result`; `None` when an archived paper is missing.
    pub last_paper: Option<ExamPaper>,
    pub commentary: AiText,
    pub analysis: AiText,
    pub confirm: Option<ConfirmAction>,
    pub status: Option<StatusMessage>,
    pub generating_since: Option<Instant>,
    pub history_selected: usize,
    pub mistake_selected: usize,
    pub result_scroll: u16,
    pub should_quit: bool,
    paper_task: Option<PendingTask<Result<ExamPaper, GatewayError>>>,
    commentary_task: Option<PendingTask<String>>,
    analysis_task: Option<PendingTask<String>>,
}

impl App {
    pub fn new(
        config: Config,
        gateway: Arc<dyn ExamAi>,
        store: Box<dyn StateStore>,
        papers: Option<PaperCache>,
        theme: &'static Theme,
    ) -> Self {
        let curriculum = Curriculum::load();
        let form = GeneratorForm::new(&curriculum, config.question_count);
        let progress = ProgressTracker::load(store);
        Self {
            screen: AppScreen::Menu,
            config,
            theme,
            menu: Menu::new(theme),
            curriculum,
            form,
            session: ExamSession::new(),
            progress,
            papers,
            gateway,
            last_result: None,
            last_paper: None,
            commentary: AiText::Idle,
            analysis: AiText::Idle,
            confirm: None,
            status: None,
            generating_since: None,
            history_selected: 0,
            mistake_selected: 0,
            result_scroll: 0,
            should_quit: false,
            paper_task: None,
            commentary_task: None,
            analysis_task: None,
        }
    }

    pub fn set_theme(&mut self, theme: &'static Theme) {
        self.theme = theme;
        self.menu.theme = theme;
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Info,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: StatusKind::Error,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::compute(self.progress.results(), self.progress.mistakes())
    }

    pub fn go_to_menu(&mut self) {
        self.screen = AppScreen::Menu;
        self.confirm = None;
    }

    pub fn go_to_generator(&mut self) {
        self.screen = AppScreen::Generator;
    }

    pub fn go_to_dashboard(&mut self) {
        self.history_selected = 0;
        self.screen = AppScreen::Dashboard;
    }

    pub fn go_to_mistakes(&mut self) {
        self.mistake_selected = 0;
        self.screen = AppScreen::Mistakes;
    }

    // Paper generation

    pub fn request_paper(&mut self) {
        if self.paper_task.is_some() {
            return;
        }
        let request = PaperRequest::new(
            self.form.subject(),
            self.form.chapters(&self.curriculum),
            self.form.difficulty(),
            self.form.count,
        );
        if let Err(e) = request.validate() {
            tracing::debug!("paper request rejected: {e}");
            self.error(t!("generator.need_chapter"));
            return;
        }
        self.clear_status();
        self.paper_task = Some(gateway::spawn_paper(self.gateway.clone(), request));
        self.generating_since = Some(Instant::now());
        self.screen = AppScreen::Generating;
    }

    /// Abandon an in-flight generation. Its result is discarded when it arrives.
    pub fn cancel_generation(&mut self) {
        if self.paper_task.take().is_some() {
            tracing::info!("paper generation abandoned");
        }
        self.generating_since = None;
        self.screen = AppScreen::Generator;
    }

    pub fn is_generating(&self) -> bool {
        self.paper_task.is_some()
    }

    fn paper_failed(&mut self, err: &GatewayError) {
        tracing::warn!("paper generation failed: {err}");
        let reason = err.to_string();
        let text = if matches!(err, GatewayError::MissingApiKey) {
            t!("generator.no_api_key")
        } else if err.is_retryable() {
            t!("generator.failed_retry", reason = reason)
        } else {
            t!("generator.failed", reason = reason)
        };
        self.error(text);
        self.generating_since = None;
        self.screen = AppScreen::Generator;
    }

    // Exam lifecycle

    pub fn begin_exam(&mut self, paper: ExamPaper) {
        if let Some(cache) = &self.papers {
            if !cache.put(&paper) {
                tracing::warn!(paper_id = %paper.id, "could not archive paper");
            }
        }
        let mut session = ExamSession::new();
        match session.start(paper) {
            Ok(()) => {
                self.session = session;
                self.confirm = None;
                self.clear_status();
                self.screen = AppScreen::Exam;
            }
            Err(e) => {
                tracing::warn!("exam not started: {e}");
                self.error(t!("exam.not_started", reason = e.to_string()));
            }
        }
    }

    pub fn retake_last_paper(&mut self) {
        if let Some(paper) = self.last_paper.clone() {
            self.begin_exam(paper);
        }
    }

    /// Practice paper built from the most-missed mistake records.
    pub fn start_review(&mut self) {
        let paper = build_review_paper(
            self.progress.mistakes(),
            None,
            self.config.question_count,
            self.config.default_duration_minutes,
            Utc::now(),
        );
        match paper {
            Some(paper) => self.begin_exam(paper),
            None => self.info(t!("mistakes.nothing_to_review")),
        }
    }

    pub fn request_submit(&mut self) {
        if self.session.is_in_progress() {
            self.confirm = Some(ConfirmAction::Submit);
        }
    }

    pub fn request_leave_exam(&mut self) {
        if self.session.is_in_progress() {
            self.confirm = Some(ConfirmAction::LeaveExam);
        }
    }

    pub fn confirm_yes(&mut self) {
        match self.confirm.take() {
            Some(ConfirmAction::Submit) => self.submit(SubmitTrigger::Manual),
            Some(ConfirmAction::LeaveExam) => {
                self.session.cancel();
                self.go_to_menu();
            }
            None => {}
        }
    }

    pub fn confirm_no(&mut self) {
        self.confirm = None;
    }

    pub fn submit(&mut self, trigger: SubmitTrigger) {
        if let Some(result) = self.session.submit(trigger) {
            self.finish_exam(result);
        }
    }

    /// Persist a finished result and ask for commentary in the background.
    fn finish_exam(&mut self, result: ExamResult) {
        self.confirm = None;
        let Some(paper) = self.session.paper().cloned() else {
            return;
        };
        if let Err(e) = self.progress.record_result(&result, &paper, Utc::now()) {
            self.error(t!("status.save_failed", reason = format!("{e:#}")));
        } else if self.session.trigger() == Some(SubmitTrigger::Timeout) {
            self.info(t!("exam.time_up"));
        } else {
            self.clear_status();
        }

        self.commentary_task = Some(gateway::spawn_commentary(
            self.gateway.clone(),
            result.clone(),
            paper.clone(),
        ));
        self.commentary = AiText::Loading;
        self.last_result = Some(result);
        self.last_paper = Some(paper);
        self.result_scroll = 0;
        self.screen = AppScreen::ExamResult;
    }

    /// Reopen a stored result. The paper comes from the archive when available.
    pub fn open_result(&mut self, index: usize) {
        let Some(result) = self.progress.results().get(index).cloned() else {
            return;
        };
        self.last_paper = self.papers.as_ref().and_then(|c| c.get(&result.paper_id));
        self.last_result = Some(result);
        self.commentary_task = None;
        self.commentary = AiText::Idle;
        self.result_scroll = 0;
        self.screen = AppScreen::ExamResult;
    }

    pub fn request_commentary(&mut self) {
        if self.commentary == AiText::Loading {
            return;
        }
        let (Some(result), Some(paper)) = (self.last_result.clone(), self.last_paper.clone())
        else {
            return;
        };
        self.commentary_task = Some(gateway::spawn_commentary(
            self.gateway.clone(),
            result,
            paper,
        ));
        self.commentary = AiText::Loading;
    }

    pub fn request_analysis(&mut self) {
        if self.analysis == AiText::Loading {
            return;
        }
        let summary = mistake_summary(self.progress.mistakes());
        self.analysis_task = Some(gateway::spawn_analysis(self.gateway.clone(), summary));
        self.analysis = AiText::Loading;
    }

    // Exam input

    pub fn exam_char(&mut self, ch: char) {
        let Some(kind) = self.session.current_question().map(|q| q.kind) else {
            return;
        };
        if kind.is_choice() {
            self.session.toggle_option(ch.to_ascii_uppercase());
        } else {
            self.session.push_char(ch);
        }
    }

    pub fn exam_backspace(&mut self) {
        self.session.pop_char();
    }

    // Ticks

    /// Advance the exam clock and collect finished background work.
    pub fn on_tick(&mut self, now: Instant) {
        if self.session.phase() == SessionPhase::InProgress {
            if let Some(result) = self.session.advance_clock(now) {
                self.finish_exam(result);
            }
        }
        self.poll_paper();
        self.poll_commentary();
        self.poll_analysis();
    }

    fn poll_paper(&mut self) {
        let Some(task) = &self.paper_task else {
            return;
        };
        match task.poll() {
            TaskPoll::Pending => {}
            TaskPoll::Ready(outcome) => {
                self.paper_task = None;
                self.generating_since = None;
                match outcome {
                    Ok(paper) => self.begin_exam(paper),
                    Err(e) => self.paper_failed(&e),
                }
            }
            TaskPoll::Lost => {
                self.paper_task = None;
                self.paper_failed(&GatewayError::Unavailable("worker stopped".to_string()));
            }
        }
    }

    fn poll_commentary(&mut self) {
        let Some(task) = &self.commentary_task else {
            return;
        };
        let text = match task.poll() {
            TaskPoll::Pending => return,
            TaskPoll::Ready(text) => text,
            TaskPoll::Lost => COMMENTARY_FALLBACK.to_string(),
        };
        self.commentary_task = None;
        self.commentary = AiText::Ready(text);
    }

    fn poll_analysis(&mut self) {
        let Some(task) = &self.analysis_task else {
            return;
        };
        let text = match task.poll() {
            TaskPoll::Pending => return,
            TaskPoll::Ready(text) => text,
            TaskPoll::Lost => ANALYSIS_FAILURE.to_string(),
        };
        self.analysis_task = None;
        self.analysis = AiText::Ready(text);
    }

    // List navigation

    pub fn history_down(&mut self) {
        let len = self.stats().recent.len();
        if self.history_selected + 1 < len {
            self.history_selected += 1;
        }
    }

    pub fn history_up(&mut self) {
        self.history_selected = self.history_selected.saturating_sub(1);
    }

    pub fn open_selected_history(&mut self) {
        if let Some(&index) = self.stats().recent.get(self.history_selected) {
            self.open_result(index);
        }
    }

    pub fn mistake_down(&mut self) {
        if self.mistake_selected + 1 < self.progress.mistakes().len() {
            self.mistake_selected += 1;
        }
    }

    pub fn mistake_up(&mut self) {
        self.mistake_selected = self.mistake_selected.saturating_sub(1);
    }

    pub fn scroll_result(&mut self, down: bool) {
        self.result_scroll = if down {
            self.result_scroll.saturating_add(1)
        } else {
            self.result_scroll.saturating_sub(1)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::demo::DemoGateway;
    use crate::store::MemoryStore;

    fn make_app() -> (App, MemoryStore) {
        let store = MemoryStore::new();
        let app = App::new(
            Config::default(),
            Arc::new(DemoGateway::new(45)),
            Box::new(store.clone()),
            None,
            Theme::default().leak(),
        );
        (app, store)
    }

    #[test]
    fn test_form_subject_change_clears_chapters() {
        let (mut app, _) = make_app();
        app.form.field = FormField::Chapters;
        app.form.toggle_chapter();
        assert_eq!(app.form.chapters(&app.curriculum).len(), 1);

        app.form.field = FormField::Subject;
        app.form.adjust(true, &app.curriculum);
        assert_eq!(app.form.subject(), Subject::Chinese);
        assert!(app.form.chapters(&app.curriculum).is_empty());
    }

    #[test]
    fn test_form_count_is_bounded() {
        let (mut app, _) = make_app();
        app.form.field = FormField::Count;
        app.form.count = 1;
        app.form.adjust(false, &app.curriculum);
        assert_eq!(app.form.count, 1);
        app.form.count = MAX_QUESTIONS;
        app.form.adjust(true, &app.curriculum);
        assert_eq!(app.form.count, MAX_QUESTIONS);
    }

    #[test]
    fn test_request_without_chapters_stays_on_form() {
        let (mut app, _) = make_app();
        app.go_to_generator();
        app.request_paper();
        assert_eq!(app.screen, AppScreen::Generator);
        assert!(!app.is_generating());
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn test_leave_exam_records_nothing() {
        let (mut app, store) = make_app();
        let paper = DemoGateway::new(45)
            .generate_paper(&PaperRequest::new(
                Subject::Math,
                vec!["有理数".to_string()],
                Difficulty::Easy,
                3,
            ))
            .unwrap();
        app.begin_exam(paper);
        assert_eq!(app.screen, AppScreen::Exam);

        app.request_leave_exam();
        assert_eq!(app.confirm, Some(ConfirmAction::LeaveExam));
        app.confirm_yes();
        assert_eq!(app.screen, AppScreen::Menu);
        assert!(app.progress.results().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_review_with_empty_bank_is_a_notice() {
        let (mut app, _) = make_app();
        app.start_review();
        assert_eq!(app.screen, AppScreen::Menu);
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Info));
    }
}
