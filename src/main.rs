use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use rust_i18n::t;

rust_i18n::i18n!("locales", fallback = "en");

use examdr::app::{App, AppScreen, ConfirmAction, FormField, StatusKind};
use examdr::config::Config;
use examdr::event::{AppEvent, EventHandler};
use examdr::gateway::demo::DemoGateway;
use examdr::gateway::{ExamAi, OfflineGateway};
use examdr::logging;
use examdr::store::json_store::JsonStore;
use examdr::store::paper_cache::PaperCache;
use examdr::store::{MemoryStore, StateStore};
use examdr::ui::components::dashboard::HistoryDashboard;
use examdr::ui::components::exam_view::{QuestionNavigator, QuestionView};
use examdr::ui::components::generator_form::GeneratorFormView;
use examdr::ui::components::menu::MenuAction;
use examdr::ui::components::mistake_list::MistakeList;
use examdr::ui::components::progress_bar::ProgressBar;
use examdr::ui::components::result_view::ResultView;
use examdr::ui::layout::{AppLayout, centered_rect, pack_hint_lines};
use examdr::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "examdr",
    version,
    about = "Terminal exam practice with AI-composed papers and a mistake bank"
)]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Number of questions per generated paper")]
    questions: Option<usize>,

    #[arg(long, help = "Use the bundled sample papers instead of the AI service")]
    demo: bool,

    #[arg(long, value_name = "PATH", help = "Write a backup of config and history, then exit")]
    export: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Restore a backup written by --export, then exit")]
    import: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {e:#}");
        Config::default()
    });
    if let Some(count) = cli.questions {
        config.question_count = count;
    }
    if let Some(theme) = cli.theme.clone() {
        config.theme = theme;
    }
    config.validate();
    rust_i18n::set_locale(&config.locale);

    let _log_guard = logging::init(&config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "examdr starting");

    if let Some(path) = cli.export {
        return export_backup(&config, &path);
    }
    if let Some(path) = cli.import {
        return import_backup(&config, &path);
    }

    let store: Box<dyn StateStore> = match JsonStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("data directory unavailable, history will not be saved: {e:#}");
            Box::new(MemoryStore::new())
        }
    };
    let gateway = build_gateway(&config, cli.demo);
    tracing::info!(gateway = gateway.name(), "AI gateway selected");
    let theme = Theme::load(&config.theme).unwrap_or_default().leak();

    let mut app = App::new(config, gateway, store, PaperCache::new(), theme);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(200));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!("event loop failed: {err:#}");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn build_gateway(config: &Config, demo: bool) -> Arc<dyn ExamAi> {
    if demo {
        return Arc::new(DemoGateway::new(config.default_duration_minutes));
    }
    online_gateway(config).unwrap_or_else(|| Arc::new(OfflineGateway))
}

#[cfg(feature = "network")]
fn online_gateway(config: &Config) -> Option<Arc<dyn ExamAi>> {
    match examdr::gateway::gemini::GeminiGateway::from_config(config) {
        Ok(gateway) => Some(Arc::new(gateway)),
        Err(e) => {
            tracing::warn!("AI service not configured: {e}");
            None
        }
    }
}

#[cfg(not(feature = "network"))]
fn online_gateway(_config: &Config) -> Option<Arc<dyn ExamAi>> {
    tracing::warn!("built without the network feature");
    None
}

fn export_backup(config: &Config, path: &std::path::Path) -> Result<()> {
    let store = JsonStore::new()?;
    let state = store.load_state()?.unwrap_or_default();
    let data = store.export_all(config, &state);
    store.export_to(path, &data)?;
    tracing::info!(path = %path.display(), "backup exported");
    println!("{}", t!("cli.exported", path = path.display().to_string()));
    Ok(())
}

/// Restores history and settings. The local API key is kept.
fn import_backup(config: &Config, path: &std::path::Path) -> Result<()> {
    let store = JsonStore::new()?;
    let data = JsonStore::read_export(path)?;
    store.import_all(&data)?;

    let mut imported = data.config;
    imported.api_key = config.api_key.clone();
    imported.validate();
    imported.save()?;
    tracing::info!(path = %path.display(), "backup imported");
    println!("{}", t!("cli.imported", path = path.display().to_string()));
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick | AppEvent::Resize => {}
        }
        // Keys arriving faster than the tick rate must not stall the clock.
        app.on_tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // Confirmation dialog takes priority
    if app.confirm.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_yes(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_no(),
            _ => {}
        }
        return;
    }

    match app.screen {
        AppScreen::Menu => handle_menu_key(app, key),
        AppScreen::Generator => handle_generator_key(app, key),
        AppScreen::Generating => handle_generating_key(app, key),
        AppScreen::Exam => handle_exam_key(app, key),
        AppScreen::ExamResult => handle_result_key(app, key),
        AppScreen::Dashboard => handle_dashboard_key(app, key),
        AppScreen::Mistakes => handle_mistakes_key(app, key),
    }
}

fn run_menu_action(app: &mut App, action: MenuAction) {
    app.clear_status();
    match action {
        MenuAction::NewExam => app.go_to_generator(),
        MenuAction::ReviewMistakes => app.start_review(),
        MenuAction::Dashboard => app.go_to_dashboard(),
        MenuAction::MistakeBank => app.go_to_mistakes(),
        MenuAction::Quit => app.should_quit = true,
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.menu.prev(),
        KeyCode::Down | KeyCode::Char('j') => app.menu.next(),
        KeyCode::Enter => {
            if let Some(action) = app.menu.selected_action() {
                run_menu_action(app, action);
            }
        }
        KeyCode::Char(ch) => {
            if let Some(action) = app.menu.action_for_key(ch) {
                run_menu_action(app, action);
            }
        }
        _ => {}
    }
}

fn handle_generator_key(app: &mut App, key: KeyEvent) {
    let chapters_focused = app.form.field == FormField::Chapters;
    match key.code {
        KeyCode::Esc => {
            app.clear_status();
            app.go_to_menu();
        }
        KeyCode::Tab => app.form.next_field(),
        KeyCode::BackTab => app.form.prev_field(),
        KeyCode::Left | KeyCode::Char('h') => app.form.adjust(false, &app.curriculum),
        KeyCode::Right | KeyCode::Char('l') => app.form.adjust(true, &app.curriculum),
        KeyCode::Down | KeyCode::Char('j') if chapters_focused => app.form.cursor_down(),
        KeyCode::Up | KeyCode::Char('k') if chapters_focused => app.form.cursor_up(),
        KeyCode::Down | KeyCode::Char('j') => app.form.next_field(),
        KeyCode::Up | KeyCode::Char('k') => app.form.prev_field(),
        KeyCode::Char(' ') if chapters_focused => app.form.toggle_chapter(),
        KeyCode::Char('a') => app.form.select_all_chapters(),
        KeyCode::Enter => app.request_paper(),
        _ => {}
    }
}

fn handle_generating_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_generation();
    }
}

fn handle_exam_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            app.request_submit();
        }
        return;
    }
    match key.code {
        KeyCode::Esc => app.request_leave_exam(),
        KeyCode::Right | KeyCode::Tab | KeyCode::Enter => {
            app.session.next();
        }
        KeyCode::Left | KeyCode::BackTab => {
            app.session.previous();
        }
        KeyCode::Home => {
            app.session.navigate(0);
        }
        KeyCode::End => {
            let last = app.session.question_count().saturating_sub(1);
            app.session.navigate(last);
        }
        KeyCode::Backspace => app.exam_backspace(),
        KeyCode::Char(ch) => app.exam_char(ch),
        _ => {}
    }
}

fn handle_result_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.go_to_menu(),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_result(true),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_result(false),
        KeyCode::Char('r') => app.retake_last_paper(),
        KeyCode::Char('n') => app.go_to_generator(),
        KeyCode::Char('c') => app.request_commentary(),
        KeyCode::Char('d') => app.go_to_dashboard(),
        _ => {}
    }
}

fn handle_dashboard_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.go_to_menu(),
        KeyCode::Down | KeyCode::Char('j') => app.history_down(),
        KeyCode::Up | KeyCode::Char('k') => app.history_up(),
        KeyCode::Enter => app.open_selected_history(),
        _ => {}
    }
}

fn handle_mistakes_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.go_to_menu(),
        KeyCode::Down | KeyCode::Char('j') => app.mistake_down(),
        KeyCode::Up | KeyCode::Char('k') => app.mistake_up(),
        KeyCode::Char('a') => app.request_analysis(),
        KeyCode::Char('r') => app.start_review(),
        _ => {}
    }
}

fn footer_hints(app: &App) -> Vec<String> {
    let hints = match app.screen {
        AppScreen::Menu => vec![t!("hint.move"), t!("hint.select"), t!("hint.quit")],
        AppScreen::Generator => vec![
            t!("hint.field"),
            t!("hint.change"),
            t!("hint.toggle"),
            t!("hint.all"),
            t!("hint.generate"),
            t!("hint.back"),
        ],
        AppScreen::Generating => vec![t!("hint.cancel")],
        AppScreen::Exam => vec![
            t!("hint.question"),
            t!("hint.answer"),
            t!("hint.submit"),
            t!("hint.leave"),
        ],
        AppScreen::ExamResult => vec![
            t!("hint.scroll"),
            t!("hint.retake"),
            t!("hint.new_paper"),
            t!("hint.commentary"),
            t!("hint.dashboard"),
            t!("hint.back"),
        ],
        AppScreen::Dashboard => vec![t!("hint.move"), t!("hint.open"), t!("hint.back")],
        AppScreen::Mistakes => vec![
            t!("hint.move"),
            t!("hint.analyze"),
            t!("hint.review"),
            t!("hint.back"),
        ],
    };
    hints.into_iter().map(|h| h.into_owned()).collect()
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let hints = footer_hints(app);
    let hint_refs: Vec<&str> = hints.iter().map(String::as_str).collect();
    let footer_lines = pack_hint_lines(&hint_refs, area.width as usize);
    let layout = AppLayout::new(area, footer_lines.len() as u16);

    render_header(frame, app, layout.header);

    match app.screen {
        AppScreen::Menu => render_menu(frame, app, layout.main),
        AppScreen::Generator => render_generator(frame, app, layout.main),
        AppScreen::Generating => render_generating(frame, app, layout.main),
        AppScreen::Exam => render_exam(frame, app, layout.main),
        AppScreen::ExamResult => render_result(frame, app, layout.main),
        AppScreen::Dashboard => render_dashboard(frame, app, layout.main),
        AppScreen::Mistakes => render_mistakes(frame, app, layout.main),
    }

    if let Some(status) = &app.status {
        let color = match status.kind {
            StatusKind::Info => colors.success(),
            StatusKind::Error => colors.error(),
        };
        let line = Paragraph::new(Line::from(Span::styled(
            format!(" {}", status.text),
            Style::default().fg(color),
        )));
        frame.render_widget(line, layout.status);
    }

    let footer = Paragraph::new(
        footer_lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(colors.text_muted()))))
            .collect::<Vec<_>>(),
    );
    frame.render_widget(footer, layout.footer);

    if let Some(action) = app.confirm {
        render_confirm(frame, app, action);
    }
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let colors = &app.theme.colors;
    let user = app
        .progress
        .user()
        .map(|u| format!(" {} ", u.username))
        .unwrap_or_default();
    let stats = app.stats();
    let info = format!(
        " {} | {}",
        t!("header.exams", count = stats.exam_count),
        t!("header.mistakes", count = stats.mistake_count),
    );
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " examdr ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(user, Style::default().fg(colors.accent()).bg(colors.header_bg())),
        Span::styled(info, Style::default().fg(colors.header_fg()).bg(colors.header_bg())),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

fn render_menu(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let menu_area = centered_rect(50, 80, area);
    frame.render_widget(&app.menu, menu_area);
}

fn render_generator(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let form = GeneratorFormView::new(&app.form, &app.curriculum, app.theme);
    frame.render_widget(form, area);
}

fn render_generating(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
    let colors = &app.theme.colors;
    let elapsed = app
        .generating_since
        .map(|since| since.elapsed().as_secs())
        .unwrap_or(0);
    let spinner = SPINNER[(elapsed as usize) % SPINNER.len()];

    let popup = centered_rect(50, 30, area);
    let block = Block::bordered()
        .title(format!(" {} ", t!("generating.title")))
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{spinner} {}",
                t!(
                    "generating.progress",
                    subject = app.form.subject().label(),
                    count = app.form.count
                )
            ),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            t!("generating.elapsed", secs = elapsed).to_string(),
            Style::default().fg(colors.text_muted()),
        )),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block),
        popup,
    );
}

fn render_exam(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let colors = &app.theme.colors;
    let session = &app.session;
    let (Some(paper), Some(question)) = (session.paper(), session.current_question()) else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(8),
        ])
        .split(area);

    let low = session.clock().is_some_and(|c| c.is_low());
    let clock_style = if low {
        Style::default()
            .fg(colors.error())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colors.accent())
    };
    let clock = session.clock().map(|c| c.display()).unwrap_or_default();
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", paper.title),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("· {} · ", paper.difficulty.label()),
            Style::default().fg(colors.text_muted()),
        ),
        Span::styled(format!("⏱ {clock}"), clock_style),
    ]));
    frame.render_widget(title, rows[0]);

    let progress = ProgressBar::new(
        &t!("exam.answered"),
        session.answered_count(),
        session.question_count(),
        app.theme,
    );
    frame.render_widget(progress, rows[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(rows[2]);
    let view = QuestionView::new(
        question,
        session.current_index(),
        session.question_count(),
        session.answer_value(&question.id),
        app.theme,
    );
    frame.render_widget(view, body[0]);
    let nav = QuestionNavigator::new(session.answers(), session.current_index(), app.theme);
    frame.render_widget(nav, body[1]);
}

fn render_result(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    if let Some(ref result) = app.last_result {
        let view = ResultView {
            result,
            paper: app.last_paper.as_ref(),
            commentary: &app.commentary,
            scroll: app.result_scroll,
            theme: app.theme,
        };
        frame.render_widget(view, area);
    }
}

fn render_dashboard(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let stats = app.stats();
    let dashboard = HistoryDashboard::new(
        &stats,
        app.progress.results(),
        app.history_selected,
        app.theme,
    );
    frame.render_widget(dashboard, area);
}

fn render_mistakes(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let list = MistakeList::new(
        app.progress.mistakes(),
        app.mistake_selected,
        &app.analysis,
        app.theme,
    );
    frame.render_widget(list, area);
}

fn render_confirm(frame: &mut ratatui::Frame, app: &App, action: ConfirmAction) {
    let colors = &app.theme.colors;
    let popup = centered_rect(40, 20, frame.area());

    let (title, body) = match action {
        ConfirmAction::Submit => {
            let unanswered = app
                .session
                .question_count()
                .saturating_sub(app.session.answered_count());
            let body = if unanswered > 0 {
                t!("confirm.submit_unanswered", count = unanswered)
            } else {
                t!("confirm.submit")
            };
            (t!("confirm.submit_title"), body)
        }
        ConfirmAction::LeaveExam => (t!("confirm.leave_title"), t!("confirm.leave")),
    };

    let block = Block::bordered()
        .title(format!(" {title} "))
        .border_style(Style::default().fg(colors.warning()))
        .style(Style::default().bg(colors.bg()));
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(body.into_owned(), Style::default().fg(colors.fg()))),
        Line::from(""),
        Line::from(Span::styled(
            t!("confirm.keys").to_string(),
            Style::default().fg(colors.text_muted()),
        )),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block),
        popup,
    );
}
