use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::app::AiText;
use crate::exam::model::{ExamPaper, ExamResult};
use crate::session::timer::format_clock;
use crate::ui::theme::Theme;

/// Score summary, commentary and the per-question report, in one scrollable pane.
pub struct ResultView<'a> {
    pub result: &'a ExamResult,
    pub paper: Option<&'a ExamPaper>,
    pub commentary: &'a AiText,
    pub scroll: u16,
    pub theme: &'a Theme,
}

impl ResultView<'_> {
    fn summary_lines(&self) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let r = self.result;
        let percent = r.percent();
        let correct = r.answers.iter().filter(|a| a.is_correct == Some(true)).count();
        let elapsed = u32::try_from(r.elapsed_secs().max(0)).unwrap_or(u32::MAX);

        vec![
            Line::from(Span::styled(
                r.paper_title.clone(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("  {}  ", t!("result.score")),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("{} / {}", r.score, r.total_points),
                    Style::default()
                        .fg(colors.score(percent))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  ({percent:.0}%)"),
                    Style::default().fg(colors.text_muted()),
                ),
            ]),
            Line::from(Span::styled(
                format!(
                    "  {}",
                    t!("result.correct_count", correct = correct, total = r.answers.len())
                ),
                Style::default().fg(colors.fg()),
            )),
            Line::from(Span::styled(
                format!("  {}", t!("result.time_used", time = format_clock(elapsed))),
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
        ]
    }

    fn commentary_lines(&self) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let mut lines = vec![Line::from(Span::styled(
            t!("result.commentary").to_string(),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        ))];
        match self.commentary {
            AiText::Idle => lines.push(Line::from(Span::styled(
                t!("result.commentary_hint").to_string(),
                Style::default().fg(colors.text_muted()),
            ))),
            AiText::Loading => lines.push(Line::from(Span::styled(
                t!("result.commentary_loading").to_string(),
                Style::default().fg(colors.warning()),
            ))),
            AiText::Ready(text) => lines.extend(
                text.lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(colors.fg())))),
            ),
        }
        lines.push(Line::from(""));
        lines
    }

    fn report_lines(&self) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let mut lines = vec![Line::from(Span::styled(
            t!("result.report").to_string(),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        ))];
        if self.paper.is_none() {
            lines.push(Line::from(Span::styled(
                t!("result.paper_missing").to_string(),
                Style::default().fg(colors.warning()),
            )));
        }

        for (i, answer) in self.result.answers.iter().enumerate() {
            let correct = answer.is_correct == Some(true);
            let (mark, mark_color) = if correct {
                ("✓", colors.text_correct())
            } else {
                ("✗", colors.text_incorrect())
            };
            let question = self.paper.and_then(|p| p.question(&answer.question_id));
            let heading = match question {
                Some(q) => format!("{}. [{}] {}", i + 1, q.kind.label(), q.content),
                None => format!("{}. {}", i + 1, answer.question_id),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(mark_color)),
                Span::styled(heading, Style::default().fg(colors.fg())),
            ]));

            let given = if answer.is_answered() {
                answer.user_value.clone()
            } else {
                t!("result.blank").to_string()
            };
            let mut detail = vec![Span::styled(
                format!("   {}: {given}", t!("result.your_answer")),
                Style::default().fg(mark_color),
            )];
            if let Some(q) = question {
                detail.push(Span::styled(
                    format!("   {}: {}", t!("result.correct_answer"), q.answer),
                    Style::default().fg(colors.text_correct()),
                ));
            }
            lines.push(Line::from(detail));

            if let Some(q) = question.filter(|q| !q.explanation.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("   {}", q.explanation),
                    Style::default().fg(colors.text_muted()),
                )));
            }
            lines.push(Line::from(""));
        }

        if let Some(paper) = self.paper.filter(|p| !p.sources.is_empty()) {
            lines.push(Line::from(Span::styled(
                t!("result.sources").to_string(),
                Style::default().fg(colors.accent()),
            )));
            for source in &paper.sources {
                lines.push(Line::from(Span::styled(
                    format!("  {} <{}>", source.title, source.uri),
                    Style::default().fg(colors.text_muted()),
                )));
            }
        }
        lines
    }
}

impl Widget for ResultView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("result.title")))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));

        let mut lines = self.summary_lines();
        lines.extend(self.commentary_lines());
        lines.extend(self.report_lines());

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
