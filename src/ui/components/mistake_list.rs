use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::app::AiText;
use crate::exam::model::{MistakeRecord, option_label};
use crate::gateway::prompt::excerpt;
use crate::ui::theme::Theme;

pub struct MistakeList<'a> {
    pub mistakes: &'a [MistakeRecord],
    pub selected: usize,
    pub analysis: &'a AiText,
    pub theme: &'a Theme,
}

impl<'a> MistakeList<'a> {
    pub fn new(
        mistakes: &'a [MistakeRecord],
        selected: usize,
        analysis: &'a AiText,
        theme: &'a Theme,
    ) -> Self {
        Self {
            mistakes,
            selected,
            analysis,
            theme,
        }
    }

    fn render_list(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(
                " {} ",
                t!("mistakes.title", count = self.mistakes.len())
            ))
            .border_style(Style::default().fg(colors.border()));
        let inner_height = block.inner(area).height as usize;

        // Keep the selection on screen.
        let first = self.selected.saturating_sub(inner_height.saturating_sub(1));
        let lines: Vec<Line> = self
            .mistakes
            .iter()
            .enumerate()
            .skip(first)
            .take(inner_height)
            .map(|(i, m)| {
                let style = if i == self.selected {
                    Style::default()
                        .fg(colors.highlight_fg())
                        .bg(colors.highlight_bg())
                } else {
                    Style::default().fg(colors.fg())
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:>2}x ", m.incorrect_count),
                        Style::default().fg(colors.text_incorrect()),
                    ),
                    Span::styled(
                        format!("{} {}", m.question.subject.label(), excerpt(&m.question.content, 24)),
                        style,
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).block(block).render(area, buf);
    }

    fn render_detail(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("mistakes.detail")))
            .border_style(Style::default().fg(colors.border()));
        let Some(record) = self.mistakes.get(self.selected) else {
            Paragraph::new(t!("mistakes.empty").to_string())
                .style(Style::default().fg(colors.text_muted()))
                .block(block)
                .render(area, buf);
            return;
        };

        let q = &record.question;
        let mut lines = vec![
            Line::from(Span::styled(
                format!("[{}] {} · {}", q.kind.label(), q.subject.label(), q.chapter),
                Style::default().fg(colors.text_muted()),
            )),
            Line::from(Span::styled(
                q.content.clone(),
                Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            )),
        ];
        for (i, option) in q.options.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                format!("  {}. {option}", option_label(i)),
                Style::default().fg(colors.fg()),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{}: {}", t!("result.correct_answer"), q.answer),
            Style::default().fg(colors.text_correct()),
        )));
        if !q.explanation.is_empty() {
            lines.push(Line::from(Span::styled(
                q.explanation.clone(),
                Style::default().fg(colors.text_muted()),
            )));
        }
        lines.push(Line::from(""));
        let last = record
            .last_attempt_date
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M");
        lines.push(Line::from(Span::styled(
            t!(
                "mistakes.missed",
                count = record.incorrect_count,
                last = last.to_string()
            )
            .to_string(),
            Style::default().fg(colors.warning()),
        )));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }

    fn render_analysis(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("mistakes.analysis")))
            .border_style(Style::default().fg(colors.accent()));
        let (text, color) = match self.analysis {
            AiText::Idle => (t!("mistakes.analysis_hint").to_string(), colors.text_muted()),
            AiText::Loading => (t!("mistakes.analysis_loading").to_string(), colors.warning()),
            AiText::Ready(text) => (text.clone(), colors.fg()),
        };
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

impl Widget for MistakeList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        Block::default()
            .style(Style::default().bg(colors.bg()))
            .render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[0]);

        self.render_list(top[0], buf);
        self.render_detail(top[1], buf);
        self.render_analysis(rows[1], buf);
    }
}
