use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::app::{FormField, GeneratorForm};
use crate::exam::curriculum::Curriculum;
use crate::ui::theme::Theme;

pub struct GeneratorFormView<'a> {
    form: &'a GeneratorForm,
    curriculum: &'a Curriculum,
    theme: &'a Theme,
}

impl<'a> GeneratorFormView<'a> {
    pub fn new(form: &'a GeneratorForm, curriculum: &'a Curriculum, theme: &'a Theme) -> Self {
        Self {
            form,
            curriculum,
            theme,
        }
    }

    fn field_block(&self, field: FormField, title: &str) -> Block<'static> {
        let colors = &self.theme.colors;
        let border = if self.form.field == field {
            colors.border_focused()
        } else {
            colors.border()
        };
        Block::bordered()
            .title(format!(" {title} "))
            .border_style(Style::default().fg(border))
    }

    fn value_line(&self, field: FormField, value: String) -> Line<'static> {
        let colors = &self.theme.colors;
        let focused = self.form.field == field;
        let style = if focused {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        Line::from(vec![
            Span::styled("◀ ", Style::default().fg(colors.text_muted())),
            Span::styled(value, style),
            Span::styled(" ▶", Style::default().fg(colors.text_muted())),
        ])
    }

    fn render_chapters(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let chapters = self.curriculum.chapters(self.form.subject());
        let picked = self.form.selected.iter().filter(|on| **on).count();
        let block = self.field_block(
            FormField::Chapters,
            &t!("generator.chapters", picked = picked, total = chapters.len()),
        );
        let height = block.inner(area).height as usize;
        let focused = self.form.field == FormField::Chapters;

        if chapters.is_empty() {
            Paragraph::new(t!("generator.no_chapters").to_string())
                .style(Style::default().fg(colors.text_muted()))
                .block(block)
                .render(area, buf);
            return;
        }

        let first = self
            .form
            .chapter_cursor
            .saturating_sub(height.saturating_sub(1));
        let lines: Vec<Line> = chapters
            .iter()
            .enumerate()
            .skip(first)
            .take(height)
            .map(|(i, name)| {
                let on = self.form.selected.get(i).copied().unwrap_or(false);
                let marker = if on { "[x]" } else { "[ ]" };
                let style = if focused && i == self.form.chapter_cursor {
                    Style::default()
                        .fg(colors.highlight_fg())
                        .bg(colors.highlight_bg())
                } else if on {
                    Style::default().fg(colors.accent())
                } else {
                    Style::default().fg(colors.fg())
                };
                Line::from(Span::styled(format!(" {marker} {name}"), style))
            })
            .collect();
        Paragraph::new(lines).block(block).render(area, buf);
    }
}

impl Widget for GeneratorFormView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let outer = Block::bordered()
            .title(format!(" {} ", t!("generator.title")))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = outer.inner(area);
        outer.render(area, buf);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(inner);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(columns[0]);

        let subject = self.form.subject();
        Paragraph::new(self.value_line(FormField::Subject, subject.label().to_string()))
            .block(self.field_block(FormField::Subject, &t!("generator.subject")))
            .render(left[0], buf);
        Paragraph::new(self.value_line(
            FormField::Difficulty,
            self.form.difficulty().label().to_string(),
        ))
        .block(self.field_block(FormField::Difficulty, &t!("generator.difficulty")))
        .render(left[1], buf);
        Paragraph::new(self.value_line(FormField::Count, self.form.count.to_string()))
            .block(self.field_block(FormField::Count, &t!("generator.count")))
            .render(left[2], buf);

        self.render_chapters(columns[1], buf);
    }
}
