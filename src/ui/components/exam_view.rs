use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::exam::model::{Question, UserAnswer, option_label};
use crate::ui::theme::Theme;

/// The current question with its options or free-text answer box.
pub struct QuestionView<'a> {
    question: &'a Question,
    index: usize,
    total: usize,
    value: &'a str,
    theme: &'a Theme,
}

impl<'a> QuestionView<'a> {
    pub fn new(
        question: &'a Question,
        index: usize,
        total: usize,
        value: &'a str,
        theme: &'a Theme,
    ) -> Self {
        Self {
            question,
            index,
            total,
            value,
            theme,
        }
    }

    fn is_chosen(&self, label: char) -> bool {
        self.value
            .split(',')
            .any(|part| part.trim().eq_ignore_ascii_case(&label.to_string()))
    }
}

impl Widget for QuestionView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let q = self.question;

        let title = t!(
            "exam.question_header",
            n = self.index + 1,
            total = self.total,
            kind = q.kind.label(),
            points = q.points
        );
        let block = Block::bordered()
            .title(format!(" {title} "))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let answer_height = if q.kind.is_choice() {
            q.options.len() as u16 * 2
        } else {
            3
        };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(answer_height)])
            .split(inner);

        let mut content = vec![Line::from(Span::styled(
            q.content.as_str(),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        ))];
        if !q.chapter.is_empty() {
            content.push(Line::from(""));
            content.push(Line::from(Span::styled(
                format!("{} · {}", q.chapter, q.difficulty.label()),
                Style::default().fg(colors.text_muted()),
            )));
        }
        Paragraph::new(content)
            .wrap(Wrap { trim: false })
            .render(layout[0], buf);

        if q.kind.is_choice() {
            let lines: Vec<Line> = q
                .options
                .iter()
                .enumerate()
                .flat_map(|(i, option)| {
                    let label = option_label(i);
                    let chosen = self.is_chosen(label);
                    let marker = if chosen { "[x]" } else { "[ ]" };
                    let style = if chosen {
                        Style::default()
                            .fg(colors.highlight_fg())
                            .bg(colors.highlight_bg())
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(colors.fg())
                    };
                    [
                        Line::from(Span::styled(format!(" {marker} {label}. {option}"), style)),
                        Line::from(""),
                    ]
                })
                .collect();
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .render(layout[1], buf);
        } else {
            let input_block = Block::bordered()
                .title(format!(" {} ", t!("exam.your_answer")))
                .border_style(Style::default().fg(colors.accent()));
            let text = Line::from(vec![
                Span::styled(self.value, Style::default().fg(colors.fg())),
                Span::styled("▏", Style::default().fg(colors.accent())),
            ]);
            Paragraph::new(text).block(input_block).render(layout[1], buf);
        }
    }
}

/// Grid of question numbers: current, answered and unanswered are styled apart.
pub struct QuestionNavigator<'a> {
    answers: &'a [UserAnswer],
    current: usize,
    theme: &'a Theme,
}

impl<'a> QuestionNavigator<'a> {
    pub fn new(answers: &'a [UserAnswer], current: usize, theme: &'a Theme) -> Self {
        Self {
            answers,
            current,
            theme,
        }
    }
}

const CELL_WIDTH: u16 = 4;

impl Widget for QuestionNavigator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("exam.navigator")))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        let per_row = (inner.width / CELL_WIDTH).max(1);
        for (i, answer) in self.answers.iter().enumerate() {
            let row = i as u16 / per_row;
            let col = i as u16 % per_row;
            if row >= inner.height {
                break;
            }
            let style = if i == self.current {
                Style::default()
                    .fg(colors.highlight_fg())
                    .bg(colors.highlight_bg())
                    .add_modifier(Modifier::BOLD)
            } else if answer.is_answered() {
                Style::default().fg(colors.bg()).bg(colors.accent())
            } else {
                Style::default().fg(colors.text_muted())
            };
            buf.set_string(
                inner.x + col * CELL_WIDTH,
                inner.y + row,
                format!("{:>3}", i + 1),
                style,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::{Difficulty, QuestionType, Subject};

    #[test]
    fn test_chosen_labels_from_joined_value() {
        let theme = Theme::default();
        let q = Question {
            id: "q".to_string(),
            kind: QuestionType::MultiChoice,
            content: "c".to_string(),
            options: vec!["a".into(), "b".into(), "c".into()],
            answer: "A,C".to_string(),
            explanation: String::new(),
            points: 5,
            subject: Subject::Math,
            chapter: String::new(),
            difficulty: Difficulty::Easy,
        };
        let view = QuestionView::new(&q, 0, 1, "A,C", &theme);
        assert!(view.is_chosen('A'));
        assert!(!view.is_chosen('B'));
        assert!(view.is_chosen('C'));
    }
}
