use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::engine::stats::DashboardStats;
use crate::exam::model::ExamResult;
use crate::ui::components::chart::ScoreTrendChart;
use crate::ui::theme::Theme;

pub struct HistoryDashboard<'a> {
    pub stats: &'a DashboardStats,
    pub results: &'a [ExamResult],
    pub selected: usize,
    pub theme: &'a Theme,
}

impl<'a> HistoryDashboard<'a> {
    pub fn new(
        stats: &'a DashboardStats,
        results: &'a [ExamResult],
        selected: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            stats,
            results,
            selected,
            theme,
        }
    }

    fn render_cards(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);

        let values = [
            (t!("dashboard.exams"), self.stats.exam_count.to_string(), colors.accent()),
            (
                t!("dashboard.average"),
                format!("{:.1}%", self.stats.average_percent),
                colors.score(self.stats.average_percent),
            ),
            (
                t!("dashboard.mistakes"),
                self.stats.mistake_count.to_string(),
                colors.warning(),
            ),
        ];
        for ((label, value, color), card) in values.into_iter().zip(cards.iter()) {
            let block = Block::bordered()
                .title(format!(" {label} "))
                .border_style(Style::default().fg(colors.border()));
            Paragraph::new(Line::from(Span::styled(
                value,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )))
            .block(block)
            .render(*card, buf);
        }
    }

    fn render_subjects(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let title = match self.stats.best_subject() {
            Some(best) => format!(
                " {} · {} ",
                t!("dashboard.by_subject"),
                t!("dashboard.best", subject = best.subject.label())
            ),
            None => format!(" {} ", t!("dashboard.by_subject")),
        };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        let label_width: u16 = 12;
        let bar_space = inner.width.saturating_sub(label_width + 6);
        for (row, subject) in self.stats.by_subject.iter().enumerate() {
            let y = inner.y + row as u16;
            if y >= inner.y + inner.height {
                break;
            }
            buf.set_string(
                inner.x,
                y,
                subject.subject.label(),
                Style::default().fg(colors.fg()),
            );
            let filled = (subject.average / 100.0 * bar_space as f64).round() as u16;
            for dx in 0..bar_space {
                let style = if dx < filled {
                    Style::default().bg(colors.bar_filled())
                } else {
                    Style::default().bg(colors.bar_empty())
                };
                buf[(inner.x + label_width + dx, y)].set_style(style);
            }
            let caption = if subject.attempts == 0 {
                "  -".to_string()
            } else {
                format!("{:>3.0}%", subject.average)
            };
            buf.set_string(
                inner.x + label_width + bar_space + 1,
                y,
                caption,
                Style::default().fg(colors.text_muted()),
            );
        }
    }

    fn render_recent(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("dashboard.recent")))
            .border_style(Style::default().fg(colors.border()));

        if self.stats.recent.is_empty() {
            Paragraph::new(t!("dashboard.no_data").to_string())
                .style(Style::default().fg(colors.text_muted()))
                .block(block)
                .render(area, buf);
            return;
        }

        let lines: Vec<Line> = self
            .stats
            .recent
            .iter()
            .enumerate()
            .filter_map(|(row, &index)| {
                let r = self.results.get(index)?;
                let selected = row == self.selected;
                let style = if selected {
                    Style::default()
                        .fg(colors.highlight_fg())
                        .bg(colors.highlight_bg())
                } else {
                    Style::default().fg(colors.fg())
                };
                let when = r
                    .end_time
                    .with_timezone(&chrono::Local)
                    .format("%m-%d %H:%M");
                Some(Line::from(vec![
                    Span::styled(if selected { " > " } else { "   " }, style),
                    Span::styled(format!("{when}  {}  ", r.subject.label()), style),
                    Span::styled(format!("{}  ", r.paper_title), style),
                    Span::styled(
                        format!("{}/{}", r.score, r.total_points),
                        style.fg(colors.score(r.percent())),
                    ),
                ]))
            })
            .collect();
        Paragraph::new(lines).block(block).render(area, buf);
    }
}

impl Widget for HistoryDashboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("dashboard.title")))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(9),
                Constraint::Min(4),
            ])
            .split(inner);
        self.render_cards(rows[0], buf);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        self.render_subjects(middle[0], buf);
        ScoreTrendChart::new(&self.stats.trend, self.theme).render(middle[1], buf);

        self.render_recent(rows[2], buf);
    }
}
