use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph, Widget};
use rust_i18n::t;

use crate::ui::theme::Theme;

/// Percentages of recent exams as a line over attempt number.
pub struct ScoreTrendChart<'a> {
    points: Vec<(f64, f64)>,
    theme: &'a Theme,
}

impl<'a> ScoreTrendChart<'a> {
    pub fn new(trend: &[f64], theme: &'a Theme) -> Self {
        let points = trend
            .iter()
            .enumerate()
            .map(|(i, p)| ((i + 1) as f64, *p))
            .collect();
        Self { points, theme }
    }
}

impl Widget for ScoreTrendChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("dashboard.trend")))
            .border_style(Style::default().fg(colors.border()));

        if self.points.is_empty() {
            Paragraph::new(t!("dashboard.no_data").to_string())
                .style(Style::default().fg(colors.text_muted()))
                .block(block)
                .render(area, buf);
            return;
        }

        let max_x = (self.points.len() as f64).max(2.0);
        let dataset = Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(colors.accent()))
            .data(&self.points);

        Chart::new(vec![dataset])
            .block(block)
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(colors.text_muted()))
                    .bounds([1.0, max_x]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(colors.text_muted()))
                    .labels(["0", "50", "100"])
                    .bounds([0.0, 100.0]),
            )
            .render(area, buf);
    }
}
