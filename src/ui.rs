use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::columns;
use crate::model::Model;
use crate::paging;
use crate::sort::Direction;

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;

pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        TableUI
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [tabs_area, table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_tabs(model, frame, tabs_area);
        self.draw_table(model, frame, table_area);
        self.draw_status(model, frame, status_area);
        self.draw_cmdline(model, frame, cmd_area);

        if let Some(message) = model.popup() {
            self.draw_popup(frame, message);
        }
    }

    fn draw_tabs(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (idx, tab) in model.tabs().iter().enumerate() {
            if idx == model.active_tab() {
                spans.push(format!(" {tab} ").bold().reversed());
            } else {
                spans.push(format!(" {tab} ").into());
            }
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let headers = model.visible_columns();
        if headers.is_empty() {
            let placeholder = Paragraph::new("No data available for this tab").centered();
            frame.render_widget(placeholder, area);
            return;
        }

        let (selected_row, selected_column) = model.selection();
        let header_cells: Vec<Cell> = headers
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let mut label = columns::display_name(column).to_string();
                if let Some(spec) = model.sort_spec()
                    && spec.column == *column
                {
                    label.push_str(match spec.direction {
                        Direction::Asc => " ▲",
                        Direction::Desc => " ▼",
                    });
                }
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if idx == selected_column {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                Cell::from(label).style(style)
            })
            .collect();

        let page = model.page();
        let rows: Vec<Row> = page
            .items
            .iter()
            .enumerate()
            .map(|(idx, &data_row)| {
                let cells: Vec<Cell> = headers
                    .iter()
                    .map(|column| Cell::from(model.cell_display(data_row, column)))
                    .collect();
                let mut row = Row::new(cells);
                if idx == selected_row {
                    row = row.style(Style::default().add_modifier(Modifier::REVERSED));
                }
                row
            })
            .collect();

        let widths: Vec<Constraint> = headers
            .iter()
            .map(|_| Constraint::Ratio(1, headers.len() as u32))
            .collect();
        let table = Table::new(rows, widths)
            .header(Row::new(header_cells).height(TABLE_HEADER_HEIGHT as u16))
            .block(Block::bordered().title(format!(" {} ", model.tab_name())));
        frame.render_widget(table, area);
    }

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let page = model.page();
        let mut status = format!(
            "Showing {}-{} of {} records",
            page.start_record,
            page.end_record,
            model.view().len()
        );
        if page.page_count > 1 {
            status.push_str(&format!(" • Page {} of {} [", page.page_index, page.page_count));
            let numbers: Vec<String> = paging::page_numbers(page.page_count, page.page_index)
                .into_iter()
                .map(|n| match n {
                    Some(n) => n.to_string(),
                    None => "…".to_string(),
                })
                .collect();
            status.push_str(&numbers.join(" "));
            status.push(']');
        }
        if !model.filters().is_empty() {
            status.push_str(&format!(" • {} filters", model.filters().len()));
        }
        if !model.search_term().is_empty() {
            status.push_str(&format!(" • search: {}", model.search_term()));
        }
        frame.render_widget(Line::from(status.dim()), area);
    }

    fn draw_cmdline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let line = match model.cmd_input() {
            Some(input) => format!("{}{}", input.prompt, input.input),
            None => model.status_message().to_string(),
        };
        frame.render_widget(Line::from(line), area);
    }

    fn draw_popup(&self, frame: &mut Frame, message: &str) {
        let area = centered_rect(frame.area(), 60, 70);
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(message).block(Block::bordered().title(" help "));
        frame.render_widget(popup, area);
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}
