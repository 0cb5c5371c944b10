use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::App;
use crate::model::{Row as ResourceRow, TableStatus};
use crate::refresh::CyclePhase;
use crate::view::{DetailMode, DetailView, View};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub bg: Color,
    pub panel: Color,
    pub accent: Color,
    pub muted: Color,
    pub warn: Color,
    pub error: Color,
    pub text: Color,
    pub selection: Color,
    pub yaml_key: Color,
    pub yaml_string: Color,
    pub yaml_number: Color,
    pub yaml_plain: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(9, 15, 25),
            panel: Color::Rgb(16, 27, 44),
            accent: Color::Rgb(52, 211, 153),
            muted: Color::Rgb(140, 156, 178),
            warn: Color::Rgb(251, 191, 36),
            error: Color::Rgb(248, 113, 113),
            text: Color::White,
            selection: Color::Rgb(24, 36, 58),
            yaml_key: Color::Rgb(103, 232, 249),
            yaml_string: Color::Rgb(125, 211, 252),
            yaml_number: Color::Rgb(251, 146, 60),
            yaml_plain: Color::Rgb(147, 197, 253),
        }
    }
}

const SHORT_HELP: &str =
    "↑/k up  ↓/j down  enter/y yaml  d describe  esc back  h help  q quit";

pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    if let Some(fatal) = app.fatal() {
        render_fatal(frame, frame.area(), fatal, theme);
        return;
    }

    let mut constraints = vec![Constraint::Length(1)];
    if app.config_warning().is_some() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));
    if app.error().is_some() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Length(1));

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let mut slot = 0;
    render_header(frame, root[slot], app, theme);
    slot += 1;
    if let Some(warning) = app.config_warning() {
        render_banner(frame, root[slot], warning, theme.warn, theme);
        slot += 1;
    }
    render_body(frame, root[slot], app, theme);
    slot += 1;
    if let Some(error) = app.error() {
        render_banner(frame, root[slot], error, theme.error, theme);
        slot += 1;
    }
    render_footer(frame, root[slot], app, theme);

    if app.show_help() {
        render_help_modal(frame, theme);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let left = Line::from(vec![
        Span::styled(
            " xrefs ",
            Style::default()
                .fg(Color::Black)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.header().to_string(), Style::default().fg(theme.text)),
    ]);

    let mut right_spans = Vec::new();
    if app.refreshing() {
        let phase = match app.cycle_phase() {
            CyclePhase::Extracting => "reading xr",
            CyclePhase::Polling => "polling",
            CyclePhase::Merging | CyclePhase::Idle => "refreshing",
        };
        right_spans.push(Span::styled(
            format!("⟳ {phase} "),
            Style::default().fg(theme.warn),
        ));
    }
    if app.failed_polls() > 0 {
        right_spans.push(Span::styled(
            format!("{} failed ", app.failed_polls()),
            Style::default().fg(theme.error),
        ));
    }
    let refreshed = app
        .last_refreshed()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    right_spans.push(Span::styled(
        format!("updated {refreshed} "),
        Style::default().fg(theme.muted),
    ));
    let right = Line::from(right_spans);
    let right_width = right.width() as u16;

    if right_width == 0 || right_width >= area.width / 2 {
        frame.render_widget(
            Paragraph::new(left).style(Style::default().bg(theme.bg)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left).style(Style::default().bg(theme.bg)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right)
            .alignment(Alignment::Right)
            .style(Style::default().bg(theme.bg)),
        chunks[1],
    );
}

fn render_banner(frame: &mut Frame, area: Rect, message: &str, color: Color, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(" ! ", Style::default().fg(Color::Black).bg(color)),
        Span::raw(" "),
        Span::styled(message.to_string(), Style::default().fg(color)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.bg)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App, theme: &Theme) {
    app.set_table_page_size(table_rows_visible(area));
    let (detail_width, detail_height) = detail_viewport(area);
    app.set_detail_viewport(detail_width, detail_height);

    match app.active_view() {
        View::Table => render_table(frame, area, app, theme),
        View::Detail(detail) => render_detail(frame, area, detail, theme),
    }
}

fn render_table(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let table = app.table();
    let block = Block::default()
        .title(format!("resourceRefs ({})", table.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .style(Style::default().bg(theme.panel));

    let message = match table.status() {
        TableStatus::Loading => Some("loading…"),
        TableStatus::NoReferences => Some("No resource references."),
        TableStatus::Loaded => None,
    };
    if let Some(message) = message {
        let paragraph = Paragraph::new(Text::from(vec![Line::from(""), Line::from(message)]))
            .alignment(Alignment::Center)
            .block(block)
            .style(Style::default().fg(theme.muted));
        frame.render_widget(paragraph, area);
        return;
    }

    let header_row = Row::new(ResourceRow::HEADERS.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(theme.accent));

    let rows = table.rows().iter().map(|fields| {
        Row::new(fields.iter().map(|field| {
            Cell::from(field.clone()).style(Style::default().fg(status_color(field, theme)))
        }))
    });

    let widget = Table::new(rows, column_constraints(ResourceRow::FIELD_COUNT))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(theme.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(Some(table.selected()));
    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_detail(frame: &mut Frame, area: Rect, detail: &DetailView, theme: &Theme) {
    let text = match detail.mode() {
        DetailMode::Yaml => highlight_yaml_text(detail.text(), theme),
        DetailMode::Describe => Text::from(detail.text().to_string()),
    };
    let block = Block::default()
        .title(detail.title().to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .style(Style::default().bg(theme.panel));
    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(theme.text))
        .wrap(Wrap { trim: false })
        .scroll((detail.scroll(), 0));

    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let view = match app.active_view() {
        View::Table => "table".to_string(),
        View::Detail(detail) if app.view_depth() > 1 => {
            format!("table › {}", detail.mode().label())
        }
        View::Detail(detail) => detail.mode().label().to_string(),
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {view} "),
            Style::default().fg(Color::Black).bg(theme.accent),
        ),
        Span::raw(" "),
        Span::styled(SHORT_HELP, Style::default().fg(theme.muted)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.bg)),
        area,
    );
}

fn render_fatal(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = Text::from(vec![
        Line::from(""),
        Line::from(Span::styled(
            "xrefs stopped refreshing after an internal error",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "press q or ctrl+c to quit",
            Style::default().fg(theme.muted),
        )),
    ]);
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.error))
                .style(Style::default().bg(theme.panel)),
        )
        .style(Style::default().fg(theme.text));
    frame.render_widget(paragraph, area);
}

fn render_help_modal(frame: &mut Frame, theme: &Theme) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let lines = [
        ("↑ / k", "move up / scroll up"),
        ("↓ / j", "move down / scroll down"),
        ("g / G", "top / bottom"),
        ("pgup / ctrl+u", "page up"),
        ("pgdn / ctrl+d", "page down"),
        ("enter / y", "show YAML of the selected resource"),
        ("d", "describe the selected resource"),
        ("esc", "back (quit from the table)"),
        ("h / ?", "toggle this help"),
        ("q / ctrl+c", "quit"),
    ]
    .into_iter()
    .map(|(keys, description)| {
        Line::from(vec![
            Span::styled(format!("{keys:<16}"), Style::default().fg(theme.accent)),
            Span::raw(description),
        ])
    })
    .collect::<Vec<_>>();

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent))
                .style(Style::default().bg(theme.panel)),
        )
        .style(Style::default().fg(theme.text));

    frame.render_widget(modal, area);
}

fn status_color(value: &str, theme: &Theme) -> Color {
    match value {
        "True" => theme.accent,
        "False" => theme.error,
        _ => theme.text,
    }
}

fn highlight_yaml_text(input: &str, theme: &Theme) -> Text<'static> {
    let lines = input
        .lines()
        .map(|line| highlight_yaml_line(line, theme))
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str, theme: &Theme) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if trimmed.starts_with('#') {
        spans.push(Span::styled(
            trimmed.to_string(),
            Style::default().fg(theme.muted),
        ));
        return Line::from(spans);
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(theme.accent)));
        spans.extend(highlight_yaml_content(rest, theme));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed, theme));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str, theme: &Theme) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(theme.text),
        )];
    };

    let mut spans = vec![
        Span::styled(key.to_string(), Style::default().fg(theme.yaml_key)),
        Span::styled(":", Style::default().fg(theme.muted)),
    ];
    if value.trim().is_empty() {
        return spans;
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim(), theme)),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str, theme: &Theme) -> Color {
    if value == "\"True\"" || value == "True" {
        theme.accent
    } else if value == "\"False\"" || value == "False" {
        theme.error
    } else if value.starts_with('"') || value.starts_with('\'') {
        theme.yaml_string
    } else if matches!(value, "true" | "false" | "null" | "~") {
        theme.warn
    } else if value.parse::<f64>().is_ok() {
        theme.yaml_number
    } else if value.starts_with('{') || value.starts_with('[') {
        theme.muted
    } else {
        theme.yaml_plain
    }
}

fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

fn detail_viewport(area: Rect) -> (u16, u16) {
    let width = area.width.saturating_sub(2).max(1);
    let height = area.height.saturating_sub(2).max(1);
    (width, height)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}
