use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::RgbColor;
use crate::contact::Field;

use super::app::{App, ListRow, SearchFocus};

const RESULTS_HELP: &str =
    "/: search  a: add  e: edit  x: delete  s: save  S: save as  o: open  n: new  L: LaTeX  q: quit";
const SEARCH_HELP_INPUT: &str = "Type to filter  Esc/Enter: back to list";
const FORM_HELP: &str = "Tab/Down: next  BackTab/Up: prev  Enter: save  Esc: cancel";
const PATH_HELP: &str = "Enter: confirm  Esc: cancel";
const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const EXPORT_FOOTER: &str = "j/k: scroll  Esc/q: close";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_form_modal(frame, size, app);
    draw_path_modal(frame, size, app);
    draw_confirm_modal(frame, size, app);
    draw_export_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header_style = header_text_style(app);
    let file = match app.file_path() {
        Some(path) => path.display().to_string(),
        None => "[no file]".to_string(),
    };
    let mut spans = vec![Span::styled(file, header_style)];
    if app.is_modified() {
        spans.push(Span::styled(" [+]", selection_style(app)));
    }
    spans.push(Span::styled(
        format!("   {} contacts", app.total_contacts()),
        header_style,
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)])
        .split(area);
    draw_search(frame, chunks[0], app);
    draw_card(frame, chunks[1], app);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    draw_search_header(frame, layout[0], app, area.width);
    draw_search_list(frame, layout[1], app);
}

fn draw_search_header(frame: &mut Frame<'_>, area: Rect, app: &App, outer_width: u16) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let active = app.search_focus == SearchFocus::Input;
    let label = "SEARCH: ";
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(app.search_input.value().to_string(), value_style),
    ]);

    render_header_with_separator(frame, area, line, app, outer_width);

    if active {
        let x = area
            .x
            .saturating_add(label.len() as u16)
            .saturating_add(app.search_input.visual_cursor() as u16);
        frame.set_cursor_position((x, area.y));
    }
}

fn draw_search_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let items: Vec<ListItem> = if app.rows.is_empty() {
        vec![ListItem::new(Line::from("No contacts"))]
    } else {
        app.rows.iter().map(|row| build_list_item(row, app)).collect()
    };

    let mut state = ListState::default();
    if !app.rows.is_empty() {
        state.select(Some(app.selected));
    }

    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);

    frame.render_stateful_widget(list, area, &mut state);
}

fn build_list_item(row: &ListRow, app: &App) -> ListItem<'static> {
    let mut spans = vec![Span::raw(row.name.clone())];
    if !row.organization.is_empty() {
        spans.push(Span::styled(
            format!("  {}", row.organization),
            header_text_style(app),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn draw_card(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let Some(contact) = app.selected_contact() else {
        let header = Line::from(Span::styled("NO CONTACT SELECTED", header_text_style(app)));
        render_header_with_separator(frame, layout[0], header, app, area.width);
        frame.render_widget(Paragraph::new("Press a to add a contact"), layout[1]);
        return;
    };

    let header = Line::from(Span::styled(
        contact.display_name().to_uppercase(),
        header_text_style(app),
    ));
    render_header_with_separator(frame, layout[0], header, app, area.width);

    let label_width = Field::ALL
        .iter()
        .map(|field| field.title().len() + 1)
        .max()
        .unwrap_or(0);

    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|field| {
            let label = format!("{:<width$} ", format!("{}:", field.title()), width = label_width);
            Line::from(vec![
                Span::styled(label, header_text_style(app)),
                Span::raw(contact.get(*field).unwrap_or_default().to_string()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), layout[1]);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message: String = if app.form.is_some() {
        FORM_HELP.to_string()
    } else if app.path_modal.is_some() {
        PATH_HELP.to_string()
    } else if app.confirm_modal.is_some() {
        CONFIRM_HELP.to_string()
    } else if let Some(status) = &app.status {
        status.clone()
    } else if app.search_focus == SearchFocus::Input {
        SEARCH_HELP_INPUT.to_string()
    } else {
        RESULTS_HELP.to_string()
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_form_modal(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = (Field::ALL.len() as u16 + 2).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Line::from(Span::styled(format!(" {} ", form.title()), header_style)))
        .title_alignment(Alignment::Center);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let label_width = Field::ALL
        .iter()
        .map(|field| field.title().len() + 2)
        .max()
        .unwrap_or(0);

    let lines: Vec<Line> = form
        .fields()
        .enumerate()
        .map(|(idx, (field, value))| {
            let label = format!("{:<width$}", format!("{}: ", field.title()), width = label_width);
            let value_style = if idx == form.focused() {
                selection_style(app)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(label, header_style),
                Span::styled(value.to_string(), value_style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);

    let cursor_x = inner
        .x
        .saturating_add(label_width as u16)
        .saturating_add(form.visual_cursor() as u16);
    let cursor_y = inner.y.saturating_add(form.focused() as u16);
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn draw_path_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.path_modal.as_ref() else {
        return;
    };

    let label = "PATH: ";
    let value = modal.input.value().to_string();
    let cursor = modal.input.visual_cursor();
    let title = modal.purpose.title();

    // Pad so the popup leaves room for typing
    let min_width = area.width.saturating_mul(2).saturating_div(3) as usize;
    let padded = format!("{:<width$}", value, width = min_width.saturating_sub(label.len()));
    let lines = vec![
        Line::from(vec![
            Span::styled(label, header_text_style(app)),
            Span::raw(padded),
        ]),
        Line::from(""),
        Line::from(PATH_HELP),
    ];

    let title_line = Line::from(Span::styled(title, header_text_style(app)));
    let popup = Popup::new(ratatui::text::Text::from(lines))
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    if let Some(area) = app.modal_popup.area() {
        let inner = Block::default().borders(Borders::ALL).inner(*area);
        let x = inner.x.saturating_add(label.len() as u16 + cursor as u16);
        frame.set_cursor_position((x, inner.y));
    }
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };

    let lines = vec![
        Line::from(modal.message.clone()),
        Line::from(""),
        Line::from(CONFIRM_HELP),
    ];

    let title_line = Line::from(Span::styled(modal.title.clone(), header_text_style(app)));
    let popup = Popup::new(ratatui::text::Text::from(lines))
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_export_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.export_modal.is_none() {
        return;
    }

    let width = area.width.saturating_mul(4).saturating_div(5).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let border_s = border_style(app);
    let error_style = selection_style(app).add_modifier(Modifier::BOLD);

    let Some(modal) = app.export_modal.as_mut() else {
        return;
    };
    modal.viewport_height = height.saturating_sub(2) as usize;
    let max_scroll = modal.lines.len().saturating_sub(modal.viewport_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let scroll_indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };

    let title = Line::from(vec![
        Span::styled(" LATEX EXPORT ", header_style),
        Span::styled(scroll_indicator, header_style),
    ]);
    let footer = Line::from(Span::styled(format!(" {} ", EXPORT_FOOTER), header_style));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let line_style = if modal.failed {
        error_style
    } else {
        Style::default()
    };
    let visible: Vec<Line> = modal
        .lines
        .iter()
        .skip(modal.scroll)
        .take(modal.viewport_height)
        .map(|line| Line::from(Span::styled(line.clone(), line_style)))
        .collect();

    frame.render_widget(Paragraph::new(visible), inner);
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// Render a header line with a separator below it.
/// `outer_width` is the full pane width (including borders) for drawing connected separators.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'static>,
    app: &App,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if area.height == 1 {
        frame.render_widget(Paragraph::new(content), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(content), layout[0]);

    // Build separator with connector characters: ├───┤
    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.to_string().repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, separator_style(app)));

    // Shifted left by 1 to start at the border
    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
