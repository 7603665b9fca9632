use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use vendas_core::state::ChatRole;

use crate::app::{App, EXAMPLE_QUESTIONS};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_height = if app.notice.is_some() { 1 } else { 0 };
    let [header_area, notice_area, body_area, input_area, help_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(notice_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    if let Some(notice) = &app.notice {
        let line = Line::from(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        frame.render_widget(Paragraph::new(line), notice_area);
    }

    if app.show_files {
        let [chat_area, files_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(44)]).areas(body_area);
        render_chat(app, frame, chat_area);
        render_files(app, frame, files_area);
    } else {
        render_chat(app, frame, body_area);
    }

    render_input(app, frame, input_area);
    render_help(frame, help_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Vendas ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(
            "- ask your sales data anything",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for msg in &app.messages {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
                lines.push(Line::default());
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Vendas:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                lines.extend(render_markdown(&msg.content));
                lines.push(Line::default());
            }
        }
    }

    if app.typing {
        lines.push(Line::from(Span::styled(
            "Vendas:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        let dots = ".".repeat(app.spinner_frame + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    if app.transcript_is_fresh() {
        lines.push(Line::from(Span::styled(
            "Try asking:",
            Style::default().fg(Color::DarkGray),
        )));
        for question in EXAMPLE_QUESTIONS {
            lines.push(Line::from(Span::styled(
                format!("  - {question}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
    }

    let visible_height = area.height.saturating_sub(2);
    let total_lines = lines.len() as u16;
    let max_scroll = total_lines.saturating_sub(visible_height);
    if app.follow || app.scroll > max_scroll {
        app.scroll = max_scroll;
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Chat "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_files(app: &App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = if app.files_loading {
        vec![ListItem::new(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else if app.files.is_empty() {
        vec![ListItem::new(Span::styled(
            "No spreadsheets found",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.files
            .iter()
            .map(|file| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        file.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {} · {}", file.size, file.last_modified),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Spreadsheets (Ctrl+R reload) "));
    frame.render_widget(list, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.typing { Color::DarkGray } else { Color::Cyan };
    let title = if app.typing { " Waiting for reply... " } else { " Ask about your sales " };

    let input = Paragraph::new(app.input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        );
    frame.render_widget(input, area);

    if !app.typing {
        let cursor_x = app.input.chars().take(app.cursor).count() as u16;
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

fn render_help(frame: &mut Frame, area: Rect) {
    let help = Line::from(Span::styled(
        " Enter send · Ctrl+F files · Ctrl+R reload · Up/Down scroll · Esc quit",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(help), area);
}

/// Render assistant markdown as styled lines: headings, bullet and numbered
/// lists, fenced code blocks, tables, and inline bold/italic/code.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw in text.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            lines.push(Line::from(Span::styled(
                format!("  {raw}"),
                Style::default().fg(Color::Green),
            )));
            continue;
        }

        if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let mut spans = vec![Span::styled("  • ".to_string(), Style::default().fg(Color::Cyan))];
            spans.extend(parse_inline(item));
            lines.push(Line::from(spans));
            continue;
        }

        if trimmed.starts_with('|') {
            lines.push(Line::from(Span::styled(
                raw.to_string(),
                Style::default().fg(Color::Gray),
            )));
            continue;
        }

        lines.push(Line::from(parse_inline(raw)));
    }

    lines
}

/// Scan one line for `**bold**`, `*italic*`, and `` `code` `` runs.
fn parse_inline(text: &str) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut bold = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '*' && chars.peek() == Some(&'*') {
                        chars.next();
                        closed = true;
                        break;
                    }
                    bold.push(c);
                }
                if closed && !bold.is_empty() {
                    flush(&mut spans, &mut current);
                    spans.push(Span::styled(bold, Style::default().add_modifier(Modifier::BOLD)));
                } else {
                    current.push_str("**");
                    current.push_str(&bold);
                }
            }
            '*' => {
                let mut italic = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '*' {
                        closed = true;
                        break;
                    }
                    italic.push(c);
                }
                if closed && !italic.is_empty() {
                    flush(&mut spans, &mut current);
                    spans.push(Span::styled(
                        italic,
                        Style::default().add_modifier(Modifier::ITALIC),
                    ));
                } else {
                    current.push('*');
                    current.push_str(&italic);
                }
            }
            '`' => {
                let mut code = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    code.push(c);
                }
                if closed && !code.is_empty() {
                    flush(&mut spans, &mut current);
                    spans.push(Span::styled(code, Style::default().fg(Color::Green)));
                } else {
                    current.push('`');
                    current.push_str(&code);
                }
            }
            _ => current.push(c),
        }
    }

    flush(&mut spans, &mut current);
    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    spans
}

fn flush(spans: &mut Vec<Span<'static>>, current: &mut String) {
    if !current.is_empty() {
        spans.push(Span::raw(std::mem::take(current)));
    }
}
