use chrono::DateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use bccr_core::constants::PENDING_ROOT_TEXT;
use bccr_core::store::SidebarEntry;

use crate::app::{App, Pane, ThreadRow};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(outer[0]);

    draw_sidebar(frame, app, panes[0]);
    draw_threads(frame, app, panes[1]);
    draw_status(frame, app, outer[1]);
}

fn draw_sidebar(frame: &mut Frame, app: &mut App, area: Rect) {
    let entries = app.sidebar_entries();
    app.sidebar_cursor = app.sidebar_cursor.min(entries.len().saturating_sub(1));

    let items: Vec<ListItem> = entries.iter().map(sidebar_line).collect();
    let focused = app.pane == Pane::Sidebar;
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("channels")
                .border_style(pane_border(focused)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !entries.is_empty() {
        state.select(Some(app.sidebar_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn sidebar_line(entry: &SidebarEntry) -> ListItem<'static> {
    let (user, domain) = display_name(entry);
    let mut spans = vec![Span::styled(
        user,
        if entry.is_active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        },
    )];
    if !domain.is_empty() {
        spans.push(Span::styled(domain, Style::default().fg(Color::DarkGray)));
    }
    if entry.unread > 0 {
        spans.push(Span::styled(
            format!(" [{}]", entry.unread),
            Style::default().fg(Color::Yellow),
        ));
    }
    let mut lines = vec![Line::from(spans)];
    if !entry.status.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {}", entry.status),
            Style::default().fg(Color::Gray),
        )));
    }
    ListItem::new(lines)
}

fn draw_threads(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = app.thread_rows();
    app.thread_cursor = app.thread_cursor.min(rows.len().saturating_sub(1));

    let items: Vec<ListItem> = rows.iter().map(thread_line).collect();
    let focused = app.pane == Pane::Threads;
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.active_header())
                .border_style(pane_border(focused)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(app.thread_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn thread_line(row: &ThreadRow) -> ListItem<'static> {
    let indent = if row.is_reply { "    " } else { "" };
    let body = if row.item.retracted {
        Span::styled("[retracted]", Style::default().fg(Color::DarkGray))
    } else if row.item.placeholder {
        Span::styled(PENDING_ROOT_TEXT, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(row.item.content.clone())
    };

    let header = format!(
        "{indent}{} {} ",
        format_timestamp(row.item.published),
        row.item.author
    );
    ListItem::new(Line::from(vec![
        Span::styled(header, Style::default().fg(Color::Cyan)),
        body,
    ]))
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = match &app.prompt {
        Some((kind, buffer)) => format!("{}{buffer}█", kind.label()),
        None => app.status_line.clone(),
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().bg(Color::Blue).fg(Color::White)),
        area,
    );
}

fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Sidebar display name: prefer the channel title; when it is just the
/// address, split into user and a shortened domain ("my.long.domain" becomes
/// "@mld").
fn display_name(entry: &SidebarEntry) -> (String, String) {
    let title = if entry.title.is_empty() {
        entry.jid.clone()
    } else {
        entry.title.clone()
    };
    if !title.eq_ignore_ascii_case(&entry.jid) {
        return (title, String::new());
    }
    match entry.jid.split_once('@') {
        Some((user, domain)) => {
            let initials: String = domain
                .split('.')
                .filter_map(|word| word.chars().next())
                .collect();
            (user.to_string(), format!("@{initials}"))
        }
        None => (title, String::new()),
    }
}

fn format_timestamp(ts: u64) -> String {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}
