//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from presentation state ([`App`])
//! and input handling ([`crate::input`]).  Everything drawn is derived from
//! [`App`]; nothing here mutates the feed.
//!
//! ## For contributors
//!
//! * The layout is a three-row split: search box, scrollable article list, and
//!   a one-line status bar.
//! * While the first load is in flight the list shows skeleton rows; a
//!   refresh shows in the list title; a next-page request adds a footer row.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Mode};
use crate::source::Article;

/// Placeholder rows shown during the initial load.
const SKELETON_ROWS: usize = 5;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [search_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_search_box(app, frame, search_area);
    draw_article_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

fn draw_search_box(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.mode == Mode::Search;
    let text = if app.feed.search_text.is_empty() && !editing {
        Span::styled("Search...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.feed.search_text.as_str())
    };
    let border = if editing { Color::Yellow } else { Color::Gray };

    let search = Paragraph::new(Line::from(text)).block(
        Block::default()
            .title(" Search ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(search, area);
}

fn article_item(article: &Article) -> ListItem<'_> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            article.title.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", article.source_id),
            Style::default().fg(Color::Cyan),
        ),
    ])];
    if let Some(description) = &article.description {
        lines.push(Line::styled(
            description.as_str(),
            Style::default().fg(Color::Gray),
        ));
    }
    ListItem::new(Text::from(lines))
}

fn skeleton_item() -> ListItem<'static> {
    let bar = Style::default().fg(Color::DarkGray);
    ListItem::new(Text::from(vec![
        Line::styled("░".repeat(32), bar),
        Line::styled("░".repeat(48), bar),
    ]))
}

/// Render the scrollable article list.
fn draw_article_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let feed = &app.feed;

    let mut items: Vec<ListItem> = if feed.is_initial_load {
        (0..SKELETON_ROWS).map(|_| skeleton_item()).collect()
    } else {
        feed.articles.iter().map(article_item).collect()
    };
    if feed.is_paginating {
        items.push(ListItem::new(Line::styled(
            "Loading more…",
            Style::default().fg(Color::Yellow),
        )));
    }

    let title = match (feed.is_refreshing, feed.query.is_empty()) {
        (true, _) => " Headlines (refreshing…) ".to_string(),
        (false, true) => " Top headlines ".to_string(),
        (false, false) => format!(" Results for \"{}\" ", feed.query),
    };

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let help = match app.mode {
        Mode::Browse => "q: quit  /: search  r: refresh  ↑/↓: scroll",
        Mode::Search => "Enter: search  Esc: done",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} articles", app.feed.articles.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::raw(help),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
