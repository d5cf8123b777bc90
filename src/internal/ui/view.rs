use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use super::app::{App, Focus, InputMode, ViewMode};
use crate::internal::models::{FetchStatus, Item};
use crate::internal::notification::NotificationType;

const SIDEBAR_WIDTH: u16 = 26;
/// Each result occupies a title line and a metadata line.
const RESULT_ROW_HEIGHT: u16 = 2;

#[tracing::instrument(skip(app, f))]
pub fn draw(app: &mut App, f: &mut Frame) {
    let start = std::time::Instant::now();

    f.render_widget(
        Block::default().style(
            Style::default()
                .bg(app.theme.background)
                .fg(app.theme.foreground),
        ),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_top_bar(app, f, chunks[0]);

    match app.view_mode {
        ViewMode::Browse => render_browse(app, f, chunks[1]),
        ViewMode::Detail => render_detail(app, f, chunks[1]),
    }

    render_status_bar(app, f, chunks[2]);

    if app.input_mode == InputMode::Search {
        render_search_overlay(app, f);
    }

    if app.notification.is_some() {
        render_notification(app, f);
    }

    if app.show_help {
        render_help_overlay(app, f);
    }

    if app.config.logging.enable_performance_metrics && cfg!(debug_assertions) {
        tracing::debug!(elapsed = ?start.elapsed(), "render.draw");
    }
}

/// Wraps a synopsis to `width` columns. Blank lines between paragraphs are kept.
pub fn wrap_synopsis(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(10));
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            if lines.last().is_some_and(|l: &String| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.extend(
            textwrap::wrap(paragraph, width)
                .into_iter()
                .map(|cow| cow.into_owned()),
        );
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// One-line summary such as `8.27 | 500 eps | 2007 | Action, Adventure`.
pub fn item_meta(item: &Item) -> String {
    let mut parts = Vec::new();
    parts.push(match item.score {
        Some(score) => format!("{:.2}", score),
        None => "N/A".to_string(),
    });
    if let Some(episodes) = item.episodes {
        parts.push(format!("{} eps", episodes));
    }
    if let Some(year) = item.year {
        parts.push(year.to_string());
    }
    let genres: Vec<&str> = item.genre_names().collect();
    if !genres.is_empty() {
        parts.push(genres.join(", "));
    }
    parts.join(" | ")
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_top_bar(app: &App, f: &mut Frame, area: Rect) {
    let search = &app.store.search;
    let mut spans = vec![Span::styled(
        format!(" Anime Browser v{} ", app.app_version),
        Style::default()
            .fg(app.theme.selection_fg)
            .bg(app.theme.selection_bg)
            .add_modifier(Modifier::BOLD),
    )];

    if search.is_home() {
        spans.push(Span::raw("  Home"));
    } else {
        if !search.debounced_query.trim().is_empty() {
            spans.push(Span::raw(format!("  Query: {}", search.debounced_query.trim())));
        }
        if let Some(id) = search.category_id {
            let name = app
                .store
                .categories
                .items
                .iter()
                .find(|c| c.mal_id == id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", id));
            spans.push(Span::styled(
                format!("  Genre: {}", name),
                Style::default().fg(app.theme.accent),
            ));
        }
        spans.push(Span::raw(format!(
            "  Sort: {}  Page {}/{}",
            search.sort.label(),
            search.page,
            search.total_pages()
        )));
    }

    let p = Paragraph::new(Line::from(spans)).style(
        Style::default()
            .fg(app.theme.foreground)
            .bg(app.theme.background),
    );
    f.render_widget(p, area);
}

fn render_browse(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);

    render_categories(app, f, chunks[0]);
    render_results(app, f, chunks[1]);
}

fn focused_border(app: &App, focused: bool) -> Style {
    match focused {
        true => Style::default().fg(app.theme.selection_bg),
        false => Style::default().fg(app.theme.border),
    }
}

fn render_categories(app: &mut App, f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focused_border(app, app.focus == Focus::Categories))
        .title(" Genres ");

    let categories = &app.store.categories;
    if categories.items.is_empty() {
        let text = match categories.status {
            FetchStatus::Failed => "Could not load genres (r to retry)",
            FetchStatus::Loading => "Loading...",
            _ => "No genres",
        };
        let p = Paragraph::new(text)
            .style(Style::default().fg(app.theme.muted))
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let active = app.store.search.category_id;
    let mut items = vec![ListItem::new(Line::from(Span::styled(
        "All genres",
        Style::default().fg(match active {
            None => app.theme.accent,
            Some(_) => app.theme.foreground,
        }),
    )))];
    items.extend(categories.items.iter().map(|category| {
        let marker = match active == Some(category.mal_id) {
            true => "● ",
            false => "",
        };
        let count = category
            .count
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        ListItem::new(Line::from(vec![
            Span::styled(marker, Style::default().fg(app.theme.accent)),
            Span::raw(category.name.clone()),
            Span::styled(count, Style::default().fg(app.theme.muted)),
        ]))
    }));

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(app.theme.selection_bg)
            .fg(app.theme.selection_fg),
    );
    f.render_stateful_widget(list, area, &mut app.categories_state);
}

fn result_item(app: &App, index: usize, item: &Item) -> ListItem<'static> {
    let favorite = match app.store.is_favorite(item.mal_id) {
        true => "★ ",
        false => "",
    };
    ListItem::new(vec![
        Line::from(vec![
            Span::styled(
                format!("{:<4}", index + 1),
                Style::default().fg(app.theme.muted),
            ),
            Span::styled(favorite, Style::default().fg(app.theme.favorite)),
            Span::styled(
                item.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("    "),
            Span::styled(item_meta(item), Style::default().fg(app.theme.score)),
        ]),
    ])
}

fn results_title(app: &App) -> String {
    let search = &app.store.search;
    match search.is_home() {
        true => format!(" Favorites ({}) · Trending ", app.store.favorites().len()),
        false if search.total > 0 => {
            format!(" Results {} of {} ", search.results.len(), search.total)
        }
        false => " Results ".to_string(),
    }
}

fn results_footer(app: &App) -> Option<String> {
    let search = &app.store.search;
    if search.is_home() {
        return None;
    }
    match (search.is_loading_more(), search.has_next) {
        (true, _) => Some(format!("{} Loading more...", app.get_spinner_char())),
        (false, true) => Some("m: load more".to_string()),
        (false, false) => None,
    }
}

fn render_results(app: &mut App, f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focused_border(app, app.focus == Focus::Results))
        .title(results_title(app))
        .padding(Padding::horizontal(1));

    let inner = block.inner(area);
    app.results_viewport = usize::from(inner.height / RESULT_ROW_HEIGHT);

    let mut items: Vec<ListItem> = app
        .visible_items()
        .iter()
        .enumerate()
        .map(|(index, item)| result_item(app, index, item))
        .collect();

    if items.is_empty() {
        let p = Paragraph::new(empty_message(app))
            .style(Style::default().fg(app.theme.muted))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(p, area);
        return;
    }

    if let Some(footer) = results_footer(app) {
        items.push(ListItem::new(Line::from(Span::styled(
            footer,
            Style::default().fg(app.theme.muted),
        ))));
    }

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(app.theme.selection_bg)
            .fg(app.theme.selection_fg),
    );
    f.render_stateful_widget(list, area, &mut app.results_state);
}

fn empty_message(app: &App) -> String {
    let search = &app.store.search;
    if search.is_home() {
        return match app.store.top.status {
            FetchStatus::Loading | FetchStatus::Idle => "Loading trending anime...".to_string(),
            FetchStatus::Failed => format!(
                "{} (r to retry)",
                app.store.top.error.as_deref().unwrap_or("Failed")
            ),
            FetchStatus::Succeeded => "Press / to search".to_string(),
        };
    }
    match search.status {
        FetchStatus::Loading => "Searching...".to_string(),
        FetchStatus::Failed => format!(
            "{} (r to retry)",
            search.error.as_deref().unwrap_or("Search failed")
        ),
        _ if search.debounced_query.trim().is_empty() => "No anime in this genre".to_string(),
        _ => format!("No results for \"{}\"", search.debounced_query.trim()),
    }
}

fn render_detail(app: &App, f: &mut Frame, area: Rect) {
    let detail = &app.store.detail;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .padding(Padding::new(2, 2, 1, 0));

    let Some(item) = detail.item.as_ref() else {
        let text = match detail.status {
            FetchStatus::Failed => format!(
                "{} (r to retry)",
                detail.error.as_deref().unwrap_or("Failed")
            ),
            _ => format!("{} Loading details...", app.get_spinner_char()),
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let favorite = match app.store.is_favorite(item.mal_id) {
        true => Span::styled(" ★ Favorite", Style::default().fg(app.theme.favorite)),
        false => Span::styled(" ☆", Style::default().fg(app.theme.muted)),
    };
    let label = Style::default().fg(app.theme.muted);
    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<10}", name), label),
            Span::raw(value),
        ])
    };
    let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "Unknown".to_string());

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                item.title.clone(),
                Style::default()
                    .fg(app.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            favorite,
        ]),
        Line::default(),
        field(
            "Score",
            or_unknown(item.score.map(|s| format!("{:.2}", s))),
        ),
        field("Episodes", or_unknown(item.episodes.map(|e| e.to_string()))),
        field("Status", or_unknown(item.status.clone())),
        field("Rating", or_unknown(item.rating.clone())),
        field("Year", or_unknown(item.year.map(|y| y.to_string()))),
        field(
            "Genres",
            item.genre_names().collect::<Vec<_>>().join(", "),
        ),
    ];
    if !item.image_url().is_empty() {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Image"), label),
            Span::styled(item.image_url().to_string(), Style::default().fg(app.theme.link)),
        ]));
    }
    lines.push(Line::default());

    let inner = block.inner(area);
    match item.synopsis.as_deref() {
        Some(synopsis) => lines.extend(
            wrap_synopsis(synopsis, inner.width)
                .into_iter()
                .map(Line::from),
        ),
        None => lines.push(Line::styled("No synopsis available.", label)),
    }

    if detail.status == FetchStatus::Loading {
        lines.push(Line::default());
        lines.push(Line::styled(
            format!("{} Loading details...", app.get_spinner_char()),
            label,
        ));
    }

    let p = Paragraph::new(lines)
        .block(block)
        .scroll((app.detail_scroll, 0));
    f.render_widget(p, area);
}

fn render_status_bar(app: &App, f: &mut Frame, area: Rect) {
    let status = match (app.loading_description(), app.input_mode, app.view_mode) {
        (Some(desc), _, _) => format!("{} {}", app.get_spinner_char(), desc),
        (None, InputMode::Search, _) => "Type to search | Enter: Done | Esc: Close".to_string(),
        (None, _, ViewMode::Detail) => {
            "Esc/q: Back | f: Favorite | o: Open MAL | j/k: Scroll | r: Retry | ?: Help".to_string()
        }
        (None, _, ViewMode::Browse) => match app.focus {
            Focus::Categories => {
                "Enter: Select genre | Tab/Esc: Results | x: Clear | ?: Help".to_string()
            }
            Focus::Results => {
                "/: Search | Enter: Detail | f: Fav | s: Sort | n/p: Page | m: More | Tab: Genres | t: Theme | ?: Help | q: Quit"
                    .to_string()
            }
        },
    };

    let p = Paragraph::new(status).style(
        Style::default()
            .fg(app.theme.selection_fg)
            .bg(app.theme.selection_bg),
    );
    f.render_widget(p, area);
}

fn render_search_overlay(app: &App, f: &mut Frame) {
    let area = popup_area(f.area(), 60, 3);

    let input = Paragraph::new(format!("{}█", app.search_input))
        .style(
            Style::default()
                .bg(app.theme.background)
                .fg(app.theme.foreground),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.selection_bg))
                .title(" Search anime ")
                .title_style(
                    Style::default()
                        .fg(app.theme.selection_fg)
                        .bg(app.theme.selection_bg)
                        .add_modifier(Modifier::BOLD),
                ),
        );

    f.render_widget(Clear, area);
    f.render_widget(input, area);
}

fn render_notification(app: &App, f: &mut Frame) {
    let Some(notification) = &app.notification else {
        return;
    };
    let screen = f.area();
    let width = (notification.message.chars().count() as u16 + 4).min(screen.width);
    let area = Rect::new(
        screen.x + screen.width.saturating_sub(width),
        screen.y + 1,
        width,
        3.min(screen.height),
    );

    let color = match notification.notification_type {
        NotificationType::Info => app.theme.accent,
        NotificationType::Warning => app.theme.score,
        NotificationType::Error => app.theme.error,
    };

    let popup = Paragraph::new(notification.message.as_str())
        .style(Style::default().fg(app.theme.foreground).bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(notification.notification_type.title())
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

const HELP_ENTRIES: &[(&str, &str)] = &[
    ("/", "Search"),
    ("j/k, ↑/↓", "Move / scroll"),
    ("Enter", "Open detail / select genre"),
    ("Tab", "Switch between results and genres"),
    ("f", "Toggle favorite"),
    ("s", "Toggle sort by score"),
    ("n/p", "Next / previous page"),
    ("m", "Load more results"),
    ("x", "Clear query and genre"),
    ("o", "Open on MyAnimeList"),
    ("r", "Retry failed request"),
    ("t", "Toggle light/dark theme"),
    ("Esc/q", "Back / quit"),
    ("?", "Close this help"),
];

fn render_help_overlay(app: &App, f: &mut Frame) {
    let area = popup_area(f.area(), 52, HELP_ENTRIES.len() as u16 + 4);
    f.render_widget(Clear, area);

    let lines: Vec<Line> = HELP_ENTRIES
        .iter()
        .map(|(key, description)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<12}", key),
                    Style::default()
                        .fg(app.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*description),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.selection_bg))
            .title(" Keyboard Shortcuts ")
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(app.theme.background)),
    );
    f.render_widget(help, area);
}
