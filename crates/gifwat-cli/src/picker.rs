use anyhow::Result;
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use gifwat_core::app::{route_window_effect, FormField, Modal, ModalKind, PreviewStatus};
use gifwat_core::image_load::LoadStatus;
use gifwat_core::ports::{EventPort, Subscription, WindowPort};
use gifwat_core::{App, Backend, Effect, InteractionConfig, NavKey};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::media::{LocalGifProbe, ProbeOutcome};
use crate::worker::{Done, Executor, Job, ThreadExecutor};

const CARD_HEIGHT: u16 = 5;
const IDLE_POLL: Duration = Duration::from_millis(100);
const HEADLESS_ROWS: usize = 3;

/// Raw-mode terminal with focus reporting, acquired through `subscribe()`.
pub struct TerminalEvents;

impl EventPort for TerminalEvents {
    type Event = Event;

    fn subscribe(&mut self) -> gifwat_core::Result<Subscription> {
        enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableFocusChange)?;
        Ok(Subscription::new(|| {
            let _ = crossterm::execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }))
    }

    fn poll(&mut self, timeout: Duration) -> gifwat_core::Result<Option<Event>> {
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

/// In a terminal, hiding the window means leaving the picker.
#[derive(Debug)]
struct TerminalWindow {
    hidden: bool,
    search_focused: bool,
}

impl WindowPort for TerminalWindow {
    fn hide(&mut self) -> gifwat_core::Result<()> {
        self.hidden = true;
        Ok(())
    }

    fn focus_search(&mut self) -> gifwat_core::Result<()> {
        self.search_focused = true;
        Ok(())
    }
}

/// Which grid rows are on screen.
#[derive(Debug, Default)]
struct GridView {
    first_row: usize,
    rows: usize,
}

impl GridView {
    fn scroll_to(&mut self, index: usize, columns: usize) {
        let row = index / columns.max(1);
        if row < self.first_row {
            self.first_row = row;
        } else if self.rows > 0 && row >= self.first_row + self.rows {
            self.first_row = row + 1 - self.rows;
        }
    }

    fn fit(&mut self, total_rows: usize) {
        let max_first = total_rows.saturating_sub(self.rows.max(1));
        self.first_row = self.first_row.min(max_first);
    }
}

pub fn run_picker(backend: Arc<dyn Backend>, config: InteractionConfig) -> Result<Option<String>> {
    let mut app = App::new(config);
    let mut exec = ThreadExecutor::spawn(backend, Arc::new(LocalGifProbe));
    let mut events = TerminalEvents;
    run_picker_with(&mut app, &mut exec, &mut events, true)
}

/// Drive the controller until it asks to hide. Returns the last copied id.
/// With `draw == false` nothing is rendered and the loop ends once the event
/// source runs dry and all work has settled.
pub fn run_picker_with(
    app: &mut App,
    exec: &mut dyn Executor,
    events: &mut dyn EventPort<Event = Event>,
    draw: bool,
) -> Result<Option<String>> {
    let _subscription = events.subscribe()?;
    let mut terminal = if draw {
        Some(Terminal::new(CrosstermBackend::new(io::stdout()))?)
    } else {
        None
    };
    let mut window = TerminalWindow {
        hidden: false,
        search_focused: true,
    };
    let mut grid = GridView {
        first_row: 0,
        rows: HEADLESS_ROWS,
    };
    let mut last_copied: Option<String> = None;
    app.start();

    loop {
        pump(app, exec, &mut window, &mut grid, Instant::now())?;
        if let Some(id) = app.copied_id() {
            last_copied = Some(id.to_string());
        }
        if window.hidden {
            break;
        }
        if let Some(t) = terminal.as_mut() {
            t.draw(|f| render(f, app, &mut grid, &window))?;
        }
        app.set_viewport(grid.first_row, grid.rows);
        if app.has_effects() {
            continue;
        }

        let now = Instant::now();
        let timeout = app
            .next_deadline()
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL);
        match events.poll(timeout)? {
            Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if handle_key(app, &mut window, key, Instant::now()) {
                    break;
                }
            }
            Some(Event::FocusGained) => app.focus_changed(true),
            Some(Event::FocusLost) => app.focus_changed(false),
            Some(_) => {}
            None if !draw && exec.idle() => break,
            None => {}
        }
        app.tick(Instant::now());
    }
    Ok(last_copied)
}

/// Carry out queued effects and feed finished work back until both are empty.
fn pump(
    app: &mut App,
    exec: &mut dyn Executor,
    window: &mut TerminalWindow,
    grid: &mut GridView,
    now: Instant,
) -> Result<()> {
    loop {
        let effects = app.drain_effects();
        let done = exec.drain();
        if effects.is_empty() && done.is_empty() {
            return Ok(());
        }
        for effect in effects {
            if route_window_effect(&effect, window)? {
                continue;
            }
            match effect {
                Effect::Backend(req) => exec.submit(Job::Backend(req)),
                Effect::LoadImage { id, attempt } => exec.submit(Job::Image { id, attempt }),
                Effect::LoadPreview(attempt) => exec.submit(Job::Preview(attempt)),
                Effect::ScrollIntoView(i) => grid.scroll_to(i, app.columns()),
                Effect::HideWindow | Effect::FocusSearch => {}
            }
        }
        for d in done {
            match d {
                Done::Backend(reply) => app.apply_reply(reply, now),
                Done::Image {
                    id,
                    seq,
                    outcome: ProbeOutcome::Loaded,
                } => app.image_loaded(&id, seq),
                Done::Image {
                    id,
                    seq,
                    outcome: ProbeOutcome::Failed(reason),
                } => {
                    tracing::debug!(id, seq, reason, "image attempt failed");
                    app.image_failed(&id, seq, now);
                }
                Done::Preview {
                    seq,
                    outcome: ProbeOutcome::Loaded,
                } => app.preview_loaded(seq),
                Done::Preview {
                    seq,
                    outcome: ProbeOutcome::Failed(reason),
                } => {
                    tracing::debug!(seq, reason, "preview failed");
                    app.preview_failed(seq);
                }
            }
        }
    }
}

/// Returns true when the user asked to quit outright.
fn handle_key(app: &mut App, window: &mut TerminalWindow, key: KeyEvent, now: Instant) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }
    if app.modal().is_some() {
        match key.code {
            KeyCode::Esc => app.close_modal(),
            KeyCode::Enter => {
                app.submit_modal();
            }
            code => app.edit_modal(|modal| apply_modal_key(modal, code, ctrl)),
        }
        return false;
    }
    if let Some(nav) = nav_key(key.code) {
        app.key(nav);
        return false;
    }
    match key.code {
        KeyCode::Delete => app.delete_selected(now),
        KeyCode::Char('x') if ctrl => app.delete_selected(now),
        KeyCode::Char('a') if ctrl => {
            window.search_focused = false;
            app.open_add();
        }
        KeyCode::Char('e') if ctrl => {
            if let Some(id) = app.selected_gif().map(|g| g.id.clone()) {
                window.search_focused = false;
                app.open_edit_tags(&id);
            }
        }
        KeyCode::Char('r') if ctrl => app.reload(),
        KeyCode::Char(c) if !ctrl => {
            window.search_focused = true;
            let mut q = app.query().to_string();
            q.push(c);
            app.set_query(q);
        }
        KeyCode::Backspace => {
            let mut q = app.query().to_string();
            q.pop();
            app.set_query(q);
        }
        _ => {}
    }
    false
}

fn apply_modal_key(modal: &mut Modal, code: KeyCode, ctrl: bool) {
    match code {
        KeyCode::Tab | KeyCode::BackTab => modal.next_field(),
        KeyCode::Backspace => {
            modal.active_input().pop();
        }
        // drop the last parsed tag
        KeyCode::Char('w') if ctrl => {
            let n = modal.tags().len();
            if n > 0 {
                modal.remove_tag(n - 1);
            }
        }
        KeyCode::Char(c) if !ctrl => modal.active_input().push(c),
        _ => {}
    }
}

fn nav_key(code: KeyCode) -> Option<NavKey> {
    Some(match code {
        KeyCode::Up => NavKey::Up,
        KeyCode::Down => NavKey::Down,
        KeyCode::Left => NavKey::Left,
        KeyCode::Right => NavKey::Right,
        KeyCode::Enter => NavKey::Enter,
        KeyCode::Esc => NavKey::Escape,
        _ => return None,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn render(f: &mut Frame, app: &App, grid: &mut GridView, window: &TerminalWindow) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(f.area());

    let search_style = if window.search_focused && app.modal().is_none() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    let query_line = if app.query().is_empty() {
        Line::from(Span::styled(
            "Search by URL or tag...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(app.query().to_string())
    };
    f.render_widget(
        Paragraph::new(query_line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(search_style)
                .title(" gifwat "),
        ),
        header,
    );

    render_grid(f, app, grid, body);

    let help = if app.is_loading() {
        "loading…".to_string()
    } else {
        format!(
            "{} gifs • ←↑↓→ move • Enter copy • Del delete • ^A add • ^E tags • Esc hide",
            app.gifs().len()
        )
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::Yellow)),
        footer,
    );

    if let Some(modal) = app.modal() {
        render_modal(f, modal);
    }
}

fn render_grid(f: &mut Frame, app: &App, grid: &mut GridView, area: Rect) {
    if let Some(msg) = app.empty_message() {
        let mut lines = vec![Line::from(msg)];
        if app.gifs().is_empty() {
            lines.push(Line::from("Press Ctrl+A to get started."));
        }
        f.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            area,
        );
        return;
    }
    let cols = app.columns();
    let visible = app.visible();
    let total_rows = visible.len().div_ceil(cols);
    grid.rows = ((area.height / CARD_HEIGHT) as usize).max(1);
    grid.fit(total_rows);

    let row_areas = Layout::vertical(vec![Constraint::Length(CARD_HEIGHT); grid.rows]).split(area);
    for (r, row_area) in row_areas.iter().enumerate() {
        let row = grid.first_row + r;
        if row >= total_rows {
            break;
        }
        let cells = Layout::horizontal(vec![Constraint::Ratio(1, cols as u32); cols]).split(*row_area);
        for (c, cell) in cells.iter().enumerate() {
            let index = row * cols + c;
            let Some(gif) = visible.get(index) else {
                break;
            };
            render_card(f, app, index, gif, *cell);
        }
    }
}

fn render_card(f: &mut Frame, app: &App, index: usize, gif: &gifwat_core::Gif, area: Rect) {
    let selected = app.selected() == Some(index);
    let copied = app.is_copied(&gif.id);
    let border = if copied {
        Style::default().fg(Color::Green)
    } else if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let width = area.width.saturating_sub(2) as usize;
    let status = match app.item(&gif.id).map(|i| (i.image.status(), i.image.retry_count())) {
        Some((LoadStatus::Loaded, _)) => Span::styled("●", Style::default().fg(Color::Green)),
        Some((LoadStatus::Failed, _)) => {
            Span::styled("Failed to load", Style::default().fg(Color::Red))
        }
        Some((LoadStatus::Retrying, n)) => Span::styled(
            format!("retrying ({}/{})", n + 1, app.config().max_retries),
            Style::default().fg(Color::Yellow),
        ),
        _ => Span::styled("…", Style::default().fg(Color::DarkGray)),
    };
    let delete = if app.is_confirming_delete(&gif.id) {
        Span::styled(" [?] Del again", Style::default().fg(Color::Red))
    } else {
        Span::raw(" [×]")
    };
    let tags = gif
        .tags
        .iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ");
    let lines = vec![
        Line::from(truncate(&gif.url, width)),
        Line::from(vec![status, delete]),
        Line::from(Span::styled(
            app.card_label(index),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(truncate(&tags, width)),
        ),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn render_modal(f: &mut Frame, modal: &Modal) {
    let area = centered(f.area(), 60, 11);
    let title = match modal.kind {
        ModalKind::Add => " Add GIF ",
        ModalKind::EditTags(_) => " Edit tags ",
    };
    let field_style = |field: FormField| {
        if modal.field == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };
    let chips: Vec<Span> = modal
        .tags()
        .into_iter()
        .map(|t| Span::styled(format!(" {t} "), Style::default().bg(Color::DarkGray)))
        .flat_map(|s| [s, Span::raw(" ")])
        .collect();
    let submit = if modal.is_submitting() {
        Span::styled("saving…", Style::default().fg(Color::Yellow))
    } else if modal.can_submit() {
        Span::styled("[Enter] save", Style::default().fg(Color::Green))
    } else {
        Span::styled("[Enter] save", Style::default().fg(Color::DarkGray))
    };
    let preview = match modal.preview() {
        PreviewStatus::Empty => Span::raw(""),
        PreviewStatus::Loading => {
            Span::styled("checking preview…", Style::default().fg(Color::DarkGray))
        }
        PreviewStatus::Loaded => Span::styled("● preview ok", Style::default().fg(Color::Green)),
        PreviewStatus::Failed => {
            Span::styled("Could not load preview", Style::default().fg(Color::Red))
        }
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("GIF URL: ", field_style(FormField::Url)),
            Span::raw(modal.url.clone()),
        ]),
        Line::from(preview),
        Line::from(vec![
            Span::styled("Tags:    ", field_style(FormField::Tags)),
            Span::raw(modal.tags_input.clone()),
        ]),
        Line::from(chips),
        Line::from(""),
        Line::from(vec![
            submit,
            Span::raw("  [Tab] field  [^W] drop tag  [Esc] cancel"),
        ]),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
