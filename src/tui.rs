use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{source_label, Application, Status};
use crate::report::{build_weekly_report, format_date, truncate};
use crate::store::Storage;
use crate::tracker::Tracker;

struct AppState {
    search: String,
    ids: Vec<String>,
    selected: usize,
    scroll_offset: u16,
    show_report: bool,
    message: Option<String>,
}

impl AppState {
    fn new<S: Storage>(tracker: &Tracker<S>, search: String) -> Self {
        let mut state = Self {
            search,
            ids: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            show_report: false,
            message: None,
        };
        state.refresh(tracker);
        state
    }

    /// Recompute the view after a mutation, keeping the same record selected
    /// when it is still visible.
    fn refresh<S: Storage>(&mut self, tracker: &Tracker<S>) {
        let current = self.ids.get(self.selected).cloned();
        self.ids = tracker
            .view(&self.search)
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        self.selected = current
            .and_then(|id| self.ids.iter().position(|i| *i == id))
            .unwrap_or(0)
            .min(self.ids.len().saturating_sub(1));
    }

    fn current_id(&self) -> Option<&str> {
        self.ids.get(self.selected).map(String::as_str)
    }

    fn next(&mut self) {
        if !self.ids.is_empty() && self.selected < self.ids.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse<S: Storage>(tracker: &mut Tracker<S>, search: Option<&str>) -> Result<()> {
    let mut state = AppState::new(tracker, search.unwrap_or_default().to_string());
    if state.ids.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, tracker);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn set_status<S: Storage>(tracker: &mut Tracker<S>, state: &mut AppState, status: Status) -> Result<()> {
    let Some(id) = state.current_id().map(str::to_string) else {
        return Ok(());
    };
    let Some(app) = tracker.get(&id) else {
        return Ok(());
    };
    let mut draft = app.details.clone();
    draft.status = status;
    tracker.update(&id, draft)?;
    state.message = Some(format!("Status set to {status}"));
    Ok(())
}

fn run_loop<S: Storage>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    tracker: &mut Tracker<S>,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));

    loop {
        terminal.draw(|frame| draw(frame, state, tracker, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            state.message = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('w') => state.show_report = !state.show_report,
                KeyCode::Char('f') => {
                    if let Some(id) = state.current_id().map(str::to_string) {
                        if let Some(favorite) = tracker.toggle_favorite(&id)? {
                            let msg = if favorite { "Marked favorite" } else { "Removed favorite" };
                            state.message = Some(msg.to_string());
                        }
                    }
                }
                KeyCode::Char('a') => set_status(tracker, state, Status::Applied)?,
                KeyCode::Char('i') => set_status(tracker, state, Status::Interviewing)?,
                KeyCode::Char('o') => set_status(tracker, state, Status::Offered)?,
                KeyCode::Char('x') => set_status(tracker, state, Status::Rejected)?,
                KeyCode::Char('c') => set_status(tracker, state, Status::Accepted)?,
                _ => {}
            }
            state.refresh(tracker);
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Interviewing => Style::default().fg(Color::Yellow),
        Status::Offered => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
        Status::Accepted => Style::default().fg(Color::Magenta),
    }
}

fn draw<S: Storage>(
    frame: &mut Frame,
    state: &AppState,
    tracker: &Tracker<S>,
    list_state: &mut ListState,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .ids
        .iter()
        .filter_map(|id| tracker.get(id))
        .map(|app| {
            let d = &app.details;
            let star = if d.favorite { "*" } else { " " };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} {} ", star, d.applied_date.format("%Y-%m-%d"))),
                Span::styled(format!("{:<12} ", d.status), status_style(d.status)),
                Span::raw(format!(
                    "{} | {}",
                    truncate(&d.position, 24),
                    truncate(&d.company, 18)
                )),
            ]))
        })
        .collect();

    let title = if state.search.is_empty() {
        format!(" Applications ({}) ", state.ids.len())
    } else {
        format!(" Applications ({}) matching '{}' ", state.ids.len(), state.search)
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail or weekly report
    let (panel_title, body) = if state.show_report {
        (" Weekly Report ", build_report_text(tracker))
    } else {
        let app = state.current_id().and_then(|id| tracker.get(id));
        (" Detail ", build_detail(app))
    };
    let detail_widget = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(panel_title))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let footer = match &state.message {
        Some(msg) => format!(" {msg}"),
        None => " j/k:navigate  J/K:scroll  f:favorite  a/i/o/x/c:status  w:weekly report  q:quit"
            .to_string(),
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}

fn build_detail(app: Option<&Application>) -> Text<'_> {
    let Some(app) = app else {
        return Text::raw("No application selected");
    };
    let d = &app.details;

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        d.position.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {} ({})", d.company, d.location)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", d.status),
        status_style(d.status),
    )));
    lines.push(Line::from(format!("Applied: {}", format_date(d.applied_date))));
    lines.push(Line::from(format!("Source: {}", source_label(&d.source))));
    if d.favorite {
        lines.push(Line::from(Span::styled("Favorite", Style::default().fg(Color::Yellow))));
    }

    for (label, value) in [
        ("Salary", &d.salary),
        ("Job URL", &d.job_url),
        ("Company URL", &d.company_url),
        ("Last contact", &d.last_contact),
        ("Next steps", &d.next_steps),
    ] {
        if let Some(v) = value {
            lines.push(Line::from(format!("{label}: {v}")));
        }
    }

    lines.push(Line::from(""));

    if !d.contacts.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Contacts ({})", d.contacts.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for contact in &d.contacts {
            let mut line = format!("  {}", contact.name);
            if let Some(role) = &contact.role {
                line.push_str(&format!(" - {role}"));
            }
            lines.push(Line::from(line));
            for v in [&contact.email, &contact.phone, &contact.notes].into_iter().flatten() {
                lines.push(Line::from(Span::styled(
                    format!("    {v}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    if !d.notes.is_empty() {
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&d.notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

fn build_report_text<S: Storage>(tracker: &Tracker<S>) -> Text<'static> {
    let buckets = build_weekly_report(tracker.applications());
    let mut lines: Vec<Line> = Vec::new();

    for bucket in &buckets {
        let n = bucket.applications.len();
        lines.push(Line::from(Span::styled(
            format!(
                "{} - {}  ({} application{})",
                format_date(bucket.start_date),
                format_date(bucket.end_date),
                n,
                if n == 1 { "" } else { "s" }
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let counts: Vec<Span> = bucket
            .status_counts()
            .into_iter()
            .map(|(status, n)| Span::styled(format!("  {status} {n}"), status_style(status)))
            .collect();
        lines.push(Line::from(counts));
        for app in &bucket.applications {
            let d = &app.details;
            lines.push(Line::from(format!(
                "  {}  {} | {}",
                d.applied_date.format("%m-%d"),
                truncate(&d.company, 20),
                truncate(&d.position, 24)
            )));
        }
        lines.push(Line::from(""));
    }

    Text::from(lines)
}
