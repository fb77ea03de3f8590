use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame, Terminal,
};
use std::{io, path::Path, time::Duration};

use crate::sink::{read_run_records, RunRecord};

/// Full-screen table of past runs from the ledger. `q` quits.
pub fn run_dashboard(ledger: &Path) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, ledger);

    // Restore terminal even if the loop failed
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ledger: &Path,
) -> anyhow::Result<()> {
    let mut table_state = TableState::default();
    table_state.select(Some(0));

    loop {
        // Re-read each tick so runs finishing in another terminal show up
        let records = read_run_records(ledger).unwrap_or_else(|_| vec![]);
        terminal.draw(|f| ui(f, &records, &mut table_state))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Down => table_state.select(next_row(table_state.selected(), records.len())),
                    KeyCode::Up => table_state.select(previous_row(table_state.selected(), records.len())),
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn next_row(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match selected {
        Some(i) if i + 1 < len => Some(i + 1),
        _ => Some(0),
    }
}

fn previous_row(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match selected {
        Some(i) if i > 0 && i < len => Some(i - 1),
        _ => Some(len - 1),
    }
}

fn ui(f: &mut Frame, records: &[RunRecord], table_state: &mut TableState) {
    let rects = Layout::default()
        .constraints([Constraint::Percentage(100)].as_ref())
        .margin(1)
        .split(f.size());

    let selected_style = Style::default().add_modifier(Modifier::REVERSED).fg(Color::Yellow);
    let normal_style = Style::default().fg(Color::White);
    let header_cells = [
        "Run", "Date", "Phrase", "Words", "Scored", "Failed", "Cost", "Elapsed",
    ]
    .iter()
    .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(normal_style)
        .height(1)
        .bottom_margin(1);

    // Newest run first
    let rows = records.iter().rev().map(|item| {
        let failed_style = if item.failed_batches > 0 {
            Style::default().fg(Color::Red)
        } else {
            normal_style
        };
        let cells = vec![
            Cell::from(item.run_id.clone()),
            Cell::from(item.date.clone()),
            Cell::from(item.phrase.clone()),
            Cell::from(item.total_words.to_string()),
            Cell::from(item.scored_words.to_string()),
            Cell::from(item.failed_batches.to_string()).style(failed_style),
            Cell::from(format!("${:.2}", item.estimated_cost)),
            Cell::from(format!("{:.1}s", item.elapsed_secs)),
        ];
        Row::new(cells).style(normal_style)
    });

    let col_widths = vec![
        Constraint::Min(15), // Run
        Constraint::Min(12), // Date
        Constraint::Min(24), // Phrase
        Constraint::Min(8),  // Words
        Constraint::Min(8),  // Scored
        Constraint::Min(8),  // Failed
        Constraint::Min(8),  // Cost
        Constraint::Min(9),  // Elapsed
    ];

    let table = Table::new(rows, col_widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Scoring runs (q to quit)"))
        .highlight_style(selected_style)
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, rects[0], table_state);
}
