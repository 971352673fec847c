use crate::app::App;
use crate::theme;
use crate::view::{DashboardView, PnlCell, UNKNOWN_TEXT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

const POSITION_HEADERS: [&str; 11] = [
    "SYMBOL", "SIDE", "QTY", "ENTRY", "STOP", "TARGET", "TSL", "MARK", "STRATEGY", "OPENED", "PNL",
];
const HISTORY_HEADERS: [&str; 5] = ["EXIT", "SYMBOL", "SIDE", "STRATEGY", "PNL"];

pub fn render(f: &mut Frame, app: &App) {
    let area = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Min(5),
        ])
        .split(area);
    f.render_widget(render_header(app), layout[0]);
    f.render_widget(render_positions(app.view()), layout[1]);
    f.render_widget(render_history(app.view(), app.history_scroll()), layout[2]);
    if app.help_open() {
        render_help(f, area);
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(theme::SURFACE))
        .title(Span::styled(title.to_string(), theme::TITLE_STYLE))
}

fn pnl_span(cell: &PnlCell) -> Span<'static> {
    Span::styled(cell.text.clone(), Style::default().fg(theme::pnl_color(cell.class)))
}

fn render_header(app: &App) -> Paragraph<'static> {
    let view = app.view();
    let status = view.status();
    let kpis = view.kpis();
    let channel = app.channel_state();
    let server_color = if status.online {
        theme::PROFIT
    } else {
        theme::LOSS
    };
    let refreshed = app
        .last_pull_at()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| UNKNOWN_TEXT.to_string());

    let mut first = vec![
        Span::styled("Stream: ", Style::default().fg(theme::MUTED)),
        Span::styled(
            channel.label().to_string(),
            Style::default().fg(theme::channel_color(channel)),
        ),
        Span::styled("  Server: ", Style::default().fg(theme::MUTED)),
        Span::styled(status.connectivity.clone(), Style::default().fg(server_color)),
        Span::styled("  Trend: ", Style::default().fg(theme::MUTED)),
        Span::styled(status.trend.clone(), Style::default().fg(theme::TEXT)),
        Span::styled("  Refreshed: ", Style::default().fg(theme::MUTED)),
        Span::styled(refreshed, Style::default().fg(theme::TEXT)),
    ];
    if let Some(detail) = status.detail.as_deref() {
        first.push(Span::styled(
            format!("  ({detail})"),
            Style::default().fg(theme::WARN),
        ));
    }

    let win_rate = kpis
        .win_rate()
        .map(|rate| format!("{rate:.0}%"))
        .unwrap_or_else(|| UNKNOWN_TEXT.to_string());
    let second = vec![
        Span::styled(
            format!("Open: {}  Unrealized: ", kpis.open_positions),
            Style::default().fg(theme::MUTED),
        ),
        pnl_span(&kpis.unrealized_cell()),
        Span::styled(
            format!("  Closed: {}  Realized: ", kpis.closed_trades),
            Style::default().fg(theme::MUTED),
        ),
        pnl_span(&kpis.realized_cell()),
        Span::styled(
            format!("  Win rate: {win_rate}  "),
            Style::default().fg(theme::MUTED),
        ),
        Span::styled(
            app.status_note().unwrap_or("? help").to_string(),
            Style::default().fg(theme::ACCENT),
        ),
    ];

    let title = format!("Synapse Monitor · {}", app.server_label());
    Paragraph::new(Text::from(vec![Line::from(first), Line::from(second)]))
        .style(Style::default().fg(theme::TEXT).bg(theme::BG))
        .block(panel(&title).style(Style::default().bg(theme::BG)))
}

fn header_row(labels: &[&str]) -> Row<'static> {
    Row::new(
        labels
            .iter()
            .map(|label| Cell::from(label.to_string()))
            .collect::<Vec<_>>(),
    )
    .style(theme::HEADER_STYLE)
}

fn render_positions(view: &DashboardView) -> Table<'static> {
    let rows: Vec<Row> = view
        .positions()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            Row::new(vec![
                Cell::from(row.symbol.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(row.side.clone()),
                Cell::from(row.quantity.clone()),
                Cell::from(row.entry_price.clone()),
                Cell::from(row.sl_price.clone()),
                Cell::from(row.tp_price.clone()),
                Cell::from(row.tsl_price.clone()),
                Cell::from(row.mark_price.clone()),
                Cell::from(row.strategy.clone()),
                Cell::from(row.opened.clone()),
                Cell::from(pnl_span(&row.pnl)),
            ])
            .style(theme::zebra_row_style(idx))
        })
        .collect();
    let widths = [
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Min(10),
        Constraint::Length(20),
        Constraint::Length(14),
    ];
    let title = format!("Open Positions ({})", view.positions().len());
    Table::new(rows, widths)
        .header(header_row(&POSITION_HEADERS))
        .block(panel(&title))
}

fn render_history(view: &DashboardView, scroll: u16) -> Table<'static> {
    let rows: Vec<Row> = view
        .history()
        .iter()
        .skip(scroll as usize)
        .enumerate()
        .map(|(idx, row)| {
            Row::new(vec![
                Cell::from(row.exit_time.clone()),
                Cell::from(row.symbol.clone()),
                Cell::from(row.side.clone()),
                Cell::from(row.strategy.clone()),
                Cell::from(Span::styled(
                    row.pnl_display(),
                    Style::default().fg(theme::pnl_color(row.pnl.class)),
                )),
            ])
            .style(theme::zebra_row_style(idx))
        })
        .collect();
    let widths = [
        Constraint::Length(20),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Min(10),
        Constraint::Length(22),
    ];
    let title = format!("Trade History ({})", view.history().len());
    Table::new(rows, widths)
        .header(header_row(&HISTORY_HEADERS))
        .block(panel(&title))
}

fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 40, area);
    let lines = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("r", Style::default().fg(theme::ACCENT)),
            Span::raw("          Refresh now"),
        ]),
        Line::from(vec![
            Span::styled("j / Down", Style::default().fg(theme::ACCENT)),
            Span::raw("   Scroll history"),
        ]),
        Line::from(vec![
            Span::styled("k / Up", Style::default().fg(theme::ACCENT)),
            Span::raw("     Scroll history back"),
        ]),
        Line::from(vec![
            Span::styled("?", Style::default().fg(theme::ACCENT)),
            Span::raw("          Toggle help"),
        ]),
        Line::from(vec![
            Span::styled("q / Esc", Style::default().fg(theme::ACCENT)),
            Span::raw("    Quit"),
        ]),
    ];
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(panel("Help")),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
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
        .split(vertical[1])[1]
}

/// Plain-text rendering of the same rows, for one-shot output.
pub fn plain_lines(view: &DashboardView) -> Vec<String> {
    let status = view.status();
    let mut out = vec![format!(
        "Server: {}  Trend: {}{}",
        status.connectivity,
        status.trend,
        status
            .detail
            .as_deref()
            .map(|detail| format!("  ({detail})"))
            .unwrap_or_default()
    )];

    out.push(String::new());
    out.push(format!("--- Open Positions ({}) ---", view.positions().len()));
    if view.positions().is_empty() {
        out.push("None".to_string());
    } else {
        out.push(format!(
            "{:<12} | {:<5} | {:>10} | {:>14} | {:>14} | {:>14} | {:>12}",
            "SYMBOL", "SIDE", "QTY", "ENTRY", "STOP", "TSL", "PNL"
        ));
        for row in view.positions() {
            out.push(format!(
                "{:<12} | {:<5} | {:>10} | {:>14} | {:>14} | {:>14} | {:>12}",
                row.symbol,
                row.side,
                row.quantity,
                row.entry_price,
                row.sl_price,
                row.tsl_price,
                row.pnl.text
            ));
        }
    }

    out.push(String::new());
    out.push(format!("--- Trade History ({}) ---", view.history().len()));
    if view.history().is_empty() {
        out.push("None".to_string());
    } else {
        for row in view.history() {
            out.push(format!(
                "{:<19} | {:<12} | {:<5} | {}",
                row.exit_time,
                row.symbol,
                row.side,
                row.pnl_display()
            ));
        }
    }
    out
}
