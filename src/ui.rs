use color_eyre::eyre::Result;
use crossterm::{
    event::{
        KeyCode,
        KeyEvent,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use itertools::Itertools;
use lottery_client::{
    cache::LedgerSnapshot,
    notify::{
        Notice,
        Severity,
        WinnerBanner,
    },
    sequencer::PendingRequest,
    types::{
        Address,
        WEI_PER_ETH,
        Wei,
        format_eth,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthChar;

/// Everything the terminal UI needs for one frame.
pub struct AppView {
    pub network: String,
    pub account: Option<Address>,
    pub account_label: Option<String>,
    pub accounts: Vec<String>,
    pub is_manager: bool,
    pub snapshot: Option<LedgerSnapshot>,
    pub countdown: String,
    pub pending: Option<PendingRequest>,
    pub notices: Vec<Notice>,
    pub winner: Option<WinnerBanner>,
}

pub enum UserAction {
    Quit,
    Redraw,
    StartLottery,
    PickWinner,
    EnterLottery,
    Fund(Wei),
    SwitchAccount(usize),
    Refresh,
    DismissWinner,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    FundModal(FundState),
    QuitModal,
}

/// Fund amounts are edited in thousandths of an ETH.
#[derive(Clone, Debug, Default)]
struct FundState {
    milli_eth: u64,
}

impl FundState {
    fn wei(&self) -> Wei {
        Wei::from(self.milli_eth) * (WEI_PER_ETH / 1000)
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // a single persistent Terminal preserves buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserAction> {
    match &mut state.mode {
        Mode::FundModal(fund) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserAction::Redraw)
            }
            KeyCode::Enter => {
                let amount = fund.wei();
                state.mode = Mode::Normal;
                Some(UserAction::Fund(amount))
            }
            KeyCode::Up | KeyCode::Char('+') => {
                fund.milli_eth = fund.milli_eth.saturating_add(1);
                Some(UserAction::Redraw)
            }
            KeyCode::Down | KeyCode::Char('-') => {
                fund.milli_eth = fund.milli_eth.saturating_sub(1);
                Some(UserAction::Redraw)
            }
            KeyCode::Backspace => {
                fund.milli_eth /= 10;
                Some(UserAction::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let digit = c.to_digit(10).unwrap() as u64;
                fund.milli_eth = fund.milli_eth.saturating_mul(10).saturating_add(digit);
                Some(UserAction::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserAction::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserAction::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserAction::Redraw)
            }
            KeyCode::Char('e') => Some(UserAction::EnterLottery),
            KeyCode::Char('f') => {
                state.mode = Mode::FundModal(FundState::default());
                Some(UserAction::Redraw)
            }
            KeyCode::Char('s') => Some(UserAction::StartLottery),
            KeyCode::Char('w') => Some(UserAction::PickWinner),
            KeyCode::Char('o') => Some(UserAction::SwitchAccount(0)),
            KeyCode::Char('a') => Some(UserAction::SwitchAccount(1)),
            KeyCode::Char('r') => Some(UserAction::Refresh),
            KeyCode::Char('d') => Some(UserAction::DismissWinner),
            _ => None,
        },
    }
}

pub fn draw(state: &mut UiState, view: &AppView) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, view: &AppView) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // connection header
            Constraint::Length(9), // lottery panel
            Constraint::Length(3), // countdown
            Constraint::Min(5),    // notices
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], view);
    draw_lottery(f, chunks[1], view);
    draw_countdown(f, chunks[2], view);
    draw_notices(f, chunks[3], view);
    draw_help(f, chunks[4], view);
    draw_modals(f, state, view);
}

fn draw_header(f: &mut Frame, area: Rect, view: &AppView) {
    let account = match (view.account, &view.account_label) {
        (Some(addr), Some(label)) => format!("{} ({})", label, addr.short()),
        (Some(addr), None) => addr.short(),
        _ => String::from("Not connected"),
    };
    let pending = match &view.pending {
        Some(request) => format!(
            " | Pending: {:?} #{}",
            request.kind, request.sequence
        ),
        None => String::new(),
    };
    let header = Paragraph::new(format!(
        "Network: {} | Account: {}{}",
        view.network, account, pending
    ))
    .block(Block::default().borders(Borders::ALL).title("Connection"));
    f.render_widget(header, area);
}

fn draw_lottery(f: &mut Frame, area: Rect, view: &AppView) {
    let mut lines: Vec<Line> = Vec::new();
    match &view.snapshot {
        Some(snapshot) => {
            let (status, color) = if snapshot.is_open {
                ("Open", Color::Green)
            } else {
                ("Closed", Color::Red)
            };
            lines.push(Line::from(vec![
                Span::raw("Status: "),
                Span::styled(status, Style::default().fg(color)),
            ]));
            lines.push(Line::from(format!(
                "Entry Fee: {} ETH",
                format_eth(snapshot.entry_fee)
            )));
            lines.push(Line::from(format!("Players: {}", snapshot.player_count)));
            lines.push(Line::from(format!(
                "Prize Pool: {} ETH",
                format_eth(snapshot.prize_pool)
            )));
            if let Some(winner) = snapshot.last_winner {
                lines.push(Line::from(format!(
                    "Last Winner: {} ({} ETH)",
                    winner.short(),
                    format_eth(snapshot.last_prize)
                )));
            }
            let instructions = if snapshot.is_open {
                format!(
                    "Send {} ETH to enter the lottery",
                    format_eth(snapshot.entry_fee)
                )
            } else {
                String::from("Lottery is currently closed")
            };
            lines.push(Line::styled(
                instructions,
                Style::default().fg(Color::DarkGray),
            ));
        }
        None => lines.push(Line::styled(
            "Loading lottery information...",
            Style::default().fg(Color::DarkGray),
        )),
    }
    let panel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Lottery"));
    f.render_widget(panel, area);
}

fn draw_countdown(f: &mut Frame, area: Rect, view: &AppView) {
    let panel = Paragraph::new(Line::styled(
        view.countdown.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL).title("Next Draw"));
    f.render_widget(panel, area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn draw_notices(f: &mut Frame, area: Rect, view: &AppView) {
    let width = area.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if view.notices.is_empty() {
        lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    }
    for notice in &view.notices {
        let text = format!(
            "[{}] {}",
            notice.at.format("%H:%M:%S"),
            notice.message
        );
        lines.push(Line::styled(
            truncate_to_width(&text, width),
            Style::default().fg(severity_color(notice.severity)),
        ));
    }
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Notifications"));
    f.render_widget(panel, area);
}

fn draw_help(f: &mut Frame, area: Rect, view: &AppView) {
    let mut hints = vec!["[e] enter", "[f] fund"];
    if view.is_manager {
        hints.push("[s] start round");
        hints.push("[w] pick winner");
    }
    if view.accounts.len() > 1 {
        hints.push("[o]/[a] switch account");
    }
    hints.push("[r] refresh");
    hints.push("[q] quit");
    let help = Paragraph::new(hints.iter().join("  "))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, view: &AppView) {
    if let Some(banner) = &view.winner {
        let rect = centered_rect(52, 5, f.area());
        f.render_widget(Clear, rect);
        let body = Paragraph::new(vec![
            Line::styled(
                format!(
                    "Congratulations! You won {} ETH!",
                    format_eth(banner.amount)
                ),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::styled("[d] dismiss", Style::default().fg(Color::DarkGray)),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Winner!")
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(body, rect);
    }
    match &state.mode {
        Mode::FundModal(fund) => {
            let rect = centered_rect(44, 5, f.area());
            f.render_widget(Clear, rect);
            let body = Paragraph::new(vec![
                Line::from(format!("Amount: {} ETH", format_eth(fund.wei()))),
                Line::styled(
                    "digits edit, +/- step, Enter send, Esc cancel",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Fund the prize pool"),
            );
            f.render_widget(body, rect);
        }
        Mode::QuitModal => {
            let rect = centered_rect(24, 3, f.area());
            f.render_widget(Clear, rect);
            let body = Paragraph::new("Quit? [y]/[n]")
                .block(Block::default().borders(Borders::ALL).title("Confirm"));
            f.render_widget(body, rect);
        }
        Mode::Normal => {}
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max {
            out.push('…');
            break;
        }
        width += w;
        out.push(ch);
    }
    out
}
