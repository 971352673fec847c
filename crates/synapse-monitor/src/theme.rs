use crate::push::ChannelState;
use crate::view::PnlClass;
use ratatui::style::{Color, Modifier, Style};

pub const BG: Color = Color::Rgb(11, 18, 32);
pub const SURFACE: Color = Color::Rgb(17, 26, 46);
pub const BORDER: Color = Color::Rgb(71, 85, 105);
pub const TEXT: Color = Color::Rgb(226, 232, 240);
pub const MUTED: Color = Color::Rgb(148, 163, 184);
pub const ACCENT: Color = Color::Rgb(56, 189, 248);
pub const PROFIT: Color = Color::Rgb(34, 197, 94);
pub const LOSS: Color = Color::Rgb(239, 68, 68);
pub const WARN: Color = Color::Rgb(245, 158, 11);

pub const TITLE_STYLE: Style = Style::new()
    .fg(Color::Rgb(191, 219, 254))
    .add_modifier(Modifier::BOLD);
pub const HEADER_STYLE: Style = Style::new().fg(ACCENT).add_modifier(Modifier::BOLD);

pub fn pnl_color(class: Option<PnlClass>) -> Color {
    match class {
        Some(PnlClass::Profit) => PROFIT,
        Some(PnlClass::Loss) => LOSS,
        None => MUTED,
    }
}

pub fn channel_color(state: ChannelState) -> Color {
    match state {
        ChannelState::Open => PROFIT,
        ChannelState::Connecting => WARN,
        ChannelState::ClosedPendingReconnect => LOSS,
    }
}

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().fg(TEXT).bg(bg)
}
