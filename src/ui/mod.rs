pub mod clients;
pub mod client_wizard;
pub mod people;
pub mod person_wizard;

use tui::{
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::forms::FormOutcome;

/// Result message shown after a form submission
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub text: String,
    pub success: bool,
}

impl Banner {
    pub fn from_outcome(outcome: &FormOutcome) -> Self {
        Self {
            text: outcome.message(),
            success: outcome.is_success(),
        }
    }
}

/// One-line status area; empty when there is nothing to report
pub fn status_paragraph(banner: Option<&Banner>) -> Paragraph<'static> {
    let (text, style) = match banner {
        Some(banner) if banner.success => (banner.text.clone(), Style::default().fg(Color::Green)),
        Some(banner) => (banner.text.clone(), Style::default().fg(Color::Red)),
        None => (String::new(), Style::default()),
    };

    Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"))
}
