use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{status_paragraph, Banner};
use crate::forms::ClientSubmission;

pub enum ClientWizardAction {
    Cancel,
    Submit(ClientSubmission),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ClientField {
    Name,
    Email,
}

pub struct ClientWizardState {
    pub submission: ClientSubmission,
    pub current_field: ClientField,
    pub editing: bool,
    pub banner: Option<Banner>,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            submission: ClientSubmission::default(),
            current_field: ClientField::Name,
            editing: false,
            banner: None,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::Name => ClientField::Email,
            ClientField::Email => ClientField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        // Two fields, so stepping back is the same as stepping forward
        self.next_field();
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Name => &mut self.submission.name,
            ClientField::Email => &mut self.submission.email,
        };

        match key {
            KeyCode::Char(c) => {
                field_value.push(c);
            }
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title = Paragraph::new("Add New Client")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    f.render_widget(status_paragraph(state.banner.as_ref()), chunks[2]);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Cancel editing"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Add client | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState, area: Rect) {
    let field_names = ["Client Name", "Client Email"];
    let field_values = [&state.submission.name, &state.submission.email];

    let mut items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let content = if i == state.current_field as usize && state.editing {
                Spans::from(vec![
                    Span::styled(
                        format!("{}: ", name),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        format!("{}|", value),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if i == state.current_field as usize {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    // Read-only, filled in when the client is stored
    items.push(ListItem::new(Spans::from(vec![
        Span::styled("Account Key: ", Style::default().fg(Color::DarkGray)),
        Span::styled("(generated on save)", Style::default().fg(Color::DarkGray)),
    ])));

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"))
        .highlight_style(Style::default().fg(Color::Yellow));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }

    Ok(None)
}

fn handle_key(state: &mut ClientWizardState, code: KeyCode) -> Option<ClientWizardAction> {
    match code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ClientWizardAction::Cancel);
            }
        }
        KeyCode::Enter => {
            state.toggle_editing();
        }
        KeyCode::Up if !state.editing => {
            state.previous_field();
        }
        KeyCode::Down if !state.editing => {
            state.next_field();
        }
        KeyCode::Char('s') if !state.editing => {
            return Some(ClientWizardAction::Submit(state.submission.clone()));
        }
        _ if state.editing => {
            state.edit_current_field(code);
        }
        _ => {}
    }

    None
}
