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
use crate::forms::PersonSubmission;
use crate::models::{Client, ClientId};

pub enum PersonWizardAction {
    Cancel,
    Submit(PersonSubmission),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum PersonField {
    Client,
    Name,
    Email,
}

pub struct PersonWizardState {
    clients: Vec<Client>,
    /// Index into `clients`; `None` is the "Select Client" placeholder
    selected: Option<usize>,
    pub name: String,
    pub email: String,
    pub current_field: PersonField,
    pub editing: bool,
    pub banner: Option<Banner>,
    /// People screen to go back to, if the wizard was opened from one
    return_to: Option<ClientId>,
}

impl PersonWizardState {
    pub fn new(clients: Vec<Client>, preselect: Option<ClientId>, return_to: Option<ClientId>) -> Self {
        let selected = preselect.and_then(|id| clients.iter().position(|c| c.id == id));

        Self {
            clients,
            selected,
            name: String::new(),
            email: String::new(),
            current_field: PersonField::Client,
            editing: false,
            banner: None,
            return_to,
        }
    }

    pub fn return_to(&self) -> Option<ClientId> {
        self.return_to
    }

    /// Replace the dropdown entries, keeping the current choice if it still exists
    pub fn refresh_clients(&mut self, clients: Vec<Client>) {
        let current = self.selected_client().map(|c| c.id);
        self.selected = current.and_then(|id| clients.iter().position(|c| c.id == id));
        self.clients = clients;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.selected.and_then(|i| self.clients.get(i))
    }

    /// Step through placeholder, then each client, then back to placeholder
    pub fn next_client(&mut self) {
        self.selected = match self.selected {
            None if !self.clients.is_empty() => Some(0),
            Some(i) if i + 1 < self.clients.len() => Some(i + 1),
            _ => None,
        };
    }

    pub fn previous_client(&mut self) {
        self.selected = match self.selected {
            None => self.clients.len().checked_sub(1),
            Some(0) => None,
            Some(i) => Some(i - 1),
        };
    }

    pub fn toggle_editing(&mut self) {
        // The client field is picked with Left/Right, not typed
        if self.current_field == PersonField::Client {
            return;
        }
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            PersonField::Client => PersonField::Name,
            PersonField::Name => PersonField::Email,
            PersonField::Email => PersonField::Client,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            PersonField::Client => PersonField::Email,
            PersonField::Name => PersonField::Client,
            PersonField::Email => PersonField::Name,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            PersonField::Client => return,
            PersonField::Name => &mut self.name,
            PersonField::Email => &mut self.email,
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

    pub fn submission(&self) -> PersonSubmission {
        PersonSubmission {
            client_id: self.selected_client().map(|c| c.id),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

pub fn render_person_wizard<B: Backend>(f: &mut Frame<B>, state: &mut PersonWizardState) {
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

    let title = Paragraph::new("Manage People")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    f.render_widget(status_paragraph(state.banner.as_ref()), chunks[2]);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Cancel editing"
    } else if state.current_field == PersonField::Client {
        "Left/Right - Select client | Up/Down - Navigate fields | S - Add person | Esc - Cancel"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Add person | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut PersonWizardState, area: Rect) {
    let field_names = ["Select Client", "Person's Name", "Person's Email"];

    let client_value = match state.selected_client() {
        Some(client) => format!("< {} >", client.name),
        None => "< Select Client >".to_string(),
    };
    let field_values = [client_value, state.name.clone(), state.email.clone()];

    let items: Vec<ListItem> = field_names
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
                    Span::raw(value.clone()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Person Details"))
        .highlight_style(Style::default().fg(Color::Yellow));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut PersonWizardState) -> Result<Option<PersonWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }

    Ok(None)
}

fn handle_key(state: &mut PersonWizardState, code: KeyCode) -> Option<PersonWizardAction> {
    match code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(PersonWizardAction::Cancel);
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
        KeyCode::Right if state.current_field == PersonField::Client => {
            state.next_client();
        }
        KeyCode::Left if state.current_field == PersonField::Client => {
            state.previous_client();
        }
        KeyCode::Char('s') if !state.editing => {
            return Some(PersonWizardAction::Submit(state.submission()));
        }
        _ if state.editing => {
            state.edit_current_field(code);
        }
        _ => {}
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clients() -> Vec<Client> {
        vec![
            Client {
                id: 3,
                name: "Acme".to_string(),
                email: "a@x.com".to_string(),
                account_key: "k3".to_string(),
            },
            Client {
                id: 8,
                name: "Globex".to_string(),
                email: "g@x.com".to_string(),
                account_key: "k8".to_string(),
            },
        ]
    }

    #[test]
    fn dropdown_cycles_through_placeholder() {
        let mut state = PersonWizardState::new(clients(), None, None);
        assert!(state.selected_client().is_none());

        handle_key(&mut state, KeyCode::Right);
        assert_eq!(state.selected_client().map(|c| c.id), Some(3));
        handle_key(&mut state, KeyCode::Right);
        assert_eq!(state.selected_client().map(|c| c.id), Some(8));
        handle_key(&mut state, KeyCode::Right);
        assert!(state.selected_client().is_none());
        handle_key(&mut state, KeyCode::Left);
        assert_eq!(state.selected_client().map(|c| c.id), Some(8));
    }

    #[test]
    fn preselected_client_flows_into_submission() {
        let mut state = PersonWizardState::new(clients(), Some(8), Some(8));
        assert_eq!(state.return_to(), Some(8));

        handle_key(&mut state, KeyCode::Down);
        handle_key(&mut state, KeyCode::Enter);
        for c in "Bob".chars() {
            handle_key(&mut state, KeyCode::Char(c));
        }
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Down);
        handle_key(&mut state, KeyCode::Enter);
        for c in "b@x.com".chars() {
            handle_key(&mut state, KeyCode::Char(c));
        }
        handle_key(&mut state, KeyCode::Enter);

        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(PersonWizardAction::Submit(submission)) => {
                assert_eq!(submission.client_id, Some(8));
                assert_eq!(submission.name, "Bob");
                assert_eq!(submission.email, "b@x.com");
            }
            _ => panic!("expected a submission"),
        }
    }

    #[test]
    fn unselected_client_submits_none() {
        let mut state = PersonWizardState::new(clients(), Some(99), None);
        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(PersonWizardAction::Submit(submission)) => assert_eq!(submission.client_id, None),
            _ => panic!("expected a submission"),
        }
    }

    #[test]
    fn refresh_keeps_existing_choice() {
        let mut state = PersonWizardState::new(clients(), Some(8), None);

        let mut updated = clients();
        updated.insert(0, Client {
            id: 1,
            name: "Initech".to_string(),
            email: "i@x.com".to_string(),
            account_key: "k1".to_string(),
        });
        state.refresh_clients(updated);

        assert_eq!(state.selected_client().map(|c| c.id), Some(8));
    }
}
