use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{status_paragraph, Banner};
use crate::models::{Client, ClientId};

// Represents the state of the client listing screen
pub struct ClientsState {
    clients: Vec<Client>,
    list_state: ListState,
    banner: Option<Banner>,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>, banner: Option<Banner>) -> Self {
        let mut list_state = ListState::default();
        if !clients.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            clients,
            list_state,
            banner,
        }
    }

    pub fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.clients.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.clients.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<ClientId> {
        self.selected_client().map(|c| c.id)
    }
}

pub enum ClientAction {
    Quit,
    NewClient,
    AddPerson(Option<ClientId>), // Preselected client, if any
    ViewPeople(ClientId),
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            ListItem::new(Spans::from(vec![
                Span::raw(&client.name),
                Span::styled(format!("  <{}>", client.email), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let title = if state.clients.is_empty() {
        "Clients (no clients found)"
    } else {
        "Clients"
    };

    let clients_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    let key_text = state
        .selected_client()
        .map(|c| c.account_key.clone())
        .unwrap_or_default();
    let account_key = Paragraph::new(key_text)
        .block(Block::default().title("Account Key").borders(Borders::ALL));
    frame.render_widget(account_key, chunks[1]);

    frame.render_widget(status_paragraph(state.banner.as_ref()), chunks[2]);

    let buttons_text = if state.selected_client().is_some() {
        "<N> New Client | <P> Add Person | <Enter> View People | <Q> Quit"
    } else {
        "<N> New Client | <Q> Quit"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[3]);
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

fn handle_key(state: &mut ClientsState, code: KeyCode) -> Option<ClientAction> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(ClientAction::Quit),
        KeyCode::Char('n') => Some(ClientAction::NewClient),
        KeyCode::Char('p') if !state.clients.is_empty() => {
            Some(ClientAction::AddPerson(state.selected_client_id()))
        }
        KeyCode::Down => {
            state.next();
            None
        }
        KeyCode::Up => {
            state.previous();
            None
        }
        KeyCode::Enter => state.selected_client_id().map(ClientAction::ViewPeople),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: ClientId, name: &str) -> Client {
        Client {
            id,
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            account_key: format!("key-{id}"),
        }
    }

    #[test]
    fn selection_wraps_around() {
        let mut state = ClientsState::new(vec![client(1, "Acme"), client(2, "Globex")], None);
        assert_eq!(state.selected_client_id(), Some(1));

        state.next();
        assert_eq!(state.selected_client_id(), Some(2));
        state.next();
        assert_eq!(state.selected_client_id(), Some(1));
        state.previous();
        assert_eq!(state.selected_client_id(), Some(2));
    }

    #[test]
    fn enter_views_people_of_selection() {
        let mut state = ClientsState::new(vec![client(1, "Acme"), client(2, "Globex")], None);
        handle_key(&mut state, KeyCode::Down);

        assert!(matches!(
            handle_key(&mut state, KeyCode::Enter),
            Some(ClientAction::ViewPeople(2))
        ));
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('p')),
            Some(ClientAction::AddPerson(Some(2)))
        ));
    }

    #[test]
    fn empty_listing_only_allows_new_client() {
        let mut state = ClientsState::new(Vec::new(), None);

        assert!(state.selected_client().is_none());
        assert!(handle_key(&mut state, KeyCode::Enter).is_none());
        assert!(handle_key(&mut state, KeyCode::Char('p')).is_none());
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('n')),
            Some(ClientAction::NewClient)
        ));
    }
}
