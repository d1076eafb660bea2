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
use crate::db::MembershipStore;
use crate::models::{Client, ClientId, Person};

// Represents the state of the people-of-one-client screen
pub struct PeopleState {
    client: Client,
    people: Vec<Person>,
    list_state: ListState,
    banner: Option<Banner>,
}

impl PeopleState {
    pub fn new(client: Client, people: Vec<Person>, banner: Option<Banner>) -> Self {
        let mut list_state = ListState::default();
        if !people.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            client,
            people,
            list_state,
            banner,
        }
    }

    pub fn next(&mut self) {
        if self.people.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.people.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.people.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.people.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn client_id(&self) -> ClientId {
        self.client.id
    }
}

pub enum PeopleAction {
    Back,
    NewPerson(ClientId),
}

/// Load the people screen for `client_id`; `None` when the client is gone
pub async fn load_people<S: MembershipStore>(
    store: &S,
    client_id: ClientId,
    banner: Option<Banner>,
) -> Result<Option<PeopleState>> {
    let Some(client) = store.get_client(client_id).await? else {
        return Ok(None);
    };
    let people = store.list_people_by_client(client_id).await?;

    Ok(Some(PeopleState::new(client, people, banner)))
}

pub fn render_people<B: Backend>(frame: &mut Frame<B>, state: &mut PeopleState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let items: Vec<ListItem> = state
        .people
        .iter()
        .map(|person| {
            ListItem::new(Spans::from(vec![
                Span::raw(&person.name),
                Span::styled(format!("  <{}>", person.email), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let title = if state.people.is_empty() {
        format!("People of {} (none yet)", state.client.name)
    } else {
        format!("People of {}", state.client.name)
    };

    let people_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(people_list, chunks[0], &mut state.list_state);

    frame.render_widget(status_paragraph(state.banner.as_ref()), chunks[1]);

    let buttons = Paragraph::new("<N> Add Person | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[2]);
}

pub fn handle_input(state: &mut PeopleState) -> Result<Option<PeopleAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(PeopleAction::Back)),
            KeyCode::Char('n') => return Ok(Some(PeopleAction::NewPerson(state.client_id()))),
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_db;

    #[tokio::test]
    async fn loads_client_and_people() {
        let db = memory_db().await;
        let id = db.insert_client("Acme", "a@x.com", "k").await.unwrap();
        db.insert_person("Bob", "b@x.com", id).await.unwrap();
        db.insert_person("Ann", "ann@x.com", id).await.unwrap();

        let mut state = load_people(&db, id, None).await.unwrap().unwrap();
        assert_eq!(state.client_id(), id);
        assert_eq!(state.people.len(), 2);
        assert_eq!(state.list_state.selected(), Some(0));

        state.previous();
        assert_eq!(state.list_state.selected(), Some(1));
        state.next();
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn missing_client_has_no_screen() {
        let db = memory_db().await;
        assert!(load_people(&db, 42, None).await.unwrap().is_none());
    }
}
