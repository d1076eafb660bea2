mod config;
mod db;
mod error;
mod forms;
mod keys;
mod models;
mod render;
mod ui;
mod validate;

use std::fs::File;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};
use tracing::info;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::db::{Database, MembershipStore};
use crate::forms::{ClientSubmission, FormHandler, FormOutcome, PersonSubmission};
use crate::keys::{Aes256CbcCipher, KeyGenerator};
use crate::models::ClientId;
use crate::ui::{
    Banner,
    clients::{ClientsState, ClientAction, render_clients, handle_input as handle_clients_input},
    client_wizard::{ClientWizardState, ClientWizardAction, render_client_wizard, handle_input as handle_client_wizard_input},
    people::{PeopleState, PeopleAction, render_people, handle_input as handle_people_input, load_people},
    person_wizard::{PersonWizardState, PersonWizardAction, render_person_wizard, handle_input as handle_person_wizard_input},
};

/// Log file used while the terminal UI owns the screen
const TUI_LOG_FILE: &str = "membership_manager.log";

#[derive(Parser)]
#[command(name = "membership_manager", version, about = "Register clients, their account keys, and the people under them")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal interface (default)
    Tui,
    /// Create the clients and people tables if they are missing
    InitDb,
    /// Register a client and issue its account key
    AddClient {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Print the result banner and client table as HTML
        #[arg(long)]
        html: bool,
    },
    /// Register a person under an existing client
    AddPerson {
        #[arg(long)]
        client_id: ClientId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Print the result banner and client dropdown as HTML
        #[arg(long)]
        html: bool,
    },
    /// List all clients
    Clients {
        #[arg(long)]
        json: bool,
    },
    /// List the people of one client
    People {
        client_id: ClientId,
        #[arg(long)]
        json: bool,
    },
    /// Look a client up by account key
    FindClient { account_key: String },
    /// Decrypt an account key back to the seed it was generated from
    RevealKey { account_key: String },
    /// Print an HTML fragment for embedding in an admin page
    Render {
        #[arg(value_enum)]
        view: View,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    ClientsTable,
    ClientOptions,
}

// Represents the current screen in the app
enum AppScreen {
    Clients,
    ClientWizard,
    People(ClientId),
    PersonWizard,
}

// Main application state
struct AppState {
    handler: FormHandler<Database>,
    screen: AppScreen,
    clients_state: Option<ClientsState>,
    client_wizard_state: Option<ClientWizardState>,
    people_state: Option<PeopleState>,
    person_wizard_state: Option<PersonWizardState>,
}

impl AppState {
    fn new(handler: FormHandler<Database>) -> Self {
        Self {
            handler,
            screen: AppScreen::Clients,
            clients_state: None,
            client_wizard_state: None,
            people_state: None,
            person_wizard_state: None,
        }
    }
}

fn init_tracing(interactive: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if interactive {
        // Anything written to the terminal would tear the alternate screen
        let file = File::create(TUI_LOG_FILE)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);
    init_tracing(matches!(command, Command::Tui))?;

    // Load configuration
    let config = config::init()?;
    info!(
        "Starting membership_manager v{} (account keys: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.account_key_scheme
    );

    // Initialize database connection
    let db = db::init(&config).await?;
    let keys = KeyGenerator::new(config.account_key_scheme, config.secret());
    let handler = FormHandler::new(db, keys);

    match command {
        Command::Tui => {
            run_tui(handler).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::InitDb => {
            handler.store().initialize_schema().await?;
            println!("Membership tables ready");
            Ok(ExitCode::SUCCESS)
        }
        Command::AddClient { name, email, html } => {
            let outcome = handler.add_client(&ClientSubmission { name, email }).await;
            if html {
                println!("{}", render::notice(&outcome));
                println!("{}", render::clients_table(&outcome.clients));
            }
            report(&outcome)
        }
        Command::AddPerson { client_id, name, email, html } => {
            let submission = PersonSubmission {
                client_id: Some(client_id),
                name,
                email,
            };
            let outcome = handler.add_person(&submission).await;
            if html {
                println!("{}", render::notice(&outcome));
                println!("{}", render::client_options(&outcome.clients));
            }
            report(&outcome)
        }
        Command::Clients { json } => {
            let clients = handler.store().list_clients().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clients)?);
            } else if clients.is_empty() {
                println!("No clients found.");
            } else {
                for client in clients {
                    println!("{}\t{}\t{}\t{}", client.id, client.name, client.email, client.account_key);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::People { client_id, json } => {
            let people = handler.store().list_people_by_client(client_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&people)?);
            } else {
                for person in people {
                    println!("{}\t{}\t{}", person.id, person.name, person.email);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::FindClient { account_key } => {
            match handler.store().find_client_by_account_key(&account_key).await? {
                Some(client) => println!("{}\t{}\t{}", client.id, client.name, client.email),
                None => {
                    eprintln!("No client has that account key");
                    return Ok(ExitCode::FAILURE);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::RevealKey { account_key } => {
            let cipher = Aes256CbcCipher::new(&config.secret());
            let seed = keys::reveal_seed(&cipher, config.account_key_scheme, &account_key)?;
            println!("{}", seed);
            Ok(ExitCode::SUCCESS)
        }
        Command::Render { view } => {
            let clients = handler.store().list_clients().await?;
            let html = match view {
                View::ClientsTable => render::clients_table(&clients),
                View::ClientOptions => render::client_options(&clients),
            };
            println!("{}", html);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print a form outcome; failures map to a non-zero exit status
fn report(outcome: &FormOutcome) -> Result<ExitCode> {
    if let Some(kind) = outcome.error_kind() {
        eprintln!("{}", outcome.message());
        eprintln!("error kind: {}", serde_json::to_string(&kind)?);
        return Ok(ExitCode::FAILURE);
    }

    if let Ok(created) = &outcome.result {
        println!("{} ({:?})", outcome.message(), created);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_tui(handler: FormHandler<Database>) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(handler);

    let result = match load_clients_screen(&mut app_state, None).await {
        Ok(()) => run_app(&mut terminal, &mut app_state).await,
        Err(e) => Err(e),
    };

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| {
            match app_state.screen {
                AppScreen::Clients => {
                    if let Some(state) = &mut app_state.clients_state {
                        render_clients(f, state);
                    }
                }
                AppScreen::ClientWizard => {
                    if let Some(state) = &mut app_state.client_wizard_state {
                        render_client_wizard(f, state);
                    }
                }
                AppScreen::People(_) => {
                    if let Some(state) = &mut app_state.people_state {
                        render_people(f, state);
                    }
                }
                AppScreen::PersonWizard => {
                    if let Some(state) = &mut app_state.person_wizard_state {
                        render_person_wizard(f, state);
                    }
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await?,
            AppScreen::People(_) => handle_people_screen(app_state).await?,
            AppScreen::PersonWizard => handle_person_wizard_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_clients_screen(app_state: &mut AppState, banner: Option<Banner>) -> Result<()> {
    let clients = app_state.handler.store().list_clients().await?;

    app_state.clients_state = Some(ClientsState::new(clients, banner));
    app_state.screen = AppScreen::Clients;

    Ok(())
}

async fn load_people_screen(
    app_state: &mut AppState,
    client_id: ClientId,
    banner: Option<Banner>,
) -> Result<()> {
    match load_people(app_state.handler.store(), client_id, banner).await? {
        Some(state) => {
            app_state.people_state = Some(state);
            app_state.screen = AppScreen::People(client_id);
        }
        None => load_clients_screen(app_state, None).await?,
    }

    Ok(())
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.clients_state {
        match handle_clients_input(state)? {
            Some(ClientAction::Quit) => {
                return Ok(true);
            }
            Some(ClientAction::NewClient) => {
                app_state.client_wizard_state = Some(ClientWizardState::new());
                app_state.screen = AppScreen::ClientWizard;
            }
            Some(ClientAction::AddPerson(preselect)) => {
                let clients = state.clients().to_vec();
                app_state.person_wizard_state = Some(PersonWizardState::new(clients, preselect, None));
                app_state.screen = AppScreen::PersonWizard;
            }
            Some(ClientAction::ViewPeople(client_id)) => {
                load_people_screen(app_state, client_id, None).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.client_wizard_state {
        match handle_client_wizard_input(state)? {
            Some(ClientWizardAction::Cancel) => {
                load_clients_screen(app_state, None).await?;
            }
            Some(ClientWizardAction::Submit(submission)) => {
                let outcome = app_state.handler.add_client(&submission).await;
                let banner = Banner::from_outcome(&outcome);

                if outcome.is_success() {
                    // The outcome already carries the refreshed listing
                    app_state.clients_state = Some(ClientsState::new(outcome.clients, Some(banner)));
                    app_state.screen = AppScreen::Clients;
                } else {
                    state.banner = Some(banner);
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_people_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.people_state {
        match handle_people_input(state)? {
            Some(PeopleAction::Back) => {
                load_clients_screen(app_state, None).await?;
            }
            Some(PeopleAction::NewPerson(client_id)) => {
                let clients = app_state.handler.store().list_clients().await?;
                app_state.person_wizard_state =
                    Some(PersonWizardState::new(clients, Some(client_id), Some(client_id)));
                app_state.screen = AppScreen::PersonWizard;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_person_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.person_wizard_state {
        match handle_person_wizard_input(state)? {
            Some(PersonWizardAction::Cancel) => match state.return_to() {
                Some(client_id) => load_people_screen(app_state, client_id, None).await?,
                None => load_clients_screen(app_state, None).await?,
            },
            Some(PersonWizardAction::Submit(submission)) => {
                let outcome = app_state.handler.add_person(&submission).await;
                let banner = Banner::from_outcome(&outcome);

                if !outcome.is_success() {
                    state.banner = Some(banner);
                    state.refresh_clients(outcome.clients);
                } else {
                    match state.return_to() {
                        Some(client_id) => {
                            load_people_screen(app_state, client_id, Some(banner)).await?
                        }
                        None => {
                            app_state.clients_state =
                                Some(ClientsState::new(outcome.clients, Some(banner)));
                            app_state.screen = AppScreen::Clients;
                        }
                    }
                }
            }
            None => {}
        }
    }

    Ok(false)
}
