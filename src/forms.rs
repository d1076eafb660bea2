//! Form orchestration for the add-client and add-person flows.
//!
//! Each submission is validated, written through the injected store, and
//! answered with a [`FormOutcome`] that also carries a fresh client listing
//! for the screen that is redrawn afterwards.

use tracing::{info, warn};

use crate::db::MembershipStore;
use crate::error::{ErrorKind, FormError, FormKind};
use crate::keys::KeyGenerator;
use crate::models::{Client, ClientId, PersonId};
use crate::validate::{is_email, sanitize_email, sanitize_text_field};

/// Raw field values of the add-client form
#[derive(Debug, Clone, Default)]
pub struct ClientSubmission {
    pub name: String,
    pub email: String,
}

/// Raw field values of the add-person form; `client_id` is the dropdown
/// selection, `None` when nothing was picked
#[derive(Debug, Clone, Default)]
pub struct PersonSubmission {
    pub client_id: Option<ClientId>,
    pub name: String,
    pub email: String,
}

/// What a successful submission created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    Client(ClientId),
    Person(PersonId),
}

#[derive(Debug)]
pub struct FormOutcome {
    pub result: Result<Created, FormError>,
    /// Client listing read after the write attempt
    pub clients: Vec<Client>,
}

impl FormOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(FormError::kind)
    }

    /// Banner text for the operator
    pub fn message(&self) -> String {
        match &self.result {
            Ok(Created::Client(_)) => "Client added successfully!".to_string(),
            Ok(Created::Person(_)) => "Person added successfully!".to_string(),
            Err(e) => e.message(),
        }
    }
}

pub struct FormHandler<S> {
    store: S,
    keys: KeyGenerator,
}

impl<S: MembershipStore> FormHandler<S> {
    pub fn new(store: S, keys: KeyGenerator) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn add_client(&self, submission: &ClientSubmission) -> FormOutcome {
        let result = self.submit_client(submission).await;
        self.finish(FormKind::Client, result).await
    }

    pub async fn add_person(&self, submission: &PersonSubmission) -> FormOutcome {
        let result = self.submit_person(submission).await;
        self.finish(FormKind::Person, result).await
    }

    async fn submit_client(&self, submission: &ClientSubmission) -> Result<Created, FormError> {
        let name = sanitize_text_field(&submission.name);
        if name.is_empty() || submission.email.trim().is_empty() {
            return Err(FormError::Validation);
        }

        let email = sanitize_email(&submission.email);
        if !is_email(&email) {
            return Err(FormError::InvalidEmail);
        }

        let account_key = self
            .keys
            .encrypt_account_key()
            .map_err(FormError::KeyGeneration)?;

        let id = self
            .store
            .insert_client(&name, &email, &account_key)
            .await
            .map_err(|source| FormError::Persistence {
                form: FormKind::Client,
                source,
            })?;

        Ok(Created::Client(id))
    }

    async fn submit_person(&self, submission: &PersonSubmission) -> Result<Created, FormError> {
        let name = sanitize_text_field(&submission.name);
        let client_id = match submission.client_id {
            Some(id) if id != 0 => id,
            _ => return Err(FormError::Validation),
        };
        if name.is_empty() || submission.email.trim().is_empty() {
            return Err(FormError::Validation);
        }

        let email = sanitize_email(&submission.email);
        if !is_email(&email) {
            return Err(FormError::InvalidEmail);
        }

        let id = self
            .store
            .insert_person(&name, &email, client_id)
            .await
            .map_err(|source| FormError::Persistence {
                form: FormKind::Person,
                source,
            })?;

        Ok(Created::Person(id))
    }

    async fn finish(&self, form: FormKind, result: Result<Created, FormError>) -> FormOutcome {
        match &result {
            Ok(created) => info!(?created, "{} form accepted", form),
            Err(e) => warn!(kind = ?e.kind(), "{} form rejected: {}", form, e),
        }

        let clients = match self.store.list_clients().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!("Could not refresh client listing: {}", e);
                Vec::new()
            }
        };

        FormOutcome { result, clients }
    }
}
