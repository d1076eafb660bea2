//! Error types for the membership core

use thiserror::Error;

/// Failures raised by the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Email address failed format validation, nothing was written
    #[error("Invalid email address")]
    InvalidEmail,

    /// No client row exists with the given id
    #[error("Unknown client: {0}")]
    UnknownClient(i64),

    /// Any other database failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures raised while producing an account key
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Account key is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// Machine-readable classification of a failed form submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidEmail,
    UnknownClient,
    KeyGeneration,
    Persistence,
}

/// Which form a failure came from; selects the persistence banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Client,
    Person,
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormKind::Client => write!(f, "client"),
            FormKind::Person => write!(f, "person"),
        }
    }
}

/// Failures surfaced by the form orchestrator
#[derive(Error, Debug)]
pub enum FormError {
    /// A required field was empty or missing
    #[error("Please fill in all the fields.")]
    Validation,

    #[error("Invalid email address.")]
    InvalidEmail,

    #[error("There was an error encrypting the account key. Please try again.")]
    KeyGeneration(#[source] KeyError),

    #[error("There was an error adding the {form}. Please try again later.")]
    Persistence {
        form: FormKind,
        #[source]
        source: StoreError,
    },
}

impl FormError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormError::Validation => ErrorKind::Validation,
            FormError::InvalidEmail => ErrorKind::InvalidEmail,
            FormError::KeyGeneration(_) => ErrorKind::KeyGeneration,
            FormError::Persistence { source: StoreError::UnknownClient(_), .. } => {
                ErrorKind::UnknownClient
            }
            FormError::Persistence { source: StoreError::InvalidEmail, .. } => {
                ErrorKind::InvalidEmail
            }
            FormError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Human-readable banner text for the operator
    pub fn message(&self) -> String {
        self.to_string()
    }
}
