mod client;
mod person;

pub use client::Client;
pub use person::Person;

pub type ClientId = i64;
pub type PersonId = i64;
