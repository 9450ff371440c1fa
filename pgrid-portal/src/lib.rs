#![warn(clippy::all)]

#[macro_use]
extern crate strum;

mod actor;
mod auth;
pub mod config;
pub mod error;
mod fetch;
mod image;
mod judge;
pub mod schema;
#[cfg(test)]
mod testing;

use pgrid_util::{abs_path, console, model, service};

use crate::console::Console;

pub use actor::PortalActor;
pub use config::{JudgeConfig, SessionConfig};
pub use error::{portal_error, PortalError};
pub use schema::SchemaKind;

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;
