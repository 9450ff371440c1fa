#![warn(clippy::all)]

#[macro_use]
extern crate strum;

use anyhow::Context as _;

pub mod abs_path;
pub mod console;
mod macros;
pub mod model;
pub mod service;
pub mod web;

pub use abs_path::AbsPathBuf;
pub use console::{Console, ConsoleConfig};

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;

static APP_DIR_NAME: &str = "pgrid";

/// Directory where pgrid keeps its local state such as the cookies file.
pub fn data_local_dir() -> Result<AbsPathBuf> {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .context("Could not find local data directory")?;
    Ok(AbsPathBuf::try_new(base)?.join(APP_DIR_NAME))
}
