//! Friend-link reciprocity checker.
//!
//! For every site in a list, find the page where it keeps its friend links and
//! check that it links back to us under the expected title.

pub mod checker;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http_client;
pub mod parser;
pub mod report;
pub mod verify;

pub use checker::{Checker, Outcome, SiteReport};
pub use config::{CheckerConfig, SiteEntry, load_sites};
pub use error::{Error, Result};
