pub mod action;
pub mod config;
pub mod discovery;
pub mod error;
pub mod io;
pub mod outcome;
pub mod package;
pub mod paths;
pub mod script;
pub mod transport;
pub mod xml;

pub use error::{Result, VroError};
