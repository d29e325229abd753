pub mod config;
pub mod error;
pub mod fs;
pub mod hooks;
pub mod index;
pub mod io;
pub mod mux;
pub mod paths;
pub mod process;
pub mod provision;
pub mod record;
pub mod remote;
pub mod scan;
pub mod session;
pub mod vcs;

pub use error::{Result, SwmError};
