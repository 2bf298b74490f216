pub mod application;
pub mod config;
pub mod customer;
pub mod error;
pub mod form;
pub mod io;
pub mod money;
pub mod opportunity;
pub mod paths;
pub mod state;
pub mod stats;
pub mod types;
pub mod user;
pub mod visit;
pub mod workflow;

pub use error::{CrmError, Result};
