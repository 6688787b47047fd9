pub mod auth;
pub mod config;
pub mod constants;
pub mod container;
pub mod controller;
pub mod error;
pub mod logs;
pub mod recipe;
pub mod repo;
pub mod runner;
pub mod state;
pub mod timer;
pub mod worker;

pub use error::{HiveError, Result};
