pub mod boundary;
pub mod changelog;
pub mod config;
pub mod domain;
pub mod error;
pub mod formats;
pub mod git;
pub mod locator;
pub mod patcher;
pub mod planner;
pub mod resolver;
pub mod runner;
pub mod sequencer;
pub mod ui;

pub use error::{ReleaseError, Result};
