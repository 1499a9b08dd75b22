//! Device storage operations exposed as JSON.
//!
//! A [`Storage`] holds one mounted backend (flash or SD card, see
//! [`config::Medium`]) and offers file reads and writes, directory listings
//! and the nested directory document produced by [`Storage::list_dir_json`].

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{FsError, Result};
pub use storage::Storage;
