use std::error::Error;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod model;
pub mod sync;

/// Flattens an error and its source chain into one line for logging.
/// Callers only ever see the generic response body; the detail stays
/// server-side.
pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
