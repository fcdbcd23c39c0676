// Library root
// -----------
// This crate exposes the library surface behind the `mstodo` binary.
//
// Module responsibilities:
// - `config`: client identity, endpoints and per-user file locations.
// - `error`: typed failures of the API, sign in and the token store.
// - `token_store`, `cache`, `identity`: persisting and using credentials
//   against the Microsoft identity platform.
// - `flow`: the two-step device sign in, parked on disk between runs.
// - `session`: one run's view of the credentials, saved when it ends.
// - `api`: authenticated JSON calls against the API base.
// - `models`, `todo`: To Do lists and tasks on top of `api`.
// - `dates`, `views`: due-date handling and read-only task views.
// - `cli`, `commands`, `ui`: the command line surface, its command bodies
//   and what they print.
pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod flow;
pub mod identity;
pub mod models;
pub mod session;
pub mod todo;
pub mod token_store;
pub mod ui;
pub mod views;

#[cfg(test)]
mod testing;
