//! REST/WebSocket front door for the calibration automation engine
//! (spec.md §6). Wires the otherwise-independent C1-C11 crates into one
//! `axum` application: [`state::AppState`] is built once at startup by
//! `main.rs` and cloned into every handler.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod routes;
pub mod state;
pub mod ws;
