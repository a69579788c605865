//! Direct messaging between two users of an institution
//!
//! Conversations are unique per unordered pair of participants; messages move
//! through one-way delivered/read/edited/deleted transitions.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
