//! Site deployer server library.
//!
//! Exports generated site sessions to a source-control host, provisions a
//! hosting project for them and triggers the first deployment, keeping an
//! ownership ledger of every session along the way.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
