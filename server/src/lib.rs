//! Inkpot Server
//!
//! Self-hosted blog platform backend: accounts, posts, categories, comments
//! and like/dislike reactions behind a REST JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod permissions;
