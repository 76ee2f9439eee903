//! Promo-code service for the Taallum e-learning marketplace: code
//! validation, redemption recording, an admin API and payment webhooks.

pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod promo;
pub mod util;
