//! Lead funnel — qualification wizard core.

pub mod abandonment;
pub mod cli;
pub mod config;
pub mod engagement;
pub mod error;
pub mod events;
pub mod funnel;
pub mod identity;
pub mod outbound;
pub mod store;
pub mod tiering;
