//! Application services: job search over the response cache and admin
//! caller verification.

pub mod auth;
pub mod error;
pub mod provider;
pub mod search;
