//! CrowdStrike Falcon Container Security registry API.

mod auth;
mod client;
mod model;

pub use auth::FalconCredentials;
pub use client::FalconClient;
