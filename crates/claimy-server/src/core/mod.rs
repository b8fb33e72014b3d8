//! Core logic for the token service

mod issuance;

pub use issuance::{IssueError, TokenService};
