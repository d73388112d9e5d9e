//! HTTP surface: page handlers and the form models they accept.

pub mod handlers;
pub mod models;
