//! HTTP access to the admin backend

mod client;

pub use client::{AdminClient, ApiError};
