//! Shared helpers for filesystem staging and downloads.

pub mod fs;
pub mod http;
