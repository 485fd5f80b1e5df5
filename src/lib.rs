//! VIN-driven spare part lookup for emex.ru.
//!
//! Decodes a VIN through a public registry service, then scrapes the
//! commerce site for listings and offers using ordered selector strategies.

pub mod api;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extraction;
pub mod models;
pub mod scrapers;
pub mod traits;
