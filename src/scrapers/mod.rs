//! Site-specific scraper implementations

pub mod emex;

pub use emex::EmexScraper;
