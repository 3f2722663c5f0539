//! Fallback infrastructure - fetchers backed by a relational store

mod store_fetcher;

pub use store_fetcher::StoreFallbackFetcher;
