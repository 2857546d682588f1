pub mod archive;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod membership;
pub mod output;
pub mod rate_limit;
pub mod resolver;
pub mod workspace;
