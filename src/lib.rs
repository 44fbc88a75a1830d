pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod supervisor;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{RunMode, Settings};

pub use core::{cache::FeedCache, engine::FeedEngine, pipeline::ScrapePipeline};
pub use server::{create_router, router_factory, serve_bare, AppState};
pub use supervisor::{Arbiter, ArbiterReport};
pub use utils::error::{Result, ScrapeError};
