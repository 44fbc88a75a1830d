pub mod cache;
pub mod engine;
pub mod extract;
pub mod pipeline;
pub mod probe;
pub mod rss;

pub use crate::domain::model::{FeedItem, FeedRequest, RawItem, SelectorSet};
pub use crate::domain::ports::{FeedPipeline, PageRenderer};
pub use crate::utils::error::Result;
