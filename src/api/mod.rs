//! Client API descriptor: which actions and methods exist, how to call
//! them, and where to poll.

mod builder;
mod cache;
mod document;

pub use builder::{ApiDescriptorBuilder, ApiFormat, ApiRequest};
pub use cache::{ApiCache, ApiCacheKey};
pub use document::{ActionSummary, PollingProvider, RemotingApi};
