//! Query cache for the lending API.
//!
//! Queries are keyed by endpoint name and argument. Concurrent identical
//! queries share one request, fulfilled results are served from cache, and a
//! mutation that invalidates a tag refetches every query providing it while
//! the previous data stays visible.

pub mod client;
pub mod key;
pub mod snapshot;
pub mod store;
pub mod subscription;
pub mod tags;

pub use client::QueryClient;
pub use key::QueryKey;
pub use snapshot::{QuerySnapshot, QueryState, QueryStatus};
pub use store::{CacheStore, IssueMode};
pub use subscription::Subscription;
pub use tags::TagIndex;
