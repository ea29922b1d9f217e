//! Remote collection client for the YouTube Data API v3.

pub mod client;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
pub mod types;

pub use client::{YouTubeClient, STATS_BATCH_SIZE};
pub use transport::{HttpTransport, Transport};
pub use types::{PlaylistSummary, VideoRecord, VideoStatistics, VideoStub};
