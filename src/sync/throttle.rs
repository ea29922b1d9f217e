use std::time::Duration;

/// Fixed pauses between provider requests. These are politeness delays, not
/// backoff: nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    /// Between consecutive pages of one listing.
    pub page: Duration,
    /// Between consecutive statistics chunks.
    pub batch: Duration,
    /// Between consecutive playlists of a sync pass.
    pub playlist: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            page: Duration::from_millis(100),
            batch: Duration::from_millis(100),
            playlist: Duration::from_secs(1),
        }
    }
}

impl Throttle {
    /// No delays at all (tests, local fakes).
    pub fn none() -> Self {
        Self {
            page: Duration::ZERO,
            batch: Duration::ZERO,
            playlist: Duration::ZERO,
        }
    }

    pub async fn after_page(&self) {
        pause(self.page).await;
    }

    pub async fn between_batches(&self) {
        pause(self.batch).await;
    }

    pub async fn between_playlists(&self) {
        pause(self.playlist).await;
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
