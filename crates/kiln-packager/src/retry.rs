//! Bounded polling of the packager while an artifact is being built

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{Method, PackagerBackend};
use crate::error::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// 403 while the bundle is missing from the bucket, 504 while the packager builds it
pub const DEFAULT_BUILDING_STATUSES: [u16; 2] = [403, 504];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total requests, the first one included
    pub max_attempts: u32,
    pub delay: Duration,
    /// Statuses meaning "not ready yet"; anything else that fails is final
    pub building_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            building_statuses: DEFAULT_BUILDING_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn is_building(&self, status: u16) -> bool {
        self.building_statuses.contains(&status)
    }

    /// Requests `url` until it succeeds, fails for good, or attempts run out.
    pub async fn request<T, B>(&self, backend: &B, method: Method, url: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        B: PackagerBackend + ?Sized,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            debug!(attempt, ?method, url, "calling packager");
            let response = backend.request(method, url).await?;

            if response.is_success() {
                return response.json(url);
            }

            let message = response.error_message();
            if !self.is_building(response.status) {
                return Err(FetchError::Hard {
                    status: response.status,
                    message,
                });
            }

            last_error = message;
            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(FetchError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}
