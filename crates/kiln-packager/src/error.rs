//! Error types for dependency resolution and fetching

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// A range could not be turned into an absolute version
    #[error("could not resolve {name}@{range}: {message}")]
    Resolution {
        name: String,
        range: String,
        message: String,
    },

    /// The backend answered with a failure that is not worth retrying
    #[error("{message}")]
    Hard { status: u16, message: String },

    /// The artifact was still building after every attempt
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// What callers of [`PackagerClient::fetch`](crate::PackagerClient::fetch) see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not fetch dependencies, please try again in a couple seconds: {0}")]
pub struct FetchFailure(#[from] pub FetchError);

impl FetchFailure {
    pub fn inner(&self) -> &FetchError {
        &self.0
    }
}
