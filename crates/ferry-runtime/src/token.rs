//! Bearer token lifecycle for one run.

use crate::error::ProviderError;
use crate::provider::IdentityProvider;
use ferry_core::BearerToken;
use std::time::{Duration, Instant};

/// Current instant on the tokio clock, so paused-time tests see the same
/// time as `tokio::time::sleep`.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Owns the run's bearer token and replaces it once it gets too old.
///
/// The session is threaded through the driver loop; nothing else holds the
/// token.
#[derive(Debug)]
pub struct TokenSession {
    token: BearerToken,
    threshold: Duration,
    refreshes: usize,
}

impl TokenSession {
    /// Acquire the first token.
    pub async fn start<P>(provider: &P, threshold: Duration) -> Result<Self, ProviderError>
    where
        P: IdentityProvider + ?Sized,
    {
        let token = provider.acquire_token().await?;
        tracing::debug!(realm = provider.realm(), "Acquired provider token");
        Ok(Self {
            token,
            threshold,
            refreshes: 0,
        })
    }

    /// True once the token is older than the refresh threshold.
    pub fn is_expiring(&self, now: Instant) -> bool {
        self.token.is_expiring(now, self.threshold)
    }

    /// The token to use for the next call, re-acquired first if it is expiring.
    pub async fn current<P>(&mut self, provider: &P) -> Result<&BearerToken, ProviderError>
    where
        P: IdentityProvider + ?Sized,
    {
        if self.is_expiring(now()) {
            self.token = provider.acquire_token().await?;
            self.refreshes += 1;
            tracing::info!(refreshes = self.refreshes, "Refreshed provider token");
        }
        Ok(&self.token)
    }

    /// How many times the token was re-acquired after the first one.
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}
