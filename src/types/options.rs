//! Observer options and configuration
//!
//! This module contains the main configuration options for the SDK,
//! including a builder pattern for easy configuration.

use std::time::Duration;

// ============================================================================
// Observer Options
// ============================================================================

/// Default wait for in-flight event recording when a step finishes (5s)
pub const DEFAULT_EVENT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for session lookup on resume (10s)
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How a transfer to an agent that already owns a step in the same run is
/// represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevisitPolicy {
    /// Every completed transfer opens a new step (complete visibility)
    #[default]
    NewStepPerTransfer,
    /// A transfer back to a previously-seen agent re-opens that agent's step
    ReuseRevisitedStep,
}

/// Main options for the trace observer
#[derive(Debug, Clone)]
pub struct ObserverOptions {
    /// API key for the analytics backend
    pub api_key: Option<String>,
    /// Base URL override for the analytics backend
    pub base_url: Option<String>,
    /// How revisited agents map to steps
    pub revisit_policy: RevisitPolicy,
    /// How long a finishing step waits for in-flight event recording
    pub event_flush_timeout: Duration,
    /// Deadline for the backend lookup when resuming a session
    pub lookup_timeout: Duration,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            revisit_policy: RevisitPolicy::default(),
            event_flush_timeout: DEFAULT_EVENT_FLUSH_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl ObserverOptions {
    /// Create a new builder for `ObserverOptions`
    #[must_use]
    pub fn builder() -> ObserverOptionsBuilder {
        ObserverOptionsBuilder::default()
    }
}

// ============================================================================
// Builder for ObserverOptions
// ============================================================================

/// Builder for `ObserverOptions`
#[derive(Debug, Default)]
pub struct ObserverOptionsBuilder {
    options: ObserverOptions,
}

impl ObserverOptionsBuilder {
    /// Set the backend API key
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.options.api_key = Some(key.into());
        self
    }

    /// Set the backend base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = Some(url.into());
        self
    }

    /// Set the revisited-agent policy
    #[must_use]
    pub const fn revisit_policy(mut self, policy: RevisitPolicy) -> Self {
        self.options.revisit_policy = policy;
        self
    }

    /// Set the event flush timeout
    #[must_use]
    pub const fn event_flush_timeout(mut self, timeout: Duration) -> Self {
        self.options.event_flush_timeout = timeout;
        self
    }

    /// Set the session lookup timeout
    #[must_use]
    pub const fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.options.lookup_timeout = timeout;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ObserverOptions {
        self.options
    }
}
