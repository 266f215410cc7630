//! Connectivity-gated actions.
//!
//! [`ConnectivityGate::protected_action`] probes the network before running
//! an action. Offline, the action is skipped and the caller gets
//! [`Protected::Offline`]; depending on [`ProtectedOptions`] the user may be
//! prompted to retry or acknowledge. Online, the action runs and its error,
//! if any, is returned to the caller untouched.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connectivity::ConnectivityMonitor;

/// How a protected action behaves while offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedOptions {
    /// Shown to the user and used in logs.
    pub action_name: String,
    /// Whether to prompt the user when offline.
    pub show_alert: bool,
    /// Whether the prompt offers a retry.
    pub retry: bool,
}

impl ProtectedOptions {
    /// Alerting with retry enabled.
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            show_alert: true,
            retry: true,
        }
    }

    /// Skip the action silently when offline.
    pub fn silent(action_name: impl Into<String>) -> Self {
        Self::new(action_name).with_alert(false)
    }

    pub fn with_alert(mut self, show_alert: bool) -> Self {
        self.show_alert = show_alert;
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }
}

/// A choice offered by the offline prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertChoice {
    Cancel,
    Retry,
    Acknowledge,
}

/// The blocking prompt shown when a protected action finds no network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineAlert {
    pub title: String,
    pub message: String,
    pub choices: Vec<AlertChoice>,
}

impl OfflineAlert {
    pub fn for_action(options: &ProtectedOptions) -> Self {
        let choices = if options.retry {
            vec![AlertChoice::Cancel, AlertChoice::Retry]
        } else {
            vec![AlertChoice::Acknowledge]
        };
        Self {
            title: "No Internet Connection".to_string(),
            message: format!(
                "{} requires an internet connection. Please check your connection and try again.",
                options.action_name
            ),
            choices,
        }
    }

    pub fn offers_retry(&self) -> bool {
        self.choices.contains(&AlertChoice::Retry)
    }
}

/// Presents the offline prompt and waits for the user's choice.
#[async_trait]
pub trait AlertPresenter: Send + Sync {
    async fn present(&self, alert: &OfflineAlert) -> AlertChoice;
}

/// Outcome of a protected action that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protected<T> {
    /// The network was available and the action ran.
    Completed(T),
    /// The network was unavailable; the action did not run.
    Offline,
}

impl<T> Protected<T> {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// The action's value, if it ran.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Offline => None,
        }
    }
}

/// Runs actions only when the network is reachable.
#[derive(Clone)]
pub struct ConnectivityGate {
    monitor: ConnectivityMonitor,
    presenter: Option<Arc<dyn AlertPresenter>>,
}

impl ConnectivityGate {
    /// A gate that never prompts.
    pub fn new(monitor: ConnectivityMonitor) -> Self {
        Self {
            monitor,
            presenter: None,
        }
    }

    /// A gate that prompts through `presenter` when options ask for it.
    pub fn with_presenter(monitor: ConnectivityMonitor, presenter: Arc<dyn AlertPresenter>) -> Self {
        Self {
            monitor,
            presenter: Some(presenter),
        }
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Probe connectivity, then run `action` if online.
    ///
    /// Offline, `action` is not invoked and `Ok(Protected::Offline)` is
    /// returned. If the user picks Retry the whole check runs again with the
    /// same `options`, as many times as they keep choosing it. Errors from
    /// `action` are logged and returned.
    pub async fn protected_action<T, E, F, Fut>(
        &self,
        action: F,
        options: &ProtectedOptions,
    ) -> Result<Protected<T>, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        loop {
            if self.monitor.check_connectivity().await {
                return match action().await {
                    Ok(value) => Ok(Protected::Completed(value)),
                    Err(e) => {
                        tracing::error!(
                            action = %options.action_name,
                            error = %e,
                            "Protected action failed"
                        );
                        Err(e)
                    }
                };
            }

            tracing::info!(action = %options.action_name, "Skipping action while offline");

            if !options.show_alert {
                return Ok(Protected::Offline);
            }

            let Some(presenter) = &self.presenter else {
                tracing::debug!(
                    action = %options.action_name,
                    "No alert presenter installed"
                );
                return Ok(Protected::Offline);
            };

            let alert = OfflineAlert::for_action(options);
            match presenter.present(&alert).await {
                AlertChoice::Retry if alert.offers_retry() => {
                    tracing::debug!(action = %options.action_name, "Retrying protected action");
                }
                _ => return Ok(Protected::Offline),
            }
        }
    }
}

impl fmt::Debug for ConnectivityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityGate")
            .field("monitor", &self.monitor)
            .field("has_presenter", &self.presenter.is_some())
            .finish()
    }
}
