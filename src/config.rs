//! Controller configuration
//!
//! Every setting can come from a flag or from the environment, so the same
//! binary works both from a shell and inside a Deployment manifest.

use std::time::Duration;

use clap::Args;

use crate::controller::BackoffConfig;
use crate::telemetry::LogFormat;
use crate::Error;

/// Watcher timeout (seconds) - must be less than the client read timeout
/// so the API server closes idle watches before the client gives up on them
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 25;

/// Largest accepted retry delay cap (one day)
pub const MAX_BACKOFF_SECS: u64 = 24 * 60 * 60;

/// Flags accepted by the `controller` subcommand
#[derive(Args, Debug, Clone)]
pub struct ControllerArgs {
    /// Only watch Appoperators in this namespace (all namespaces when unset)
    #[arg(long, env = "APP_OPERATOR_NAMESPACE")]
    pub namespace: Option<String>,

    /// Log output format
    #[arg(long, env = "APP_OPERATOR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Server-side apply the Appoperator CRD before starting the watch
    #[arg(long, env = "APP_OPERATOR_INSTALL_CRD")]
    pub install_crd: bool,

    /// Set a controller owner reference on created Deployments so they are
    /// garbage collected with their Appoperator
    #[arg(long, env = "APP_OPERATOR_OWNER_REFERENCES")]
    pub owner_references: bool,

    /// Delay before the first retry of a failed reconciliation (milliseconds)
    #[arg(long, env = "APP_OPERATOR_BACKOFF_INITIAL_MS", default_value_t = 500)]
    pub backoff_initial_ms: u64,

    /// Upper bound on the retry delay (seconds)
    #[arg(long, env = "APP_OPERATOR_BACKOFF_MAX_SECS", default_value_t = 300)]
    pub backoff_max_secs: u64,

    /// Server-side timeout for watch requests (seconds)
    #[arg(long, env = "APP_OPERATOR_WATCH_TIMEOUT_SECS", default_value_t = DEFAULT_WATCH_TIMEOUT_SECS)]
    pub watch_timeout_secs: u32,
}

impl Default for ControllerArgs {
    fn default() -> Self {
        Self {
            namespace: None,
            log_format: LogFormat::Text,
            install_crd: false,
            owner_references: false,
            backoff_initial_ms: 500,
            backoff_max_secs: 300,
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
        }
    }
}

/// Validated controller configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Namespace to watch, or None for the whole cluster
    pub namespace: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
    /// Install the CRD on startup
    pub install_crd: bool,
    /// Attach owner references to created Deployments
    pub owner_references: bool,
    /// Retry timing for failed reconciliations
    pub backoff: BackoffConfig,
    /// Server-side watch timeout in seconds
    pub watch_timeout_secs: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            log_format: LogFormat::Text,
            install_crd: false,
            owner_references: false,
            backoff: BackoffConfig::default(),
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
        }
    }
}

impl TryFrom<ControllerArgs> for ControllerConfig {
    type Error = Error;

    fn try_from(args: ControllerArgs) -> Result<Self, Self::Error> {
        if args.backoff_initial_ms == 0 {
            return Err(Error::config("backoff initial delay must be greater than zero"));
        }
        if args.backoff_max_secs > MAX_BACKOFF_SECS {
            return Err(Error::config(format!(
                "backoff max delay ({}s) exceeds {MAX_BACKOFF_SECS}s",
                args.backoff_max_secs
            )));
        }
        let backoff = BackoffConfig {
            initial_delay: Duration::from_millis(args.backoff_initial_ms),
            max_delay: Duration::from_secs(args.backoff_max_secs),
            ..Default::default()
        };
        if backoff.initial_delay > backoff.max_delay {
            return Err(Error::config(format!(
                "backoff initial delay ({}ms) exceeds max delay ({}s)",
                args.backoff_initial_ms, args.backoff_max_secs
            )));
        }
        if args.watch_timeout_secs == 0 {
            return Err(Error::config("watch timeout must be greater than zero"));
        }

        let namespace = args.namespace.filter(|ns| !ns.trim().is_empty());

        Ok(Self {
            namespace,
            log_format: args.log_format,
            install_crd: args.install_crd,
            owner_references: args.owner_references,
            backoff,
            watch_timeout_secs: args.watch_timeout_secs,
        })
    }
}
