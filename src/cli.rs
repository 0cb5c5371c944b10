use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::refresh::{POLL_TIMEOUT, REFRESH_INTERVAL};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "xrefs",
    version,
    about = "Live Ready/Synced status of a Crossplane XR's resourceRefs, as a k9s plugin."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Name of the composite resource
    #[arg(long, env = "NAME", default_value = "")]
    pub name: String,

    /// Namespace of the composite resource
    #[arg(long, env = "NAMESPACE", default_value = "")]
    pub namespace: String,

    /// API group of the composite resource
    #[arg(
        long = "resourceGroup",
        alias = "resource-group",
        env = "RESOURCE_GROUP",
        default_value = ""
    )]
    pub resource_group: String,

    /// Kind of the composite resource
    #[arg(
        long = "resourceName",
        alias = "resource-name",
        env = "RESOURCE_NAME",
        default_value = ""
    )]
    pub resource_name: String,

    /// API version of the composite resource
    #[arg(
        long = "resourceVersion",
        alias = "resource-version",
        env = "RESOURCE_VERSION",
        default_value = ""
    )]
    pub resource_version: String,

    /// Composition column forwarded by k9s
    #[arg(
        long = "colComposition",
        alias = "col-composition",
        env = "COL_COMPOSITION",
        default_value = ""
    )]
    pub col_composition: String,

    /// Composition revision column forwarded by k9s
    #[arg(
        long = "colCompositionRevision",
        alias = "col-composition-revision",
        env = "COL_COMPOSITION_REVISION",
        default_value = ""
    )]
    pub col_composition_revision: String,

    /// Serve canned fixtures instead of calling kubectl
    #[arg(long)]
    pub mock: bool,

    /// Write debug logs to --debug-path
    #[arg(long)]
    pub debug: bool,

    /// Debug log file
    #[arg(long = "debug-path", alias = "debugPath", default_value = "/tmp/xrefs/debug.log")]
    pub debug_path: PathBuf,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = REFRESH_INTERVAL.as_millis() as u64)]
    pub refresh_ms: u64,

    /// Upper bound for every kubectl call in milliseconds
    #[arg(long, default_value_t = POLL_TIMEOUT.as_millis() as u64)]
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Register xrefs as a k9s plugin
    Install {
        /// k9s shortcut bound to the plugin
        #[arg(long, default_value = "Shift-G")]
        shortcut: String,
    },
}
