use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("missing required parameters: {}", missing.join(", "))]
pub struct ConfigError {
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing kind, apiVersion, name or namespace")]
    MissingCommandField,
    #[error("failed to unmarshal xr: {0}")]
    MalformedYaml(String),
    #[error("failed to get XR: {0}")]
    Fetch(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("failed to build command for {name}: {source}")]
    Command { name: String, source: ParseError },
    #[error("{0}")]
    Client(#[from] CommandError),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("failed to unmarshal command result: {0}")]
    MalformedYaml(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("failed to run command: {command}: {message}")]
    Spawn { command: String, message: String },
    #[error("command failed: {command} ({status})\noutput: {output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FatalUiError {
    #[error("background task failed: {0}")]
    Task(String),
    #[error("event channel closed")]
    ChannelClosed,
    #[error("terminal event error: {0}")]
    Terminal(String),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{0} is not installed")]
    MissingDependency(&'static str),
    #[error("invalid k9s shortcut {0:?}")]
    InvalidShortcut(String),
    #[error("failed to get k9s plugin directory from k9s info")]
    PluginPathNotFound,
    #[error("plugin {0:?} already present")]
    AlreadyPresent(String),
    #[error("top-level document is not a mapping")]
    TopLevelNotMapping,
    #[error(".plugins exists but is not a mapping")]
    PluginsNotMapping,
    #[error("failed to encode plugin descriptor: {0}")]
    Encode(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PollError};
    use std::time::Duration;

    #[test]
    fn config_error_lists_every_missing_field() {
        let error = ConfigError {
            missing: vec!["name", "namespace"],
        };
        assert_eq!(
            error.to_string(),
            "missing required parameters: name, namespace"
        );
    }

    #[test]
    fn poll_timeout_reports_milliseconds() {
        let error = PollError::Timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "timed out after 1500ms");
    }
}
