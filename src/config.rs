use std::time::Duration;

use crate::cli::CliArgs;
use crate::error::{ConfigError, ParseError};
use crate::k8s::build_get_command;
use crate::refresh::{MIN_POLL_TIMEOUT, MIN_REFRESH_INTERVAL};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct XrTarget {
    pub name: String,
    pub namespace: String,
    pub group: String,
    pub kind: String,
    pub version: String,
}

impl XrTarget {
    pub fn get_command(&self) -> Result<String, ParseError> {
        build_get_command(
            &self.kind,
            &self.group,
            &self.version,
            &self.name,
            &self.namespace,
        )
    }

    pub fn label(&self) -> String {
        format!(
            "{}.{}.{}/{} -n {}",
            self.kind, self.version, self.group, self.name, self.namespace
        )
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub target: XrTarget,
    pub composition: String,
    pub composition_revision: String,
    pub refresh_interval: Duration,
    pub poll_timeout: Duration,
    pub mock: bool,
}

impl DashboardConfig {
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            target: XrTarget {
                name: args.name.trim().to_string(),
                namespace: args.namespace.trim().to_string(),
                group: args.resource_group.trim().to_string(),
                kind: args.resource_name.trim().to_string(),
                version: args.resource_version.trim().to_string(),
            },
            composition: args.col_composition.trim().to_string(),
            composition_revision: args.col_composition_revision.trim().to_string(),
            refresh_interval: Duration::from_millis(args.refresh_ms).max(MIN_REFRESH_INTERVAL),
            poll_timeout: Duration::from_millis(args.poll_timeout_ms).max(MIN_POLL_TIMEOUT),
            mock: args.mock,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("name", &self.target.name),
            ("namespace", &self.target.namespace),
            ("resourceName", &self.target.kind),
            ("resourceVersion", &self.target.version),
        ];
        let missing = required
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { missing })
        }
    }

    pub fn header_label(&self) -> String {
        let mut label = self.target.label();
        for column in [&self.composition, &self.composition_revision] {
            if !column.is_empty() {
                label.push_str(" | ");
                label.push_str(column);
            }
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardConfig, XrTarget};
    use crate::cli::CliArgs;
    use clap::Parser;
    use std::time::Duration;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec![
            "xrefs",
            "--name",
            " example ",
            "--namespace",
            "default",
            "--resourceGroup",
            "example.org",
            "--resourceName",
            "xauths",
            "--resourceVersion",
            "v1alpha1",
        ];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn builds_trimmed_target_and_label() {
        let config = DashboardConfig::from_args(&args(&[
            "--colComposition",
            "auth",
            "--colCompositionRevision",
            "auth-7f9c2",
        ]));
        assert_eq!(config.target.name, "example");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.header_label(),
            "xauths.v1alpha1.example.org/example -n default | auth | auth-7f9c2"
        );
        assert_eq!(
            config.target.get_command().unwrap(),
            "kubectl get xauths.v1alpha1.example.org/example -n default -o yaml"
        );
    }

    #[test]
    fn missing_identity_is_reported_together() {
        let config = DashboardConfig {
            target: XrTarget {
                group: "example.org".to_string(),
                version: "v1".to_string(),
                ..XrTarget::default()
            },
            composition: String::new(),
            composition_revision: String::new(),
            refresh_interval: Duration::from_secs(7),
            poll_timeout: Duration::from_secs(10),
            mock: false,
        };
        let error = config.validate().unwrap_err();
        assert_eq!(error.missing, vec!["name", "namespace", "resourceName"]);
    }

    #[test]
    fn intervals_are_clamped() {
        let config = DashboardConfig::from_args(&args(&[
            "--refresh-ms",
            "10",
            "--poll-timeout-ms",
            "1",
        ]));
        assert_eq!(config.refresh_interval, Duration::from_millis(500));
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
    }
}
