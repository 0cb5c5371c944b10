use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{CommandError, ParseError};

const MOCK_XR: &str = include_str!("fixtures/xr.yaml");
const MOCK_RESOURCE: &str = include_str!("fixtures/resource.yaml");
const MOCK_DESCRIBE: &str = include_str!("fixtures/describe.txt");

/// Resolves the `<kind>.<qualifier>/<name>` target shared by get and describe.
///
/// An apiVersion carrying a `/` already names its group, so only the part
/// before the slash is used and `group` is ignored.
fn resource_target(
    kind: &str,
    group: &str,
    api_version: &str,
    name: &str,
    namespace: &str,
) -> Result<String, ParseError> {
    if kind.is_empty() || api_version.is_empty() || name.is_empty() || namespace.is_empty() {
        return Err(ParseError::MissingCommandField);
    }

    match api_version.split_once('/') {
        Some((qualifier, _)) => Ok(format!("{kind}.{qualifier}/{name}")),
        None => Ok(format!("{kind}.{api_version}.{group}/{name}")),
    }
}

pub fn build_get_command(
    kind: &str,
    group: &str,
    api_version: &str,
    name: &str,
    namespace: &str,
) -> Result<String, ParseError> {
    let target = resource_target(kind, group, api_version, name, namespace)?;
    Ok(format!("kubectl get {target} -n {namespace} -o yaml"))
}

pub fn build_describe_command(
    kind: &str,
    group: &str,
    api_version: &str,
    name: &str,
    namespace: &str,
) -> Result<String, ParseError> {
    let target = resource_target(kind, group, api_version, name, namespace)?;
    Ok(format!("kubectl describe {target} -n {namespace}"))
}

#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get_xr(&self, command: &str) -> Result<String, CommandError>;

    async fn get(&self, command: &str) -> Result<String, CommandError>;

    async fn run(&self, command: &str) -> Result<String, CommandError> {
        self.get(command).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KubectlClient;

impl KubectlClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceClient for KubectlClient {
    async fn get_xr(&self, command: &str) -> Result<String, CommandError> {
        run_command(command).await
    }

    async fn get(&self, command: &str) -> Result<String, CommandError> {
        run_command(command).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockClient;

impl MockClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceClient for MockClient {
    async fn get_xr(&self, _command: &str) -> Result<String, CommandError> {
        Ok(MOCK_XR.to_string())
    }

    async fn get(&self, command: &str) -> Result<String, CommandError> {
        if command.starts_with("kubectl describe ") {
            Ok(MOCK_DESCRIBE.to_string())
        } else {
            Ok(MOCK_RESOURCE.to_string())
        }
    }
}

async fn run_command(command: &str) -> Result<String, CommandError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(CommandError::Empty)?;
    debug!("running command={command}");

    let output = TokioCommand::new(program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| CommandError::Spawn {
            command: command.to_string(),
            message: error.to_string(),
        })?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = if stdout.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        format!("{}\n{}", stdout.trim(), stderr.trim())
    };

    Err(CommandError::Failed {
        command: command.to_string(),
        status: output.status.to_string(),
        output: combined,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        KubectlClient, MockClient, ResourceClient, build_describe_command, build_get_command,
    };
    use crate::error::{CommandError, ParseError};

    #[test]
    fn core_resource_without_group_keeps_trailing_dot() {
        let command = build_get_command("Secret", "", "v1", "example", "default").unwrap();
        assert_eq!(command, "kubectl get Secret.v1./example -n default -o yaml");
    }

    #[test]
    fn grouped_api_version_uses_group_part() {
        let command = build_get_command(
            "RoleAssignment",
            "",
            "applications.azuread.m.upbound.io/v1beta1",
            "example",
            "default",
        )
        .unwrap();
        assert_eq!(
            command,
            "kubectl get RoleAssignment.applications.azuread.m.upbound.io/example -n default -o yaml"
        );
    }

    #[test]
    fn explicit_group_is_appended_after_version() {
        let command = build_get_command(
            "roleassignments",
            "applications.azuread.m.upbound.io",
            "v1beta1",
            "example",
            "default",
        )
        .unwrap();
        assert_eq!(
            command,
            "kubectl get roleassignments.v1beta1.applications.azuread.m.upbound.io/example -n default -o yaml"
        );
    }

    #[test]
    fn missing_fields_are_construction_errors() {
        let cases = [
            ("", "v1", "example", "default"),
            ("Secret", "", "example", "default"),
            ("Secret", "v1", "", "default"),
            ("Secret", "v1", "example", ""),
        ];
        for (kind, api_version, name, namespace) in cases {
            assert_eq!(
                build_get_command(kind, "", api_version, name, namespace),
                Err(ParseError::MissingCommandField)
            );
            assert_eq!(
                build_describe_command(kind, "", api_version, name, namespace),
                Err(ParseError::MissingCommandField)
            );
        }
    }

    #[test]
    fn describe_uses_same_target_rules() {
        assert_eq!(
            build_describe_command(
                "Application",
                "",
                "applications.azuread.m.upbound.io/v1beta1",
                "example-app",
                "default"
            )
            .unwrap(),
            "kubectl describe Application.applications.azuread.m.upbound.io/example-app -n default"
        );
        assert_eq!(
            build_describe_command("Secret", "", "v1", "creds", "default").unwrap(),
            "kubectl describe Secret.v1./creds -n default"
        );
    }

    #[tokio::test]
    async fn mock_returns_describe_text_for_describe_commands() {
        let client = MockClient::new();
        let describe = client
            .run("kubectl describe Pod.v1./coredns -n kube-system")
            .await
            .unwrap();
        assert!(describe.starts_with("Name:"));

        let yaml = client
            .get("kubectl get Pod.v1./coredns -n kube-system -o yaml")
            .await
            .unwrap();
        assert!(yaml.starts_with("apiVersion: v1"));

        let xr = client.get_xr("anything").await.unwrap();
        assert!(xr.contains("resourceRefs:"));
    }

    #[tokio::test]
    async fn mock_get_of_resource_named_describe_returns_yaml() {
        let client = MockClient::new();
        let command = build_get_command("Secret", "", "v1", "describe-creds", "default").unwrap();
        let yaml = client.get(&command).await.unwrap();
        assert!(yaml.starts_with("apiVersion: v1"));
        assert!(!crate::xr::parse_conditions(&yaml).unwrap().is_empty());
    }

    #[tokio::test]
    async fn kubectl_client_rejects_empty_command() {
        let error = KubectlClient::new().get("   ").await.unwrap_err();
        assert_eq!(error, CommandError::Empty);
    }

    #[tokio::test]
    async fn kubectl_client_reports_spawn_failure() {
        let error = KubectlClient::new()
            .get("xrefs-definitely-not-a-binary get thing")
            .await
            .unwrap_err();
        assert!(matches!(error, CommandError::Spawn { .. }));
    }
}
