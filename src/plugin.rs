use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::error::InstallError;

pub const PLUGIN_KEY: &str = "xrefs";
const DESCRIPTION: &str = "Show XR resourceRefs";

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    pub short_cut: String,
    pub description: String,
    pub command: String,
    pub background: bool,
    pub scopes: Vec<String>,
    pub args: Vec<String>,
}

impl PluginEntry {
    pub fn new(short_cut: impl Into<String>, command: impl Into<String>) -> Self {
        let args = [
            ("--name", "$NAME"),
            ("--namespace", "$NAMESPACE"),
            ("--resourceGroup", "$RESOURCE_GROUP"),
            ("--resourceName", "$RESOURCE_NAME"),
            ("--resourceVersion", "$RESOURCE_VERSION"),
            ("--colComposition", "$COL_COMPOSITION"),
            ("--colCompositionRevision", "$COL_COMPOSITION_REVISION"),
        ]
        .into_iter()
        .flat_map(|(flag, variable)| [flag.to_string(), variable.to_string()])
        .collect();

        Self {
            short_cut: short_cut.into(),
            description: DESCRIPTION.to_string(),
            command: command.into(),
            background: false,
            scopes: vec!["all".to_string()],
            args,
        }
    }
}

pub async fn install(shortcut: &str) -> Result<PathBuf> {
    let shortcut =
        normalize_shortcut(shortcut).ok_or_else(|| InstallError::InvalidShortcut(shortcut.into()))?;
    let executable = std::env::current_exe().context("failed to get executable path")?;

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let k9s = find_on_path("k9s", &path_var).ok_or(InstallError::MissingDependency("k9s"))?;
    debug!("found k9s at {}", k9s.display());

    let output = TokioCommand::new(&k9s)
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("failed to run k9s info")?;
    if !output.status.success() {
        anyhow::bail!(
            "k9s info failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let info = String::from_utf8_lossy(&output.stdout);
    let descriptor = plugins_path_from_info(&info).ok_or(InstallError::PluginPathNotFound)?;

    let entry = PluginEntry::new(shortcut, executable.to_string_lossy());
    let backup = install_into(&descriptor, &entry, &std::env::temp_dir(), Local::now())?;
    if let Some(backup) = backup {
        println!("backed up old k9s plugins to {}", backup.display());
    }
    info!("installed plugin {PLUGIN_KEY} into {}", descriptor.display());
    Ok(descriptor)
}

pub fn install_into(
    path: &Path,
    entry: &PluginEntry,
    backup_dir: &Path,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("mkdir for {}", path.display()))?;
        }
        let document = append_plugin("", PLUGIN_KEY, entry)?;
        fs::write(path, document)
            .with_context(|| format!("write new plugins file {}", path.display()))?;
        return Ok(None);
    }

    let backup = backup_file(path, backup_dir, now)?;
    let existing =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let document = append_plugin(&existing, PLUGIN_KEY, entry)?;
    fs::write(path, document).with_context(|| format!("write {}", path.display()))?;
    Ok(Some(backup))
}

fn backup_file(path: &Path, backup_dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    let name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new("plugins.yaml"))
        .to_string_lossy();
    let target = backup_dir.join(format!("{name}.bak.{}", now.format("%Y%m%d_%H%M%S")));
    fs::copy(path, &target).with_context(|| {
        format!(
            "failed to backup {} to {}",
            path.display(),
            target.display()
        )
    })?;
    Ok(target)
}

/// Adds `plugins.<key>` to a descriptor document. Empty or unparsable input
/// starts from `plugins: {}`.
pub fn append_plugin(document: &str, key: &str, entry: &PluginEntry) -> Result<String, InstallError> {
    let parsed = if document.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str::<Value>(document).unwrap_or(Value::Null)
    };

    let mut top = match parsed {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        _ => return Err(InstallError::TopLevelNotMapping),
    };

    let plugins = top
        .entry(Value::String("plugins".to_string()))
        .or_insert(Value::Null);
    if plugins.is_null() {
        *plugins = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(plugins) = plugins else {
        return Err(InstallError::PluginsNotMapping);
    };

    let entry_key = Value::String(key.to_string());
    if plugins.contains_key(&entry_key) {
        return Err(InstallError::AlreadyPresent(key.to_string()));
    }
    plugins.insert(entry_key, serde_yaml::to_value(entry)?);

    Ok(serde_yaml::to_string(&Value::Mapping(top))?)
}

pub fn plugins_path_from_info(info: &str) -> Option<PathBuf> {
    info.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Plugins:"))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn find_on_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

pub fn normalize_shortcut(spec: &str) -> Option<String> {
    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut key: Option<String> = None;

    for token in spec
        .split(['-', '+'])
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
    {
        match token.as_str() {
            "ctrl" | "control" => ctrl = true,
            "alt" => alt = true,
            "shift" => shift = true,
            _ if key.is_some() => return None,
            _ if token.len() == 1 && token.chars().all(|c| c.is_ascii_alphanumeric()) => {
                key = Some(token.to_ascii_uppercase());
            }
            _ => return None,
        }
    }

    let key = key?;
    let mut parts = Vec::new();
    if ctrl {
        parts.push("Ctrl".to_string());
    }
    if alt {
        parts.push("Alt".to_string());
    }
    if shift {
        parts.push("Shift".to_string());
    }
    parts.push(key);
    Some(parts.join("-"))
}
