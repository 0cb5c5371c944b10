use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{FatalUiError, PollError};
use crate::event::{AppEvent, spawn_worker};
use crate::k8s::{ResourceClient, build_get_command};
use crate::model::{ConditionList, ResourceReference};
use crate::xr::parse_conditions;

/// Last known conditions per resource name.
///
/// Values are swapped in whole behind an `Arc`, so a reader always gets a
/// complete snapshot and the write lock is only held for the pointer swap.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    inner: Arc<RwLock<HashMap<String, Arc<ConditionList>>>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Arc<ConditionList> {
        self.inner.read().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: impl Into<String>, conditions: ConditionList) {
        let snapshot = Arc::new(conditions);
        self.inner.write().insert(name.into(), snapshot);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

pub async fn poll(
    client: &dyn ResourceClient,
    reference: &ResourceReference,
    namespace: &str,
) -> Result<ConditionList, PollError> {
    let command = build_get_command(
        &reference.kind,
        "",
        &reference.api_version,
        &reference.name,
        namespace,
    )
    .map_err(|source| PollError::Command {
        name: reference.name.clone(),
        source,
    })?;

    let output = client.get(&command).await?;
    parse_conditions(&output)
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct FanOutSummary {
    pub polled: usize,
    pub failed: usize,
}

pub async fn poll_all(
    client: Arc<dyn ResourceClient>,
    store: &StatusStore,
    refs: &[ResourceReference],
    namespace: &str,
    poll_timeout: Duration,
) -> Result<FanOutSummary, FatalUiError> {
    let mut tasks = JoinSet::new();
    for reference in refs.iter().cloned() {
        let client = Arc::clone(&client);
        let store = store.clone();
        let namespace = namespace.to_string();
        tasks.spawn(async move {
            let result = match timeout(poll_timeout, poll(client.as_ref(), &reference, &namespace))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(PollError::Timeout(poll_timeout)),
            };
            match result {
                Ok(conditions) => {
                    if conditions.is_empty() {
                        debug!("{reference} reports no conditions");
                    }
                    store.set(reference.name.clone(), conditions);
                    true
                }
                Err(error) => {
                    warn!("status poll failed for {reference}: {error}");
                    false
                }
            }
        });
    }

    let mut summary = FanOutSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let ok = joined.map_err(|error| FatalUiError::Task(error.to_string()))?;
        summary.polled += 1;
        if !ok {
            summary.failed += 1;
        }
    }

    debug!(
        "status fan-out finished polled={} failed={} stored={}",
        summary.polled,
        summary.failed,
        store.len()
    );
    Ok(summary)
}

pub fn spawn_fan_out(
    client: Arc<dyn ResourceClient>,
    store: StatusStore,
    cycle: u64,
    namespace: String,
    refs: Vec<ResourceReference>,
    poll_timeout: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    spawn_worker(tx, async move {
        match poll_all(client, &store, &refs, &namespace, poll_timeout).await {
            Ok(summary) => AppEvent::StatusLoaded {
                cycle,
                namespace,
                refs,
                failed: summary.failed,
            },
            Err(error) => AppEvent::Fatal(error),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{StatusStore, poll, poll_all, spawn_fan_out};
    use crate::error::{CommandError, PollError};
    use crate::event::AppEvent;
    use crate::k8s::{MockClient, ResourceClient};
    use crate::model::{Condition, ConditionList, ResourceReference};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn reference(api_version: &str, kind: &str, name: &str) -> ResourceReference {
        ResourceReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    fn ready(status: &str) -> ConditionList {
        ConditionList(vec![Condition {
            condition_type: "Ready".to_string(),
            status: status.to_string(),
            reason: "Test".to_string(),
        }])
    }

    #[derive(Default)]
    struct ScriptedClient {
        failing: Vec<&'static str>,
        hanging: Vec<&'static str>,
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResourceClient for ScriptedClient {
        async fn get_xr(&self, _command: &str) -> Result<String, CommandError> {
            Ok(String::new())
        }

        async fn get(&self, command: &str) -> Result<String, CommandError> {
            self.commands.lock().push(command.to_string());
            if self.hanging.iter().any(|name| command.contains(&format!("/{name} "))) {
                std::future::pending::<()>().await;
            }
            if self.failing.iter().any(|name| command.contains(&format!("/{name} "))) {
                return Err(CommandError::Failed {
                    command: command.to_string(),
                    status: "exit status: 1".to_string(),
                    output: "NotFound".to_string(),
                });
            }
            Ok("status:\n  conditions:\n  - type: Synced\n    status: \"True\"\n    reason: ReconcileSuccess\n  - type: Ready\n    status: \"True\"\n    reason: Available\n".to_string())
        }
    }

    #[test]
    fn unknown_name_reads_as_empty_snapshot() {
        let store = StatusStore::new();
        let snapshot = store.get("never-polled");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.get("Ready").status, "-");
        assert_eq!(snapshot.get("Synced").reason, "-");
    }

    #[test]
    fn set_overwrites_last_write_wins() {
        let store = StatusStore::new();
        store.set("a", ready("False"));
        store.set("a", ready("True"));
        assert_eq!(store.get("a").get("Ready").status, "True");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot_across_writes() {
        let store = StatusStore::new();
        store.set("a", ready("False"));
        let before = store.get("a");
        store.set("a", ready("True"));
        assert_eq!(before.get("Ready").status, "False");
        assert_eq!(store.get("a").get("Ready").status, "True");
    }

    #[test]
    fn concurrent_writers_on_distinct_keys() {
        let store = StatusStore::new();
        let handles = (0..8)
            .map(|index| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.set(format!("res-{index}"), ready("True"));
                        let _ = store.get("res-0");
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn poll_builds_grouped_command() {
        let client = ScriptedClient::default();
        let conditions = poll(
            &client,
            &reference("applications.azuread.m.upbound.io/v1beta1", "Application", "app"),
            "default",
        )
        .await
        .unwrap();
        assert_eq!(conditions.get("Synced").status, "True");
        assert_eq!(
            client.commands.lock().as_slice(),
            ["kubectl get Application.applications.azuread.m.upbound.io/app -n default -o yaml"]
        );
    }

    #[tokio::test]
    async fn poll_without_namespace_is_command_error() {
        let client = ScriptedClient::default();
        let error = poll(&client, &reference("v1", "Secret", "creds"), "")
            .await
            .unwrap_err();
        assert!(matches!(error, PollError::Command { .. }));
        assert!(client.commands.lock().is_empty());
    }

    #[tokio::test]
    async fn mock_client_poll_yields_ready_only() {
        let conditions = poll(&MockClient::new(), &reference("v1", "Pod", "coredns"), "default")
            .await
            .unwrap();
        assert_eq!(conditions.get("Ready").status, "True");
        assert_eq!(conditions.get("Synced").status, "-");
    }

    #[tokio::test]
    async fn failures_are_isolated_per_reference() {
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient {
            failing: vec!["broken"],
            ..ScriptedClient::default()
        });
        let store = StatusStore::new();
        let refs = vec![
            reference("v1", "Secret", "ok-1"),
            reference("v1", "Secret", "broken"),
            reference("v1", "Secret", "ok-2"),
        ];

        let summary = poll_all(client, &store, &refs, "default", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(summary.polled, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.get("ok-1").get("Ready").status, "True");
        assert_eq!(store.get("ok-2").get("Ready").status, "True");
        assert_eq!(store.get("broken").get("Ready").status, "-");
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_snapshot() {
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient {
            failing: vec!["flaky"],
            ..ScriptedClient::default()
        });
        let store = StatusStore::new();
        store.set("flaky", ready("False"));

        poll_all(
            client,
            &store,
            &[reference("v1", "Secret", "flaky")],
            "default",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(store.get("flaky").get("Ready").status, "False");
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_poll_times_out_without_stalling_siblings() {
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient {
            hanging: vec!["stuck"],
            ..ScriptedClient::default()
        });
        let store = StatusStore::new();
        let refs = vec![
            reference("v1", "Secret", "stuck"),
            reference("v1", "Secret", "fine"),
        ];

        let summary = poll_all(client, &store, &refs, "default", Duration::from_millis(250))
            .await
            .unwrap();
        assert_eq!(summary.polled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.get("fine").get("Ready").status, "True");
        assert!(store.get("stuck").is_empty());
    }

    #[tokio::test]
    async fn fan_out_emits_single_completion_event() {
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient::default());
        let store = StatusStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let refs = vec![reference("v1", "Secret", "a"), reference("v1", "Secret", "b")];

        spawn_fan_out(
            client,
            store.clone(),
            7,
            "default".to_string(),
            refs.clone(),
            Duration::from_secs(5),
            tx,
        );

        match rx.recv().await {
            Some(AppEvent::StatusLoaded {
                cycle,
                namespace,
                refs: loaded,
                failed,
            }) => {
                assert_eq!(cycle, 7);
                assert_eq!(namespace, "default");
                assert_eq!(loaded, refs);
                assert_eq!(failed, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn empty_reference_list_completes_immediately() {
        let client: Arc<dyn ResourceClient> = Arc::new(ScriptedClient::default());
        let summary = poll_all(client, &StatusStore::new(), &[], "default", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(summary.polled, 0);
        assert_eq!(summary.failed, 0);
    }
}
