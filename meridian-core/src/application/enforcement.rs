// meridian-core/src/application/enforcement.rs
//
// The enforcement loop: a single long-running consumer that wakes on every
// coalesced policy-change signal, reads the latest action plan, and
// dispatches it layer-by-layer to the driver registered for each instance's
// `driver_type`. Layer concurrency and fail-fast-per-layer are carried over
// from a build-pipeline orchestration style, narrowed here from "run every
// model in a layer" to "apply every instance in a layer" and re-grounded on
// `ActionPlan`/`GraphSolver` instead of a model DAG.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::domain::diff::{Action, ActionPlan};
use crate::domain::graph::GraphSolver;
use crate::domain::model::ComponentSpec;
use crate::domain::resolve::{Instance, InstanceKey};
use crate::ports::driver::{ClusterDriver, DriverError, DriverOp};

const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_RETRY_BACKOFFS_MS: &[u64] = &[200, 800, 3200];
const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

pub struct EnforcementLoop<'d> {
    drivers: HashMap<&'static str, &'d dyn ClusterDriver>,
    concurrency: usize,
    deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct EnforcementOutcome {
    pub applied: usize,
    pub failed: Vec<(InstanceKey, String)>,
}

impl<'d> EnforcementLoop<'d> {
    pub fn new(drivers: Vec<&'d dyn ClusterDriver>) -> Self {
        let drivers = drivers.into_iter().map(|d| (driver_type_leaked(d), d)).collect();
        Self { drivers, concurrency: DEFAULT_CONCURRENCY, deadline: DEFAULT_DEADLINE }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs until `signal` is closed (the publisher side was dropped).
    /// Every change notification re-fetches the current plan via `fetch_plan`
    /// and applies it; notifications that arrive while a plan is being
    /// applied coalesce into a single re-check afterward.
    pub async fn run<F, Fut>(&self, mut signal: watch::Receiver<()>, mut fetch_plan: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ActionPlan>,
    {
        loop {
            let plan = fetch_plan().await;
            if !plan.is_empty() {
                let outcome = self.apply(&plan).await;
                if outcome.failed.is_empty() {
                    info!(applied = outcome.applied, "enforcement pass completed");
                } else {
                    warn!(applied = outcome.applied, failed = outcome.failed.len(), "enforcement pass completed with failures");
                }
            }

            if signal.changed().await.is_err() {
                return;
            }
        }
    }

    /// Applies `plan` layer by layer: every `Create`/`Update` whose
    /// dependency-order position is already satisfied runs concurrently
    /// within a layer via `GraphSolver`. A layer's failures are collected
    /// but do not block dispatching instances with no failed dependency;
    /// a failed `Create`'s transitive dependents are skipped rather than
    /// dispatched against a target that never came up.
    pub async fn apply(&self, plan: &ActionPlan) -> EnforcementOutcome {
        let mut applied = 0usize;
        let mut failed = Vec::new();

        let lifecycle_ops: HashMap<InstanceKey, (DriverOp, &Instance)> = plan
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Create(i) => Some((i.key.clone(), (DriverOp::Create, i))),
                Action::Update(i) => Some((i.key.clone(), (DriverOp::Update, i))),
                _ => None,
            })
            .collect();

        let nodes: Vec<InstanceKey> = lifecycle_ops.keys().cloned().collect();
        let mut dependents: HashMap<InstanceKey, Vec<InstanceKey>> = HashMap::new();
        for action in &plan.actions {
            if let Action::AttachDependency { from, to } = action {
                if lifecycle_ops.contains_key(from) && lifecycle_ops.contains_key(to) {
                    dependents.entry(to.clone()).or_default().push(from.clone());
                }
            }
        }

        let layers = match GraphSolver::layered_order(&nodes, &dependents) {
            Ok(layers) => layers,
            Err(err) => {
                error!(%err, "enforcement plan dependency graph has a cycle, applying as one unordered layer");
                vec![nodes.clone()]
            }
        };

        let mut skipped: HashSet<InstanceKey> = HashSet::new();
        for layer in layers {
            let runnable: Vec<(DriverOp, &Instance)> = layer
                .iter()
                .filter(|key| !skipped.contains(*key))
                .filter_map(|key| lifecycle_ops.get(key).copied())
                .collect();

            let results: Vec<(InstanceKey, Result<(), String>)> = stream::iter(runnable)
                .map(|(op, instance)| async move { (instance.key.clone(), self.apply_one(op, instance).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            let mut newly_failed = Vec::new();
            for (key, result) in results {
                match result {
                    Ok(()) => applied += 1,
                    Err(reason) => {
                        newly_failed.push(key.clone());
                        failed.push((key, reason));
                    }
                }
            }

            let mut queue: VecDeque<InstanceKey> = newly_failed.into_iter().collect();
            while let Some(key) = queue.pop_front() {
                let Some(deps) = dependents.get(&key) else { continue };
                for dependent in deps {
                    if skipped.insert(dependent.clone()) {
                        failed.push((dependent.clone(), format!("skipped: depends on failed instance {key}")));
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }

        for action in &plan.actions {
            if let Action::Delete(key) = action {
                match self.apply_delete(key).await {
                    Ok(()) => applied += 1,
                    Err(reason) => failed.push((key.clone(), reason)),
                }
            }
        }

        EnforcementOutcome { applied, failed }
    }

    async fn apply_one(&self, op: DriverOp, instance: &Instance) -> Result<(), String> {
        let driver_type = match &instance.spec {
            ComponentSpec::Code { driver_type, .. } => driver_type.as_str(),
            ComponentSpec::ServiceRef { .. } => {
                return Err("cannot apply a ServiceRef directly; resolver should have expanded it".into())
            }
        };
        let driver = self
            .drivers
            .get(driver_type)
            .ok_or_else(|| format!("no driver registered for type '{driver_type}'"))?;

        self.with_retry(|| async { timeout(self.deadline, driver.apply(op, instance)).await }).await
    }

    async fn apply_delete(&self, key: &InstanceKey) -> Result<(), String> {
        // Deletes have no surviving `Instance` to read a driver type from;
        // every registered driver is asked and the first to recognize the
        // key (a successful, non-`Fatal` status probe) performs the delete.
        for driver in self.drivers.values() {
            if driver.status(key).await.is_ok() {
                return self
                    .with_retry(|| async {
                        timeout(self.deadline, driver.apply(DriverOp::Delete, &placeholder_instance(key))).await
                    })
                    .await;
            }
        }
        Err(format!("no driver claims instance {key}"))
    }

    async fn with_retry<F, Fut>(&self, mut call: F) -> Result<(), String>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Result<crate::ports::driver::ActionStatus, DriverError>, tokio::time::error::Elapsed>>,
    {
        let mut attempt = 0usize;
        loop {
            let retry_or_fail = |attempt: &mut usize| -> Option<Duration> {
                if *attempt < DEFAULT_RETRY_BACKOFFS_MS.len() {
                    let backoff = DEFAULT_RETRY_BACKOFFS_MS[*attempt];
                    *attempt += 1;
                    Some(Duration::from_millis(backoff))
                } else {
                    None
                }
            };

            match call().await {
                Ok(Ok(_status)) => return Ok(()),
                Ok(Err(DriverError::Fatal(msg))) => return Err(msg),
                Ok(Err(transient)) => match retry_or_fail(&mut attempt) {
                    Some(backoff) => {
                        warn!(attempt, backoff_ms = backoff.as_millis() as u64, "driver call failed, retrying");
                        tokio::time::sleep(backoff).await;
                    }
                    None => return Err(transient.to_string()),
                },
                Err(_elapsed) => match retry_or_fail(&mut attempt) {
                    Some(backoff) => {
                        warn!(attempt, backoff_ms = backoff.as_millis() as u64, "driver call timed out, retrying");
                        tokio::time::sleep(backoff).await;
                    }
                    None => return Err("driver call exceeded deadline".into()),
                },
            }
        }
    }
}

fn driver_type_leaked(driver: &dyn ClusterDriver) -> &'static str {
    // Driver registries are built once at startup from a small, static set
    // of compiled-in drivers, so leaking the type string for the process
    // lifetime is the simplest way to get a `&'static str` key without
    // threading a lifetime through `EnforcementLoop`.
    Box::leak(driver.driver_type().to_string().into_boxed_str())
}

fn placeholder_instance(key: &InstanceKey) -> Instance {
    Instance {
        key: key.clone(),
        claim_namespace: String::new(),
        claim_name: String::new(),
        component_name: String::new(),
        cluster_namespace: String::new(),
        cluster_name: String::new(),
        parameters: HashMap::new(),
        labels: HashMap::new(),
        spec: ComponentSpec::Code { driver_type: String::new(), params: HashMap::new() },
    }
}

/// An in-memory driver used by tests and the CLI's local demo mode: it
/// records every call it receives instead of talking to a real cluster.
pub mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    pub struct RecordingDriver {
        driver_type: &'static str,
        calls: Mutex<Vec<(DriverOp, InstanceKey)>>,
    }

    impl RecordingDriver {
        pub fn new(driver_type: &'static str) -> Self {
            Self { driver_type, calls: Mutex::new(Vec::new()) }
        }

        pub fn calls(&self) -> Vec<(DriverOp, InstanceKey)> {
            self.calls.lock().expect("recording driver mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl ClusterDriver for RecordingDriver {
        fn driver_type(&self) -> &str {
            self.driver_type
        }

        async fn validate(&self) -> Result<(), DriverError> {
            Ok(())
        }

        async fn apply(&self, op: DriverOp, instance: &Instance) -> Result<crate::ports::driver::ActionStatus, DriverError> {
            self.calls.lock().expect("recording driver mutex poisoned").push((op, instance.key.clone()));
            Ok(crate::ports::driver::ActionStatus::Succeeded)
        }

        async fn status(&self, instance_key: &InstanceKey) -> Result<crate::ports::driver::ActionStatus, DriverError> {
            let seen = self.calls.lock().expect("recording driver mutex poisoned").iter().any(|(_, k)| k == instance_key);
            if seen {
                Ok(crate::ports::driver::ActionStatus::Succeeded)
            } else {
                Err(DriverError::Fatal("unknown instance".into()))
            }
        }

        async fn endpoints(&self, _instance_key: &InstanceKey) -> Result<Vec<String>, DriverError> {
            Ok(vec![])
        }
    }

    /// A driver that fails every `Create`/`Update` for one named instance key
    /// and records everything else like `RecordingDriver`. Used to exercise
    /// dependent-skip behavior without waiting out retry backoffs.
    pub struct FailingDriver {
        driver_type: &'static str,
        fails: InstanceKey,
        calls: Mutex<Vec<(DriverOp, InstanceKey)>>,
    }

    impl FailingDriver {
        pub fn new(driver_type: &'static str, fails: InstanceKey) -> Self {
            Self { driver_type, fails, calls: Mutex::new(Vec::new()) }
        }

        pub fn calls(&self) -> Vec<(DriverOp, InstanceKey)> {
            self.calls.lock().expect("failing driver mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl ClusterDriver for FailingDriver {
        fn driver_type(&self) -> &str {
            self.driver_type
        }

        async fn validate(&self) -> Result<(), DriverError> {
            Ok(())
        }

        async fn apply(&self, op: DriverOp, instance: &Instance) -> Result<crate::ports::driver::ActionStatus, DriverError> {
            self.calls.lock().expect("failing driver mutex poisoned").push((op, instance.key.clone()));
            if instance.key == self.fails {
                return Err(DriverError::Fatal("injected failure".into()));
            }
            Ok(crate::ports::driver::ActionStatus::Succeeded)
        }

        async fn status(&self, instance_key: &InstanceKey) -> Result<crate::ports::driver::ActionStatus, DriverError> {
            let seen = self.calls.lock().expect("failing driver mutex poisoned").iter().any(|(_, k)| k == instance_key);
            if seen {
                Ok(crate::ports::driver::ActionStatus::Succeeded)
            } else {
                Err(DriverError::Fatal("unknown instance".into()))
            }
        }

        async fn endpoints(&self, _instance_key: &InstanceKey) -> Result<Vec<String>, DriverError> {
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingDriver;
    use super::*;
    use crate::domain::resolve::DesiredState;
    use std::collections::HashMap as Map;

    fn instance(key: &str, driver_type: &str) -> Instance {
        Instance {
            key: InstanceKey(key.to_string()),
            claim_namespace: "p".into(),
            claim_name: "claim".into(),
            component_name: "app".into(),
            cluster_namespace: "p".into(),
            cluster_name: "eu-1".into(),
            parameters: Map::new(),
            labels: Map::new(),
            spec: ComponentSpec::Code { driver_type: driver_type.into(), params: Map::new() },
        }
    }

    #[tokio::test]
    async fn creates_dispatch_to_the_matching_driver() {
        let driver = RecordingDriver::new("chart");
        let loop_ = EnforcementLoop::new(vec![&driver]);

        let mut plan = ActionPlan::new();
        plan.push(Action::Create(instance("a", "chart")));

        let outcome = loop_.apply(&plan).await;
        assert_eq!(outcome.applied, 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(driver.calls().len(), 1);
    }

    #[tokio::test]
    async fn dependents_of_a_failed_create_are_skipped_not_dispatched() {
        use super::test_support::FailingDriver;

        let driver = FailingDriver::new("chart", InstanceKey("base".into()));
        let loop_ = EnforcementLoop::new(vec![&driver]);

        let mut plan = ActionPlan::new();
        plan.push(Action::Create(instance("base", "chart")));
        plan.push(Action::Create(instance("dependent", "chart")));
        plan.push(Action::AttachDependency { from: InstanceKey("dependent".into()), to: InstanceKey("base".into()) });

        let outcome = loop_.apply(&plan).await;
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.failed.iter().any(|(k, reason)| k.as_str() == "dependent" && reason.contains("skipped")));

        let dispatched: Vec<InstanceKey> = driver.calls().into_iter().map(|(_, k)| k).collect();
        assert!(!dispatched.contains(&InstanceKey("dependent".into())));
    }

    #[tokio::test]
    async fn unknown_driver_type_is_reported_as_a_failure_not_a_panic() {
        let driver = RecordingDriver::new("chart");
        let loop_ = EnforcementLoop::new(vec![&driver]);

        let mut plan = ActionPlan::new();
        plan.push(Action::Create(instance("a", "terraform")));

        let outcome = loop_.apply(&plan).await;
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failed.len(), 1);
    }

    #[tokio::test]
    async fn run_exits_once_the_publisher_is_dropped() {
        let (tx, rx) = watch::channel(());
        drop(tx);
        let loop_ = EnforcementLoop::new(vec![]);
        loop_.run(rx, || async { ActionPlan::new() }).await;
    }

    #[test]
    fn desired_state_round_trips_through_an_empty_plan() {
        let state = DesiredState::new();
        assert!(state.nodes.is_empty());
    }
}
