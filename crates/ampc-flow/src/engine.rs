//! Flow engine - compiles flows and executes them
//!
//! `build` flattens a flow into a plan: structural edges from linear
//! ordering, data edges from `provides` → `requires`, a Kahn topological
//! order, and an input-satisfiability check against the seeded store. All
//! construction problems fail here, before any task runs.
//!
//! `run` executes the plan with the configured strategy. One engine runs one
//! flow to completion and is then discarded; a failed engine is never
//! resumed.

use crate::flow::{Flow, FlowKind, FlowNode};
use crate::store::Store;
use crate::task::{Task, TaskOutput};
use ampc_core::config::{EngineKind, TaskFlowConfig};
use ampc_core::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Built,
    Running,
    Completed,
    Reverting,
    Reverted,
    /// Failed with reverts disabled; the store is left partially applied
    Failed,
}

struct PlanNode {
    task: Arc<dyn Task>,
    deps: HashSet<usize>,
}

/// Compiled, single-use executor for one flow
pub struct FlowEngine {
    flow_name: String,
    nodes: Vec<PlanNode>,
    order: Vec<usize>,
    store: Store,
    kind: EngineKind,
    disable_revert: bool,
    pool: Arc<Semaphore>,
    state: EngineState,
}

impl FlowEngine {
    /// Compile a flow against a seeded store.
    ///
    /// Fails fast on dependency cycles and on required keys that neither the
    /// seed store nor any task provides.
    pub async fn build(flow: &Flow, store: Store, config: &TaskFlowConfig) -> Result<Self> {
        let mut nodes = Vec::new();
        flatten(flow, &mut nodes);

        // data edges: every consumer waits for all providers of its keys,
        // unless the seed store already satisfies the key
        let initial_keys: HashSet<String> = store.keys().await.into_iter().collect();
        let mut providers: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            for key in node.task.provides() {
                providers.entry(key).or_default().push(idx);
            }
        }
        for idx in 0..nodes.len() {
            for key in nodes[idx].task.requires() {
                if initial_keys.contains(&key) {
                    continue;
                }
                match providers.get(&key) {
                    Some(list) => {
                        // a self-edge surfaces as a cycle below
                        let list = list.clone();
                        nodes[idx].deps.extend(list);
                    }
                    None => {
                        return Err(Error::unsatisfied_input(nodes[idx].task.name(), key));
                    }
                }
            }
        }

        let order = topo_order(&nodes, flow.name())?;

        info!(flow = %flow.name(), tasks = nodes.len(), "Compiled flow");

        Ok(Self {
            flow_name: flow.name().to_string(),
            nodes,
            order,
            store,
            kind: config.engine,
            disable_revert: config.disable_revert,
            pool: Arc::new(Semaphore::new(config.max_workers.max(1))),
            state: EngineState::Built,
        })
    }

    /// Share a long-lived worker pool instead of the engine's own.
    /// Serial engines never touch it.
    pub fn with_pool(mut self, pool: Arc<Semaphore>) -> Self {
        self.pool = pool;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Execute the plan. Consumes the engine; on success the final store is
    /// returned, on failure the original task error after unwinding.
    pub async fn run(mut self) -> Result<Store> {
        self.state = EngineState::Running;
        info!(flow = %self.flow_name, kind = ?self.kind, "Starting flow execution");

        let outcome = match self.kind {
            EngineKind::Serial => self.run_serial().await,
            EngineKind::Parallel => self.run_parallel().await,
        };

        match outcome {
            Ok(()) => {
                self.state = EngineState::Completed;
                info!(flow = %self.flow_name, "Flow execution complete");
                Ok(self.store)
            }
            Err((failure, completed)) => {
                if self.disable_revert {
                    self.state = EngineState::Failed;
                    warn!(
                        flow = %self.flow_name,
                        error = %failure,
                        "Flow failed with reverts disabled, store left partially applied"
                    );
                } else {
                    self.state = EngineState::Reverting;
                    self.revert_completed(&completed, &failure).await;
                    self.state = EngineState::Reverted;
                }
                Err(failure)
            }
        }
    }

    /// Deterministic single-threaded execution in topological order
    async fn run_serial(&self) -> std::result::Result<(), (Error, Vec<usize>)> {
        let mut completed = Vec::new();
        for &idx in &self.order {
            let task = &self.nodes[idx].task;
            debug!(flow = %self.flow_name, task = task.name(), "Executing task");
            match task.execute(&self.store).await {
                Ok(outputs) => match self.commit(idx, outputs).await {
                    Ok(()) => completed.push(idx),
                    Err(e) => return Err((e, completed)),
                },
                Err(e) => {
                    warn!(flow = %self.flow_name, task = task.name(), error = %e, "Task failed");
                    return Err((e, completed));
                }
            }
        }
        Ok(())
    }

    /// Dispatch ready tasks concurrently, bounded by the worker pool.
    ///
    /// On the first failure no new task is scheduled, but in-flight tasks
    /// run to completion (and are reverted afterwards) rather than being
    /// cancelled mid-call.
    async fn run_parallel(&self) -> std::result::Result<(), (Error, Vec<usize>)> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            for &dep in &node.deps {
                dependents[dep].push(idx);
            }
        }

        let mut ready: VecDeque<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&idx| in_degree[idx] == 0)
            .collect();
        let mut join_set: JoinSet<(usize, Result<TaskOutput>)> = JoinSet::new();
        let mut in_flight = 0usize;
        let mut completed: Vec<usize> = Vec::new();
        let mut failure: Option<Error> = None;

        loop {
            if failure.is_none() {
                while let Some(idx) = ready.pop_front() {
                    let task = Arc::clone(&self.nodes[idx].task);
                    let store = self.store.clone();
                    let pool = Arc::clone(&self.pool);
                    let flow = self.flow_name.clone();
                    join_set.spawn(async move {
                        let _permit = pool.acquire_owned().await.expect("worker pool closed");
                        debug!(flow = %flow, task = task.name(), "Executing task");
                        let result = task.execute(&store).await;
                        (idx, result)
                    });
                    in_flight += 1;
                }
            } else {
                ready.clear();
            }

            if in_flight == 0 {
                break;
            }

            match join_set.join_next().await {
                Some(Ok((idx, result))) => {
                    in_flight -= 1;
                    match result {
                        Ok(outputs) => match self.commit(idx, outputs).await {
                            Ok(()) => {
                                completed.push(idx);
                                for &dep in &dependents[idx] {
                                    in_degree[dep] -= 1;
                                    if in_degree[dep] == 0 && failure.is_none() {
                                        ready.push_back(dep);
                                    }
                                }
                            }
                            Err(e) => {
                                if failure.is_none() {
                                    failure = Some(e);
                                }
                            }
                        },
                        Err(e) => {
                            warn!(
                                flow = %self.flow_name,
                                task = self.nodes[idx].task.name(),
                                error = %e,
                                "Task failed"
                            );
                            if failure.is_none() {
                                failure = Some(e);
                            }
                        }
                    }
                }
                Some(Err(join_err)) => {
                    in_flight -= 1;
                    error!(flow = %self.flow_name, error = %join_err, "Task aborted");
                    if failure.is_none() {
                        failure = Some(Error::InternalError);
                    }
                }
                None => break,
            }
        }

        match failure {
            None => Ok(()),
            Some(e) => Err((e, completed)),
        }
    }

    /// Validate declared outputs and merge them under one write lock
    async fn commit(&self, idx: usize, outputs: TaskOutput) -> Result<()> {
        let task = &self.nodes[idx].task;
        for key in task.provides() {
            if !outputs.contains_key(&key) {
                return Err(Error::MissingOutput {
                    task: task.name().to_string(),
                    key,
                });
            }
        }
        self.store.merge(outputs).await;
        Ok(())
    }

    /// Revert completed tasks in reverse completion order. Revert errors are
    /// logged and swallowed so the unwind always finishes.
    async fn revert_completed(&self, completed: &[usize], failure: &Error) {
        warn!(
            flow = %self.flow_name,
            error = %failure,
            reverting = completed.len(),
            "Flow failed, reverting completed tasks"
        );
        for &idx in completed.iter().rev() {
            let task = &self.nodes[idx].task;
            debug!(flow = %self.flow_name, task = task.name(), "Reverting task");
            if let Err(e) = task.revert(&self.store, failure).await {
                warn!(
                    flow = %self.flow_name,
                    task = task.name(),
                    error = %e,
                    "Revert failed, continuing unwind"
                );
            }
        }
    }
}

/// Flatten a flow tree into plan nodes with structural edges.
/// Returns the (entry, exit) node sets of the flattened subtree.
fn flatten(flow: &Flow, nodes: &mut Vec<PlanNode>) -> (Vec<usize>, Vec<usize>) {
    match flow.kind() {
        FlowKind::Linear => {
            let mut entries: Vec<usize> = Vec::new();
            let mut prev_exits: Vec<usize> = Vec::new();
            for node in flow.nodes() {
                let (child_entries, child_exits) = flatten_node(node, nodes);
                if child_entries.is_empty() {
                    continue;
                }
                for &entry in &child_entries {
                    for &exit in &prev_exits {
                        nodes[entry].deps.insert(exit);
                    }
                }
                if entries.is_empty() {
                    entries = child_entries;
                }
                prev_exits = child_exits;
            }
            (entries, prev_exits)
        }
        FlowKind::Unordered => {
            let mut entries = Vec::new();
            let mut exits = Vec::new();
            for node in flow.nodes() {
                let (child_entries, child_exits) = flatten_node(node, nodes);
                entries.extend(child_entries);
                exits.extend(child_exits);
            }
            (entries, exits)
        }
    }
}

fn flatten_node(node: &FlowNode, nodes: &mut Vec<PlanNode>) -> (Vec<usize>, Vec<usize>) {
    match node {
        FlowNode::Task(task) => {
            let idx = nodes.len();
            nodes.push(PlanNode {
                task: Arc::clone(task),
                deps: HashSet::new(),
            });
            (vec![idx], vec![idx])
        }
        FlowNode::SubFlow(sub) => flatten(sub, nodes),
    }
}

/// Kahn topological sort, lowest index first for determinism.
/// Leftover nodes mean a cycle.
fn topo_order(nodes: &[PlanNode], flow_name: &str) -> Result<Vec<usize>> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.deps.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        for &dep in &node.deps {
            dependents[dep].push(idx);
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(&idx) = ready.iter().next() {
        ready.remove(&idx);
        order.push(idx);
        for &dep in &dependents[idx] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                ready.insert(dep);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(Error::flow_cycle(flow_name));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct RecordingTask {
        name: String,
        requires: Vec<String>,
        provides: Vec<String>,
        log: EventLog,
        fail: bool,
        fail_revert: bool,
        delay: Option<Duration>,
    }

    impl RecordingTask {
        fn new(name: &str, log: &EventLog) -> Self {
            Self {
                name: name.to_string(),
                requires: Vec::new(),
                provides: Vec::new(),
                log: log.clone(),
                fail: false,
                fail_revert: false,
                delay: None,
            }
        }

        fn requires(mut self, keys: &[&str]) -> Self {
            self.requires = keys.iter().map(|k| k.to_string()).collect();
            self
        }

        fn provides(mut self, keys: &[&str]) -> Self {
            self.provides = keys.iter().map(|k| k.to_string()).collect();
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn failing_revert(mut self) -> Self {
            self.fail_revert = true;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl Task for RecordingTask {
        fn name(&self) -> &str {
            &self.name
        }

        fn requires(&self) -> Vec<String> {
            self.requires.clone()
        }

        fn provides(&self) -> Vec<String> {
            self.provides.clone()
        }

        async fn execute(&self, _store: &Store) -> Result<TaskOutput> {
            self.log.lock().unwrap().push(format!("exec:{}", self.name));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::DeleteFailed);
            }
            Ok(self
                .provides
                .iter()
                .map(|k| (k.clone(), json!(self.name)))
                .collect())
        }

        async fn revert(&self, _store: &Store, _failure: &Error) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("revert:{}", self.name));
            if self.fail_revert {
                return Err(Error::InternalError);
            }
            Ok(())
        }
    }

    fn serial_config() -> TaskFlowConfig {
        TaskFlowConfig::default()
    }

    fn parallel_config() -> TaskFlowConfig {
        TaskFlowConfig {
            engine: EngineKind::Parallel,
            max_workers: 4,
            ..TaskFlowConfig::default()
        }
    }

    fn events(log: &EventLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn linear_flow_runs_in_declaration_order() {
        for _ in 0..2 {
            let log: EventLog = Default::default();
            let flow = Flow::linear("ordered")
                .add_task(Arc::new(RecordingTask::new("a", &log)))
                .add_task(Arc::new(RecordingTask::new("b", &log)))
                .add_task(Arc::new(RecordingTask::new("c", &log)));

            let engine = FlowEngine::build(&flow, Store::new(), &serial_config())
                .await
                .unwrap();
            assert_eq!(engine.state(), EngineState::Built);
            engine.run().await.unwrap();

            assert_eq!(events(&log), vec!["exec:a", "exec:b", "exec:c"]);
        }
    }

    #[tokio::test]
    async fn build_rejects_unsatisfiable_input() {
        let log: EventLog = Default::default();
        let flow = Flow::linear("broken")
            .add_task(Arc::new(RecordingTask::new("a", &log).requires(&["missing"])));

        let err = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsatisfiedInput { ref key, .. } if key == "missing"));
        // nothing ran
        assert!(events(&log).is_empty());
    }

    #[tokio::test]
    async fn seeded_store_satisfies_inputs() {
        let log: EventLog = Default::default();
        let flow = Flow::linear("seeded")
            .add_task(Arc::new(RecordingTask::new("a", &log).requires(&["seed_key"])));

        let mut seed = HashMap::new();
        seed.insert("seed_key".to_string(), json!(1));
        let engine = FlowEngine::build(&flow, Store::seeded(seed), &serial_config())
            .await
            .unwrap();
        engine.run().await.unwrap();
        assert_eq!(events(&log), vec!["exec:a"]);
    }

    #[tokio::test]
    async fn build_rejects_cycles() {
        let log: EventLog = Default::default();
        let flow = Flow::unordered("cyclic")
            .add_task(Arc::new(
                RecordingTask::new("a", &log).requires(&["y"]).provides(&["x"]),
            ))
            .add_task(Arc::new(
                RecordingTask::new("b", &log).requires(&["x"]).provides(&["y"]),
            ));

        let err = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::FlowCycle { ref flow } if flow == "cyclic"));
        assert!(events(&log).is_empty());
    }

    #[tokio::test]
    async fn task_depending_on_own_output_is_a_cycle() {
        let log: EventLog = Default::default();
        let flow = Flow::unordered("self").add_task(Arc::new(
            RecordingTask::new("a", &log).requires(&["k"]).provides(&["k"]),
        ));

        let err = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::FlowCycle { .. }));
    }

    #[tokio::test]
    async fn failure_reverts_in_reverse_completion_order() {
        let log: EventLog = Default::default();
        let flow = Flow::linear("unwinds")
            .add_task(Arc::new(RecordingTask::new("a", &log)))
            .add_task(Arc::new(RecordingTask::new("b", &log)))
            .add_task(Arc::new(RecordingTask::new("c", &log).failing()));

        let engine = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .unwrap();
        let err = engine.run().await.err().unwrap();

        // the surfaced failure is c's error, not a revert error
        assert!(matches!(err, Error::DeleteFailed));
        assert_eq!(
            events(&log),
            vec!["exec:a", "exec:b", "exec:c", "revert:b", "revert:a"]
        );
    }

    #[tokio::test]
    async fn revert_errors_are_swallowed() {
        let log: EventLog = Default::default();
        let flow = Flow::linear("unwinds-anyway")
            .add_task(Arc::new(RecordingTask::new("a", &log)))
            .add_task(Arc::new(RecordingTask::new("b", &log).failing_revert()))
            .add_task(Arc::new(RecordingTask::new("c", &log).failing()));

        let engine = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .unwrap();
        let err = engine.run().await.err().unwrap();

        assert!(matches!(err, Error::DeleteFailed));
        // b's revert failed but a was still reverted
        assert_eq!(
            events(&log),
            vec!["exec:a", "exec:b", "exec:c", "revert:b", "revert:a"]
        );
    }

    #[tokio::test]
    async fn disabled_reverts_leave_store_partially_applied() {
        let log: EventLog = Default::default();
        let flow = Flow::linear("no-revert")
            .add_task(Arc::new(RecordingTask::new("a", &log).provides(&["a_key"])))
            .add_task(Arc::new(RecordingTask::new("b", &log).failing()));

        let store = Store::new();
        let config = TaskFlowConfig {
            disable_revert: true,
            ..TaskFlowConfig::default()
        };
        let engine = FlowEngine::build(&flow, store.clone(), &config)
            .await
            .unwrap();
        let err = engine.run().await.err().unwrap();

        assert!(matches!(err, Error::DeleteFailed));
        assert_eq!(store.get("a_key").await, Some(json!("a")));
        assert!(!events(&log).iter().any(|e| e.starts_with("revert:")));
    }

    #[tokio::test]
    async fn missing_declared_output_fails_the_task() {
        struct LiarTask;

        #[async_trait]
        impl Task for LiarTask {
            fn name(&self) -> &str {
                "liar"
            }

            fn provides(&self) -> Vec<String> {
                vec!["promised".to_string()]
            }

            async fn execute(&self, _store: &Store) -> Result<TaskOutput> {
                Ok(TaskOutput::new())
            }
        }

        let flow = Flow::linear("liar-flow").add_task(Arc::new(LiarTask));
        let engine = FlowEngine::build(&flow, Store::new(), &serial_config())
            .await
            .unwrap();
        let err = engine.run().await.err().unwrap();
        assert!(matches!(err, Error::MissingOutput { ref key, .. } if key == "promised"));
    }

    #[tokio::test]
    async fn parallel_flow_respects_data_dependencies() {
        let log: EventLog = Default::default();
        let flow = Flow::unordered("fan")
            .add_task(Arc::new(RecordingTask::new("producer", &log).provides(&["x"])))
            .add_task(Arc::new(RecordingTask::new("consumer", &log).requires(&["x"])))
            .add_task(Arc::new(RecordingTask::new("loner", &log)));

        let store = Store::new();
        let engine = FlowEngine::build(&flow, store.clone(), &parallel_config())
            .await
            .unwrap();
        engine.run().await.unwrap();

        let log = events(&log);
        let position = |name: &str| log.iter().position(|e| e == name).unwrap();
        assert!(position("exec:producer") < position("exec:consumer"));
        assert_eq!(log.len(), 3);
        assert_eq!(store.get("x").await, Some(json!("producer")));
    }

    #[tokio::test]
    async fn parallel_failure_lets_in_flight_tasks_finish_then_reverts() {
        let log: EventLog = Default::default();
        let flow = Flow::unordered("aborts")
            .add_task(Arc::new(RecordingTask::new("fast-fail", &log).failing()))
            .add_task(Arc::new(
                RecordingTask::new("slow", &log)
                    .provides(&["slow_key"])
                    .slow(Duration::from_millis(50)),
            ));

        let engine = FlowEngine::build(&flow, Store::new(), &parallel_config())
            .await
            .unwrap();
        let err = engine.run().await.err().unwrap();

        assert!(matches!(err, Error::DeleteFailed));
        let log = events(&log);
        // slow finished and was then reverted; the failed task was not
        assert!(log.contains(&"revert:slow".to_string()));
        assert!(!log.contains(&"revert:fast-fail".to_string()));
    }
}
