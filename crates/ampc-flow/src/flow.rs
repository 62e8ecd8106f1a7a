//! Flow - structural composition of tasks
//!
//! A flow is a finite DAG of tasks and sub-flows. It carries no execution
//! logic; [`crate::FlowEngine`] compiles it into a plan.

use crate::task::Task;
use std::sync::Arc;

/// How a flow's children relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Children run strictly in insertion order
    Linear,
    /// Execution order is at the engine's discretion, constrained only by
    /// declared input/output keys; independent children may run in parallel
    Unordered,
}

/// One child of a flow
#[derive(Clone)]
pub enum FlowNode {
    Task(Arc<dyn Task>),
    SubFlow(Flow),
}

/// Ordered or unordered composition of tasks and sub-flows
#[derive(Clone)]
pub struct Flow {
    name: String,
    kind: FlowKind,
    nodes: Vec<FlowNode>,
}

impl Flow {
    /// New linear flow
    pub fn linear(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FlowKind::Linear,
            nodes: Vec::new(),
        }
    }

    /// New unordered flow
    pub fn unordered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FlowKind::Unordered,
            nodes: Vec::new(),
        }
    }

    /// Append a task
    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.nodes.push(FlowNode::Task(task));
        self
    }

    /// Append a nested flow
    pub fn add_subflow(mut self, flow: Flow) -> Self {
        self.nodes.push(FlowNode::SubFlow(flow));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub(crate) fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    /// Number of tasks, counting nested flows
    pub fn task_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                FlowNode::Task(_) => 1,
                FlowNode::SubFlow(flow) => flow.task_count(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.task_count() == 0
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tasks", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::task::TaskOutput;
    use ampc_core::Result;
    use async_trait::async_trait;

    struct Noop(&'static str);

    #[async_trait]
    impl Task for Noop {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, _store: &Store) -> Result<TaskOutput> {
            Ok(TaskOutput::new())
        }
    }

    #[test]
    fn counts_nested_tasks() {
        let inner = Flow::unordered("inner")
            .add_task(Arc::new(Noop("a")))
            .add_task(Arc::new(Noop("b")));
        let outer = Flow::linear("outer")
            .add_task(Arc::new(Noop("c")))
            .add_subflow(inner);

        assert_eq!(outer.task_count(), 3);
        assert_eq!(outer.kind(), FlowKind::Linear);
        assert!(!outer.is_empty());
        assert!(Flow::linear("empty").is_empty());
    }
}
