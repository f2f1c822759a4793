//! Per-run node table.
//!
//! Every run gets a fresh [`RunState`]; nodes in the [`Pipeline`] are never
//! mutated, so one pipeline can serve any number of concurrent runs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::collections::btree_map::Entry;
use std::time::Duration;

use jiff::Timestamp;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::report::{NodeReason, NodeReport, NodeState, RunId, RunReport, RunStatus, millis};
use super::seed::Seed;
use crate::TRACING_TARGET;
use crate::graph::Pipeline;
use crate::processor::Inputs;
use crate::value::PortMap;

#[derive(Debug, Default)]
struct Slot {
    state: NodeState,
    inputs: PortMap,
    outputs: PortMap,
    reason: Option<NodeReason>,
    reused: bool,
    elapsed: Option<Duration>,
}

/// Transient state of every node for one run.
pub(crate) struct RunState<'a> {
    pipeline: &'a Pipeline,
    slots: Vec<Slot>,
}

impl<'a> RunState<'a> {
    /// Creates a table with every node pending and the seed bound.
    ///
    /// The seed must already be validated against the pipeline.
    pub fn new(pipeline: &'a Pipeline, seed: Seed) -> Self {
        let mut slots: Vec<Slot> = pipeline
            .graph()
            .node_indices()
            .map(|_| Slot::default())
            .collect();

        for value in seed {
            if let Ok(index) = pipeline.index_of(&value.node) {
                slots[index.index()].inputs.insert(value.port, value.value);
            }
        }

        Self { pipeline, slots }
    }

    #[inline]
    fn slot(&self, index: NodeIndex) -> &Slot {
        &self.slots[index.index()]
    }

    #[inline]
    fn slot_mut(&mut self, index: NodeIndex) -> &mut Slot {
        &mut self.slots[index.index()]
    }

    #[inline]
    fn name(&self, index: NodeIndex) -> &'a str {
        let pipeline: &'a Pipeline = self.pipeline;
        pipeline.graph()[index].name()
    }

    /// Returns the current state of a node.
    pub fn state(&self, index: NodeIndex) -> NodeState {
        self.slot(index).state
    }

    /// Returns a copy of the inputs bound to a node.
    pub fn inputs(&self, index: NodeIndex) -> Inputs {
        Inputs::new(self.slot(index).inputs.clone())
    }

    /// Sources of the edges feeding one input port.
    fn feeders(&self, index: NodeIndex, port: &str) -> impl Iterator<Item = NodeIndex> {
        self.pipeline
            .graph()
            .edges_directed(index, Direction::Incoming)
            .filter(move |edge| edge.weight().to_port == port)
            .map(|edge| edge.source())
    }

    /// Returns whether some edge into the port may still deliver a value.
    fn can_still_deliver(&self, index: NodeIndex, port: &str) -> bool {
        self.feeders(index, port)
            .any(|source| self.state(source).is_live())
    }

    fn is_ready(&self, index: NodeIndex, relaxed: bool) -> bool {
        let slot = self.slot(index);
        if slot.state != NodeState::Pending {
            return false;
        }

        let processor = self.pipeline.graph()[index].processor();
        processor.inputs().iter().all(|spec| {
            slot.inputs.contains_key(&spec.name)
                || (!spec.required && (relaxed || !self.can_still_deliver(index, &spec.name)))
        })
    }

    /// Returns the nodes of the next wave in declaration order.
    ///
    /// A node normally also waits for optional inputs that can still arrive.
    /// When that leaves nothing to run, nodes whose required inputs are bound
    /// run without those optional inputs.
    pub fn ready_nodes(&self) -> Vec<NodeIndex> {
        let graph = self.pipeline.graph();

        let ready: Vec<_> = graph
            .node_indices()
            .filter(|index| self.is_ready(*index, false))
            .collect();
        if !ready.is_empty() {
            return ready;
        }

        let relaxed: Vec<_> = graph
            .node_indices()
            .filter(|index| self.is_ready(*index, true))
            .collect();
        if !relaxed.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET,
                pipeline = %self.pipeline.name(),
                nodes = relaxed.len(),
                "Running nodes without pending optional inputs"
            );
        }
        relaxed
    }

    /// Marks the nodes of a wave as running.
    pub fn mark_running(&mut self, wave: &[NodeIndex]) {
        for index in wave {
            self.slot_mut(*index).state = NodeState::Running;
        }
    }

    /// Records a successful invocation.
    pub fn complete(
        &mut self,
        index: NodeIndex,
        outputs: PortMap,
        reused: bool,
        elapsed: Duration,
    ) {
        let slot = self.slot_mut(index);
        slot.state = NodeState::Done;
        slot.outputs = outputs;
        slot.reused = reused;
        slot.elapsed = Some(elapsed);
    }

    /// Records a failed invocation.
    pub fn fail(&mut self, index: NodeIndex, message: String, elapsed: Duration) {
        let slot = self.slot_mut(index);
        slot.state = NodeState::Failed;
        slot.reason = Some(NodeReason::ProcessingFailed { message });
        slot.elapsed = Some(elapsed);
    }

    /// Returns nodes interrupted mid-wave to pending.
    pub fn abandon_running(&mut self) {
        for slot in &mut self.slots {
            if slot.state == NodeState::Running {
                slot.state = NodeState::Pending;
            }
        }
    }

    /// Copies the outputs of a finished wave along outgoing edges.
    ///
    /// Edges are visited in declaration order and a port keeps the first
    /// value it receives, so ties between nodes of the same wave go to the
    /// earlier edge. Values for nodes that already left `pending` are
    /// discarded.
    pub fn propagate(&mut self, wave: &[NodeIndex]) {
        let pipeline = self.pipeline;
        let finished: HashSet<NodeIndex> = wave
            .iter()
            .copied()
            .filter(|index| self.state(*index) == NodeState::Done)
            .collect();

        for (_, source, target, data) in pipeline.indexed_edges() {
            if !finished.contains(&source) {
                continue;
            }

            let Some(value) = self.slot(source).outputs.get(&data.from_port).cloned() else {
                continue;
            };

            let slot = self.slot_mut(target);
            if slot.state != NodeState::Pending {
                continue;
            }

            match slot.inputs.entry(data.to_port.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(_) => {
                    tracing::trace!(
                        target: TRACING_TARGET,
                        from = %pipeline.graph()[source].name(),
                        to = %pipeline.graph()[target].name(),
                        port = %data.to_port,
                        "Discarded later arrival on bound port"
                    );
                }
            }
        }
    }

    /// Skips pending nodes that can no longer receive a required input
    /// because of an upstream failure, until nothing changes.
    pub fn settle_skips(&mut self) {
        loop {
            let mut changed = false;

            for index in self.pipeline.graph().node_indices() {
                if self.state(index) != NodeState::Pending {
                    continue;
                }

                if let Some(reason) = self.skip_reason(index) {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        pipeline = %self.pipeline.name(),
                        node = %self.name(index),
                        reason = ?reason,
                        "Skipping node"
                    );
                    let slot = self.slot_mut(index);
                    slot.state = NodeState::Skipped;
                    slot.reason = Some(reason);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
    }

    fn skip_reason(&self, index: NodeIndex) -> Option<NodeReason> {
        let slot = self.slot(index);
        let processor = self.pipeline.graph()[index].processor();

        let mut failed = BTreeSet::new();
        let mut skipped = BTreeSet::new();

        let unbound = processor
            .inputs()
            .iter()
            .filter(|spec| spec.required && !slot.inputs.contains_key(&spec.name));

        for spec in unbound {
            if self.can_still_deliver(index, &spec.name) {
                continue;
            }

            for source in self.feeders(index, &spec.name) {
                match self.state(source) {
                    NodeState::Failed => failed.insert(self.name(source).to_owned()),
                    NodeState::Skipped => skipped.insert(self.name(source).to_owned()),
                    _ => false,
                };
            }
        }

        if !failed.is_empty() {
            Some(NodeReason::UpstreamFailed {
                nodes: failed.into_iter().collect(),
            })
        } else if !skipped.is_empty() {
            Some(NodeReason::UpstreamSkipped {
                nodes: skipped.into_iter().collect(),
            })
        } else {
            None
        }
    }

    fn missing_input(&self, index: NodeIndex) -> NodeReason {
        let slot = self.slot(index);
        let processor = self.pipeline.graph()[index].processor();
        let unbound = |required: bool| -> Vec<String> {
            processor
                .inputs()
                .iter()
                .filter(|spec| spec.required == required && !slot.inputs.contains_key(&spec.name))
                .map(|spec| spec.name.clone())
                .collect()
        };

        let mut ports = unbound(true);
        if ports.is_empty() {
            ports = unbound(false);
        }

        let waiting_on: BTreeSet<String> = ports
            .iter()
            .flat_map(|port| self.feeders(index, port))
            .filter(|source| self.state(*source).is_live())
            .map(|source| self.name(source).to_owned())
            .collect();

        NodeReason::MissingInput {
            ports,
            waiting_on: waiting_on.into_iter().collect(),
        }
    }

    /// Returns whether every sink is done.
    ///
    /// A pipeline without sinks (every node sits on a cycle) is done when
    /// every node is.
    pub fn sinks_done(&self) -> bool {
        let sinks = self.pipeline.sink_indices();
        if sinks.is_empty() {
            return self.slots.iter().all(|slot| slot.state == NodeState::Done);
        }

        sinks
            .into_iter()
            .all(|index| self.state(index) == NodeState::Done)
    }

    /// Consumes the table into a report.
    pub fn finish(self, run_id: RunId, status: RunStatus, started_at: Timestamp) -> RunReport {
        let pipeline = self.pipeline;
        let graph = pipeline.graph();

        let sink_outputs: BTreeMap<String, PortMap> = pipeline
            .sink_indices()
            .into_iter()
            .filter(|index| self.state(*index) == NodeState::Done)
            .map(|index| (self.name(index).to_owned(), self.slot(index).outputs.clone()))
            .collect();

        let reasons: Vec<Option<NodeReason>> = graph
            .node_indices()
            .map(|index| match self.state(index) {
                NodeState::Pending if status == RunStatus::Cancelled => {
                    Some(NodeReason::Cancelled)
                }
                NodeState::Pending => Some(self.missing_input(index)),
                _ => None,
            })
            .collect();

        let nodes = graph
            .node_indices()
            .zip(self.slots)
            .zip(reasons)
            .map(|((index, slot), pending_reason)| NodeReport {
                name: graph[index].name().to_owned(),
                state: slot.state,
                reason: pending_reason.or(slot.reason),
                reused: slot.reused,
                elapsed_ms: slot.elapsed.map(millis),
                outputs: slot.outputs,
            })
            .collect();

        RunReport {
            run_id,
            pipeline: pipeline.name().to_owned(),
            status,
            started_at,
            finished_at: Timestamp::now(),
            nodes,
            sink_outputs,
        }
    }
}
