//! Keeps the tree projection, the flowchart projection and the reachability
//! cache consistent with one [`DialogGraph`].
//!
//! The synchronizer lives on the UI thread. Other threads talk to it through
//! a [`SyncHandle`]; their events queue up until the owner calls
//! [`Synchronizer::pump`].

use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc;

use tracing::{debug, warn};

use crate::graph::model::{DialogGraph, GraphError, ListId, NodeId, PtrId, RemoveOutcome};
use crate::graph::traverse;
use crate::projection::flowchart::{self, FlowchartData};
use crate::projection::state;
use crate::projection::tree::{ProjectionTree, StableKey};
use crate::reachability::{self, EvaluationOrder, GuardClassifier, StaticClassifier};

/// Work posted from another thread.
#[derive(Debug)]
pub enum SyncEvent {
    /// A graph finished loading and replaces the current one.
    Loaded(DialogGraph),
    /// A pointer's guard script was edited elsewhere.
    ConditionChanged {
        pointer: PtrId,
        script: Option<String>,
    },
    /// Classification inputs changed; recompute every list.
    Refresh,
}

/// Cloneable, `Send` sender for [`SyncEvent`]s.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Queue an event. Returns `false` if the synchronizer has been dropped.
    pub fn post(&self, event: SyncEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn condition_changed(&self, pointer: PtrId, script: Option<String>) -> bool {
        self.post(SyncEvent::ConditionChanged { pointer, script })
    }
}

pub struct Synchronizer<C = StaticClassifier> {
    graph: DialogGraph,
    projection: ProjectionTree,
    classifier: C,
    order: EvaluationOrder,
    expand_depth: usize,
    unreachable: HashMap<ListId, BTreeSet<usize>>,
    inbox: mpsc::Receiver<SyncEvent>,
    outbox: mpsc::Sender<SyncEvent>,
}

impl<C: GuardClassifier> Synchronizer<C> {
    pub fn new(classifier: C, order: EvaluationOrder) -> Self {
        let (outbox, inbox) = mpsc::channel();
        Self {
            graph: DialogGraph::new(),
            projection: ProjectionTree::default(),
            classifier,
            order,
            expand_depth: 1,
            unreachable: HashMap::new(),
            inbox,
            outbox,
        }
    }

    /// Depth to expand to after each load (root is depth 0).
    pub fn with_expand_depth(mut self, depth: usize) -> Self {
        self.expand_depth = depth;
        self
    }

    pub fn graph(&self) -> &DialogGraph {
        &self.graph
    }

    /// Direct graph access. Call [`Synchronizer::on_graph_mutated`] with the
    /// affected list afterwards.
    pub fn graph_mut(&mut self) -> &mut DialogGraph {
        &mut self.graph
    }

    pub fn projection(&self) -> &ProjectionTree {
        &self.projection
    }

    pub fn order(&self) -> EvaluationOrder {
        self.order
    }

    pub fn expand_depth(&self) -> usize {
        self.expand_depth
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            tx: self.outbox.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    /// Replace the graph and rebuild everything from scratch.
    ///
    /// Expansion starts at the configured depth and nothing is selected.
    pub fn on_graph_loaded(&mut self, graph: DialogGraph) {
        self.graph = graph;
        self.projection = ProjectionTree::build(&self.graph);
        state::expand_to_depth(&mut self.projection, self.expand_depth);
        self.recompute_all();
        debug!(
            nodes = self.graph.node_count(),
            rows = self.projection.len(),
            "graph loaded"
        );
    }

    /// Resync after a structural or guard edit to `affected`.
    ///
    /// Returns whether the previous selection survived the rebuild.
    pub fn on_graph_mutated(&mut self, affected: ListId) -> bool {
        self.unreachable
            .retain(|list, _| self.graph.contains_list(*list));
        if let Err(err) = self.recompute_reachability(affected) {
            // The affected list itself can be gone (its node was pruned).
            debug!(%affected, %err, "affected list not recomputed");
        }
        let previous = state::selected(&self.projection);
        self.rebuild_projection(previous).1
    }

    /// Rebuild the projection, carrying expansion over by stable key and
    /// reselecting `previous_selection` if it still exists.
    pub fn rebuild_projection(
        &mut self,
        previous_selection: Option<StableKey>,
    ) -> (&ProjectionTree, bool) {
        let snapshot = state::snapshot(&self.projection);
        let mut tree = ProjectionTree::build(&self.graph);
        let report = state::restore(&mut tree, &snapshot);
        let restored = state::restore_selection(&mut tree, previous_selection);
        for (list, indices) in &self.unreachable {
            tree.apply_unreachable(*list, indices);
        }
        debug!(
            rows = tree.len(),
            expanded = report.applied,
            stale = report.stale,
            restored,
            "rebuilt projection"
        );
        self.projection = tree;
        (&self.projection, restored)
    }

    /// Recompute and cache the unreachable siblings of `list`, updating the
    /// matching projection rows.
    pub fn recompute_reachability(&mut self, list: ListId) -> Result<BTreeSet<usize>, GraphError> {
        let indices =
            reachability::unreachable_in_list(&self.graph, list, &self.classifier, self.order)?;
        self.projection.apply_unreachable(list, &indices);
        debug!(%list, unreachable = indices.len(), "recomputed reachability");
        if indices.is_empty() {
            self.unreachable.remove(&list);
        } else {
            self.unreachable.insert(list, indices.clone());
        }
        Ok(indices)
    }

    /// Cached unreachable indices for `list` (empty when none are).
    pub fn unreachable(&self, list: ListId) -> BTreeSet<usize> {
        self.unreachable.get(&list).cloned().unwrap_or_default()
    }

    pub fn unreachable_lists(&self) -> &HashMap<ListId, BTreeSet<usize>> {
        &self.unreachable
    }

    pub fn expand_all(&mut self) {
        state::expand_all(&mut self.projection);
    }

    pub fn collapse_all(&mut self) {
        state::collapse_all(&mut self.projection);
    }

    pub fn toggle(&mut self, key: StableKey) -> Option<bool> {
        state::toggle(&mut self.projection, key)
    }

    pub fn select(&mut self, key: StableKey) -> bool {
        state::select(&mut self.projection, key)
    }

    /// Select the owning row of `node`, expanding its ancestors.
    ///
    /// This is how a click in the flowchart lands in the tree.
    pub fn select_node(&mut self, node: NodeId) -> bool {
        let Some(path) = traverse::ancestor_path(&self.graph, node) else {
            return false;
        };
        let Some(&ptr) = path.last() else {
            return false;
        };
        let key = StableKey::Pointer(ptr);
        state::reveal(&mut self.projection, key) && state::select(&mut self.projection, key)
    }

    /// Select the tree row a flowchart id stands for.
    ///
    /// Link ids select the link row itself; node ids select the owning row.
    pub fn select_flow_id(&mut self, id: &str) -> bool {
        if id == flowchart::ROOT_ID {
            return state::select(&mut self.projection, StableKey::Root);
        }
        if let Some(ptr) = flowchart::link_for_flow_id(&self.graph, id) {
            let key = StableKey::Pointer(ptr);
            return state::reveal(&mut self.projection, key)
                && state::select(&mut self.projection, key);
        }
        match flowchart::node_for_flow_id(&self.graph, id) {
            Some(node) => self.select_node(node),
            None => false,
        }
    }

    /// Flowchart id of the selected tree row.
    pub fn selected_flow_id(&self) -> Option<String> {
        let row = self.projection.get(state::selected(&self.projection)?)?;
        let Some(ptr) = row.pointer() else {
            return Some(flowchart::ROOT_ID.to_string());
        };
        if row.is_link() {
            return Some(flowchart::link_flow_id(ptr));
        }
        self.graph.node(row.node()?).map(flowchart::flow_id)
    }

    /// The flowchart projection, carrying the tree selection.
    pub fn flowchart(&self) -> FlowchartData {
        let mut data = flowchart::build(&self.graph, &self.unreachable);
        data.selected = self.selected_flow_id();
        data
    }

    pub fn set_order(&mut self, order: EvaluationOrder) {
        if self.order != order {
            self.order = order;
            self.recompute_all();
        }
    }

    pub fn set_classifier(&mut self, classifier: C) {
        self.classifier = classifier;
        self.recompute_all();
    }

    pub fn set_expand_depth(&mut self, depth: usize) {
        self.expand_depth = depth;
    }

    // -----------------------------------------------------------------------
    // Mutations that resync
    // -----------------------------------------------------------------------

    /// Add a child and select it.
    pub fn add_child(&mut self, parent: ListId, after: Option<usize>) -> Result<PtrId, GraphError> {
        let ptr = self.graph.add_child(parent, after)?;
        self.resync_selecting(parent, ptr);
        Ok(ptr)
    }

    /// Add a link and select it.
    pub fn add_link(
        &mut self,
        parent: ListId,
        target: NodeId,
        after: Option<usize>,
    ) -> Result<PtrId, GraphError> {
        let ptr = self.graph.add_link(parent, target, after)?;
        self.resync_selecting(parent, ptr);
        Ok(ptr)
    }

    pub fn remove_pointer(
        &mut self,
        parent: ListId,
        pointer: PtrId,
    ) -> Result<RemoveOutcome, GraphError> {
        let outcome = self.graph.remove_pointer(parent, pointer)?;
        self.on_graph_mutated(parent);
        Ok(outcome)
    }

    /// Change a guard and return the new unreachable set of its list.
    pub fn set_condition(
        &mut self,
        pointer: PtrId,
        script: Option<String>,
    ) -> Result<BTreeSet<usize>, GraphError> {
        let list = self.graph.set_condition(pointer, script)?;
        self.on_graph_mutated(list);
        Ok(self.unreachable(list))
    }

    /// Apply every queued [`SyncEvent`]. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.inbox.try_recv() {
            match event {
                SyncEvent::Loaded(graph) => self.on_graph_loaded(graph),
                SyncEvent::ConditionChanged { pointer, script } => {
                    if let Err(err) = self.set_condition(pointer, script) {
                        warn!(%pointer, %err, "dropped condition change");
                        continue;
                    }
                }
                SyncEvent::Refresh => self.recompute_all(),
            }
            applied += 1;
        }
        applied
    }

    fn resync_selecting(&mut self, parent: ListId, ptr: PtrId) {
        if let Err(err) = self.recompute_reachability(parent) {
            debug!(%parent, %err, "parent list not recomputed");
        }
        let key = StableKey::Pointer(ptr);
        self.rebuild_projection(Some(key));
        state::reveal(&mut self.projection, key);
    }

    fn recompute_all(&mut self) {
        self.unreachable.clear();
        for list in traverse::owned_lists(&self.graph) {
            if let Err(err) = self.recompute_reachability(list) {
                debug!(%list, %err, "skipped list");
            }
        }
    }
}
