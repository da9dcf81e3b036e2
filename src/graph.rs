//! The dependency graph the lifecycle engine advances: one node per
//! instantiated component, one edge per injected field or lifecycle-hook
//! parameter. Each edge carries the minimum state its target must have
//! reached before the owning node may advance.

use crate::component::ComponentInstanceAnyPtr;
use crate::metadata::ComponentMetadata;
use crate::state::{AtomicState, State};
use derivative::Derivative;
use fxhash::FxHashSet;
use std::any::TypeId;
use std::sync::Arc;

/// A managed component: its descriptor, its erased instance and its current
/// lifecycle state.
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct DependencyNode {
    pub(crate) metadata: Arc<ComponentMetadata>,
    #[derivative(Debug = "ignore")]
    pub(crate) instance: ComponentInstanceAnyPtr,
    pub(crate) state: AtomicState,
    pub(crate) edges: Vec<DependencyEdge>,
}

impl DependencyNode {
    pub(crate) fn new(metadata: Arc<ComponentMetadata>, instance: ComponentInstanceAnyPtr) -> Self {
        Self {
            metadata,
            instance,
            state: AtomicState::new(State::Created),
            edges: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DependencyEdge {
    pub(crate) target: usize,
    pub(crate) min_state: State,
    pub(crate) origin: EdgeOrigin,
}

/// Where an edge comes from. Field edges constrain every transition of the
/// owning node; hook-parameter edges only constrain transitions up to and
/// including the hook's target state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum EdgeOrigin {
    Field,
    Hook(State),
}

/// Resolves every node's edges against the node list. Edge targets are the
/// first node in creation order whose type is assignable to the declared
/// dependency type; declarations with no assignable node produce no edge
/// (required ones fail later, during wiring or hook invocation).
pub(crate) fn resolve_edges(nodes: &mut [DependencyNode]) {
    let view: &[DependencyNode] = nodes;
    let resolved: Vec<Vec<DependencyEdge>> = view
        .iter()
        .map(|node| {
            let mut edges = Vec::new();

            for point in node.metadata.injection_points() {
                if let Some(target) = first_assignable(view, point.target_id) {
                    edges.push(DependencyEdge {
                        target,
                        min_state: point.with_state.unwrap_or(State::Created),
                        origin: EdgeOrigin::Field,
                    });
                }
            }

            for hook in node.metadata.hooks() {
                for dependency in &hook.dependencies {
                    if let Some(target) = first_assignable(view, dependency.target_id) {
                        edges.push(DependencyEdge {
                            target,
                            min_state: dependency.with_state.unwrap_or(State::Created),
                            origin: EdgeOrigin::Hook(hook.state),
                        });
                    }
                }
            }

            edges
        })
        .collect();

    for (node, edges) in nodes.iter_mut().zip(resolved) {
        node.edges = edges;
    }
}

fn first_assignable(nodes: &[DependencyNode], target: TypeId) -> Option<usize> {
    nodes
        .iter()
        .position(|node| node.metadata.is_assignable_to(target))
}

/// The readiness predicate: whether the node at `index` may advance to
/// `target`, i.e. whether every relevant edge's dependency has reached the
/// edge's minimum state.
pub(crate) fn can_advance(nodes: &[DependencyNode], index: usize, target: State) -> bool {
    nodes[index]
        .edges
        .iter()
        .filter(|edge| match edge.origin {
            EdgeOrigin::Field => true,
            EdgeOrigin::Hook(state) => state <= target,
        })
        .all(|edge| nodes[edge.target].state.load() >= edge.min_state)
}

/// Searches the stalled subgraph for a cycle across edges requiring more than
/// mere existence. Such a cycle can never be satisfied and is the usual cause
/// of a stuck lifecycle engine.
pub(crate) fn find_state_cycle(
    nodes: &[DependencyNode],
    stalled: &[usize],
) -> Option<Vec<&'static str>> {
    let stalled_set: FxHashSet<usize> = stalled.iter().copied().collect();
    let mut visited = FxHashSet::default();

    for &start in stalled {
        if visited.contains(&start) {
            continue;
        }

        let mut path = Vec::new();
        if let Some(cycle) = visit(nodes, &stalled_set, &mut visited, &mut path, start) {
            return Some(
                cycle
                    .iter()
                    .map(|&index| nodes[index].metadata.type_name())
                    .collect(),
            );
        }
    }

    None
}

fn visit(
    nodes: &[DependencyNode],
    stalled: &FxHashSet<usize>,
    visited: &mut FxHashSet<usize>,
    path: &mut Vec<usize>,
    current: usize,
) -> Option<Vec<usize>> {
    if let Some(position) = path.iter().position(|&index| index == current) {
        let mut cycle = path[position..].to_vec();
        cycle.push(current);
        return Some(cycle);
    }

    if !visited.insert(current) {
        return None;
    }

    path.push(current);
    for edge in &nodes[current].edges {
        if edge.min_state > State::Created && stalled.contains(&edge.target) {
            if let Some(cycle) = visit(nodes, stalled, visited, path, edge.target) {
                return Some(cycle);
            }
        }
    }
    path.pop();

    None
}
