//! The staged state machine driving every managed component from
//! [Created](crate::state::State::Created) to
//! [Started](crate::state::State::Started) at build time, and to
//! [Stopped](crate::state::State::Stopped) on shutdown.
//!
//! Each pass sweeps the nodes in creation order and advances every node whose
//! dependencies satisfy the readiness predicate by exactly one state, running
//! the hooks registered for the entered state. A pass that advances nothing
//! while work remains means the graph can never converge and fails the build.

use crate::error::{InjectorError, StalledComponent};
use crate::graph;
use crate::graph::DependencyNode;
use crate::injector::Injector;
use crate::state::State;
use tracing::debug;

const START_TARGETS: [State; 3] = [State::Initialized, State::Resolved, State::Started];

/// Advances every node to [State::Started], one target state at a time.
pub(crate) fn start(injector: &Injector) -> Result<(), InjectorError> {
    for target in START_TARGETS {
        advance_to(injector, target)?;
    }

    debug!(
        "all {} components have been configured",
        injector.nodes().len()
    );

    Ok(())
}

/// Drives every node straight from its current state to [State::Stopped].
/// Nodes already stopped stay stopped.
pub(crate) fn stop(injector: &Injector) -> Result<(), InjectorError> {
    let nodes = injector.nodes();

    loop {
        let unfinished: Vec<usize> = (0..nodes.len())
            .filter(|&index| nodes[index].state.load() != State::Stopped)
            .collect();

        if unfinished.is_empty() {
            return Ok(());
        }

        let mut progressed = false;

        for &index in &unfinished {
            if graph::can_advance(nodes, index, State::Stopped) {
                run_hooks(injector, index, State::Stopped)?;
                transition(&nodes[index], State::Stopped);
                progressed = true;
            }
        }

        if !progressed {
            return Err(stuck(nodes, &unfinished));
        }
    }
}

fn advance_to(injector: &Injector, target: State) -> Result<(), InjectorError> {
    let nodes = injector.nodes();

    loop {
        let unfinished: Vec<usize> = (0..nodes.len())
            .filter(|&index| nodes[index].state.load() < target)
            .collect();

        if unfinished.is_empty() {
            return Ok(());
        }

        let mut progressed = false;

        for &index in &unfinished {
            let Some(next) = nodes[index].state.load().next() else {
                continue;
            };

            if graph::can_advance(nodes, index, next) {
                run_hooks(injector, index, next)?;
                transition(&nodes[index], next);
                progressed = true;
            }
        }

        if !progressed {
            return Err(stuck(nodes, &unfinished));
        }
    }
}

fn run_hooks(injector: &Injector, index: usize, state: State) -> Result<(), InjectorError> {
    let node = &injector.nodes()[index];

    for hook in node.metadata.hooks().iter().filter(|hook| hook.state == state) {
        debug!(
            "-> {}#{}",
            node.metadata.type_name(),
            hook.name
        );

        (hook.invoke)(node.instance.as_ref(), injector).map_err(|source| {
            InjectorError::HookInvocation {
                component: node.metadata.type_name(),
                hook: hook.name,
                source,
            }
        })?;
    }

    Ok(())
}

fn transition(node: &DependencyNode, state: State) {
    node.state.store(state);
    debug!("{} {}", node.metadata.type_name(), state);
}

fn stuck(nodes: &[DependencyNode], unfinished: &[usize]) -> InjectorError {
    let stalled = unfinished
        .iter()
        .map(|&index| StalledComponent {
            component: nodes[index].metadata.type_name(),
            state: nodes[index].state.load(),
        })
        .collect();

    InjectorError::StuckGraph {
        stalled,
        cycle: graph::find_state_cycle(nodes, unfinished),
    }
}
