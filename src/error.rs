use crate::state::State;
use itertools::Itertools;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased pointer to an arbitrary error, used to transport causes from
/// user code (lifecycle hooks, value coercions) without imposing a concrete
/// error type.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Errors related to loading and binding configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot parse value '{value}' of config parameter '{name}' in component '{component}' as {expected}: {source}")]
    Coercion {
        component: &'static str,
        name: &'static str,
        value: String,
        expected: &'static str,
        source: ErrorPtr,
    },
    #[error("error loading settings from '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to building and managing the component container.
#[derive(Error, Debug)]
pub enum InjectorError {
    #[error("could not find any default constructor for component '{0}'")]
    NoDefaultConstructor(&'static str),
    #[error("could not find any installed implementation of '{0}'")]
    MissingImplementation(&'static str),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("{}", stuck_graph_message(.stalled, .cycle.as_deref()))]
    StuckGraph {
        stalled: Vec<StalledComponent>,
        cycle: Option<Vec<&'static str>>,
    },
    #[error("lifecycle hook '{hook}' on component '{component}' failed: {source}")]
    HookInvocation {
        component: &'static str,
        hook: &'static str,
        source: ErrorPtr,
    },
    #[error("component '{component}' cannot be downcast to the requested type '{requested}'")]
    IncompatibleComponent {
        component: &'static str,
        requested: &'static str,
    },
}

/// A component the lifecycle engine could not advance, together with the state
/// it stalled in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StalledComponent {
    pub component: &'static str,
    pub state: State,
}

impl Display for StalledComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.component, self.state)
    }
}

fn stuck_graph_message(stalled: &[StalledComponent], cycle: Option<&[&'static str]>) -> String {
    let mut message = format!(
        "injector appears to be stuck in an infinite loop; the following components have not advanced: {}",
        stalled.iter().join(", ")
    );

    if let Some(cycle) = cycle {
        message.push_str(&format!(
            "; dependency cycle crossing a state boundary: {}",
            cycle.iter().join(" -> ")
        ));
    }

    message
}
