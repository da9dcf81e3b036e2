//! The container itself and its builder facade.
//!
//! [InjectorBuilder] collects registrations, configuration overrides and the
//! properties file location; [InjectorBuilder::build] materializes the
//! container atomically: every registered type is instantiated and
//! configuration-bound, fields are wired once every instance exists, and the
//! lifecycle engine advances all components to
//! [Started](crate::state::State::Started). Any failure along the way aborts
//! the whole build and no container is returned.

use crate::component::{Component, ComponentInstanceAnyPtr, ComponentInstancePtr, InjectBundle};
use crate::error::InjectorError;
use crate::graph;
use crate::graph::DependencyNode;
use crate::lifecycle;
use crate::metadata::ComponentMetadata;
use crate::properties::{Properties, CONFIG_FILE};
use crate::state::State;
use fxhash::FxHashMap;
use itertools::Either;
use std::any::{type_name, Any, TypeId};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::debug;

/// The immutable component container. Owns one instance per registered
/// component type and answers lookups by assignability in creation order;
/// the container itself is injectable as a dependency.
#[derive(Debug)]
pub struct Injector {
    nodes: Vec<DependencyNode>,
    weak_self: Weak<Injector>,
}

impl Injector {
    /// Creates a new builder with the default configuration.
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Returns the first instance assignable to `T` in creation order, if
    /// any.
    pub fn get<T: ?Sized + 'static>(&self) -> Option<ComponentInstancePtr<T>> {
        self.find::<T>(false).ok().flatten()
    }

    /// Returns the first instance assignable to `T` in creation order, or a
    /// missing-implementation error.
    pub fn get_or_throw<T: ?Sized + 'static>(
        &self,
    ) -> Result<ComponentInstancePtr<T>, InjectorError> {
        match self.find::<T>(true)? {
            Some(instance) => Ok(instance),
            None => Err(InjectorError::MissingImplementation(type_name::<T>())),
        }
    }

    /// Lazily yields every instance assignable to `T`, in creation order.
    pub fn stream<T: ?Sized + 'static>(
        &self,
    ) -> impl Iterator<Item = ComponentInstancePtr<T>> + '_ {
        if TypeId::of::<T>() == TypeId::of::<Injector>() {
            Either::Left(self.self_instance::<T>().into_iter())
        } else {
            Either::Right(self.nodes.iter().filter_map(|node| cast_node::<T>(node)))
        }
    }

    /// Lazily yields the descriptors of all managed component types, in
    /// creation order.
    pub fn injectables(&self) -> impl Iterator<Item = &ComponentMetadata> + '_ {
        self.nodes.iter().map(|node| node.metadata.as_ref())
    }

    /// Wires the injected fields of a caller-owned component with this
    /// container's instances.
    pub fn inject<T: Component>(&self, instance: &T) -> Result<(), InjectorError> {
        let metadata = T::metadata();

        for point in metadata.injection_points() {
            (point.assign)(instance as &(dyn Any + Send + Sync), self)?;
        }

        Ok(())
    }

    /// Drives every component to [Stopped](State::Stopped), invoking the
    /// hooks registered for that state. Must not be called concurrently with
    /// lookups.
    pub fn stop(&self) -> Result<(), InjectorError> {
        lifecycle::stop(self)
    }

    pub(crate) fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    /// Resolves a single instance assignable to `T`. Requests for the
    /// container type itself resolve to the container.
    pub(crate) fn find<T: ?Sized + 'static>(
        &self,
        required: bool,
    ) -> Result<Option<ComponentInstancePtr<T>>, InjectorError> {
        if TypeId::of::<T>() == TypeId::of::<Injector>() {
            if let Some(instance) = self.self_instance::<T>() {
                return Ok(Some(instance));
            }
        }

        for node in &self.nodes {
            if let Some(ancestor) = node.metadata.ancestor(TypeId::of::<T>()) {
                let incompatible = || InjectorError::IncompatibleComponent {
                    component: node.metadata.type_name(),
                    requested: type_name::<T>(),
                };

                let cast = (ancestor.cast)(node.instance.clone()).map_err(|_| incompatible())?;
                let instance = cast
                    .downcast::<ComponentInstancePtr<T>>()
                    .map_err(|_| incompatible())?;

                return Ok(Some(*instance));
            }
        }

        if required {
            Err(InjectorError::MissingImplementation(type_name::<T>()))
        } else {
            Ok(None)
        }
    }

    fn self_instance<T: ?Sized + 'static>(&self) -> Option<ComponentInstancePtr<T>> {
        self.weak_self.upgrade().and_then(|this| {
            (Box::new(this) as Box<dyn Any>)
                .downcast::<ComponentInstancePtr<T>>()
                .ok()
                .map(|instance| *instance)
        })
    }
}

fn cast_node<T: ?Sized + 'static>(node: &DependencyNode) -> Option<ComponentInstancePtr<T>> {
    node.metadata.ancestor(TypeId::of::<T>()).and_then(|ancestor| {
        (ancestor.cast)(node.instance.clone())
            .ok()
            .and_then(|cast| cast.downcast::<ComponentInstancePtr<T>>().ok())
            .map(|instance| *instance)
    })
}

/// Builder for [Injector] instances. Collects component registrations,
/// configuration overrides and the properties file location.
pub struct InjectorBuilder {
    registry: crate::registry::ComponentRegistry,
    overridden_params: FxHashMap<String, String>,
    config_file_location: PathBuf,
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self {
            registry: Default::default(),
            overridden_params: Default::default(),
            config_file_location: PathBuf::from(CONFIG_FILE),
        }
    }

    /// Registers a component type under its auto-derived keys: its own type
    /// name plus every inject-key declared along its ancestor set.
    pub fn put<T: Component>(mut self) -> Self {
        self.registry.put(Arc::new(T::metadata()));
        self
    }

    /// Registers a component type under an explicit key only.
    pub fn put_with_key<T: Component>(mut self, key: &str) -> Self {
        self.registry.put_with_key(key, Arc::new(T::metadata()));
        self
    }

    /// Registers every component enumerated by the given bundle.
    pub fn put_bundle<B: InjectBundle>(mut self) -> Self {
        for metadata in B::injectables() {
            self.registry.put(Arc::new(metadata));
        }
        self
    }

    /// Sets the location of the properties file (default
    /// [CONFIG_FILE](crate::properties::CONFIG_FILE)).
    pub fn with_config_file_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_location = path.into();
        self
    }

    /// Records a configuration override which beats the properties file.
    pub fn put_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overridden_params.insert(key.into(), value.into());
        self
    }

    /// Builds the container: instantiates and configures every registered
    /// type, wires dependencies and advances all components to
    /// [Started](State::Started).
    pub fn build(self) -> Result<Arc<Injector>, InjectorError> {
        let properties = Properties::load(&self.config_file_location)?;
        let finalized = self.registry.finalize();

        debug!("creating {} injectable instances", finalized.len());

        // instantiate back to front so the node list scans most recently
        // registered types first, which is what gives overwriting
        // registrations their "latest wins" lookup behavior
        let mut nodes = Vec::with_capacity(finalized.len());
        for metadata in finalized.into_iter().rev() {
            let instance = instantiate(&metadata, &properties, &self.overridden_params)?;
            nodes.push(DependencyNode::new(metadata, instance));
        }

        graph::resolve_edges(&mut nodes);

        let injector = Arc::new_cyclic(|weak_self| Injector {
            nodes,
            weak_self: weak_self.clone(),
        });

        // two-phase wiring: every instance exists by now, so mutual
        // references between components resolve without special treatment
        for node in injector.nodes() {
            for point in node.metadata.injection_points() {
                (point.assign)(node.instance.as_ref(), &injector)?;
            }
        }

        lifecycle::start(&injector)?;

        Ok(injector)
    }
}

fn instantiate(
    metadata: &ComponentMetadata,
    properties: &Properties,
    overrides: &FxHashMap<String, String>,
) -> Result<ComponentInstanceAnyPtr, InjectorError> {
    let constructor = metadata
        .constructor()
        .ok_or(InjectorError::NoDefaultConstructor(metadata.type_name()))?;

    let mut instance = constructor();
    debug!("{} {}", metadata.type_name(), State::Created);

    for point in metadata.config_points() {
        let value = overrides
            .get(point.name)
            .map(String::as_str)
            .or_else(|| properties.get(point.name))
            .unwrap_or(point.default);

        debug!(
            "binding config parameter '{}' = '{}' in {}",
            point.name,
            value,
            metadata.type_name()
        );

        (point.apply)(instance.as_mut(), value)?;
    }

    (metadata.seal())(instance)
}
