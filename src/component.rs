//! Base traits and types for injectable components.
//!
//! A component is a type owned and wired by the [Injector](crate::injector::Injector).
//! Since Rust has no runtime reflection, a component describes its own
//! injection points, configuration points and lifecycle hooks through a
//! [ComponentMetadata](crate::metadata::ComponentMetadata) descriptor, built
//! with the typed builder:
//!
//! ```
//! use stagewire::component::{Component, Dep};
//! use stagewire::metadata::ComponentMetadata;
//!
//! #[derive(Default)]
//! struct TestDependency;
//!
//! impl Component for TestDependency {
//!     fn metadata() -> ComponentMetadata {
//!         ComponentMetadata::for_component::<Self>().build()
//!     }
//! }
//!
//! // this component declares a dependency, wired by the container after every
//! // instance exists, so mutual references are fine
//! #[derive(Default)]
//! struct TestComponent {
//!     dependency: Dep<TestDependency>,
//! }
//!
//! impl Component for TestComponent {
//!     fn metadata() -> ComponentMetadata {
//!         ComponentMetadata::for_component::<Self>()
//!             .inject_field("dependency", None, |component: &Self| &component.dependency)
//!             .build()
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

pub use crate::error::ErrorPtr;

/// Pointer to a component instance shared between the container and all
/// dependent components.
pub type ComponentInstancePtr<T> = Arc<T>;

/// Type-erased [ComponentInstancePtr].
pub type ComponentInstanceAnyPtr = ComponentInstancePtr<dyn Any + Send + Sync + 'static>;

/// Base trait for types managed by the container. The descriptor returned by
/// [Component::metadata] is the container's only view of the type; see the
/// module documentation for how to assemble one.
pub trait Component: Send + Sync + 'static {
    /// Returns the descriptor for this component type.
    fn metadata() -> crate::metadata::ComponentMetadata;
}

/// A group of components which are commonly installed together. Bundles are
/// registered with
/// [InjectorBuilder::put_bundle](crate::injector::InjectorBuilder::put_bundle),
/// which registers every enumerated descriptor as if it was `put` directly.
pub trait InjectBundle {
    /// Enumerates the descriptors of all components in this bundle.
    fn injectables() -> Vec<crate::metadata::ComponentMetadata>;
}

/// An injected field. The container assigns the cell after every component
/// instance has been created, which is what makes cyclic references between
/// components possible. A field left unwired (no implementation was available
/// and the dependency was not state-annotated) reads as `None`.
pub struct Dep<T: ?Sized>(OnceLock<ComponentInstancePtr<T>>);

impl<T: ?Sized> Dep<T> {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Borrows the wired instance, if any.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.0.get().map(|instance| instance.as_ref())
    }

    /// Clones the wired instance pointer, if any.
    #[inline]
    pub fn instance(&self) -> Option<ComponentInstancePtr<T>> {
        self.0.get().cloned()
    }

    #[inline]
    pub fn is_wired(&self) -> bool {
        self.0.get().is_some()
    }

    /// Assigns the cell. The first assignment wins; later ones are ignored.
    pub fn wire(&self, instance: ComponentInstancePtr<T>) {
        let _ = self.0.set(instance);
    }
}

impl<T: ?Sized> Default for Dep<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Debug for Dep<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_wired() {
            f.write_str("Dep(<wired>)")
        } else {
            f.write_str("Dep(<unwired>)")
        }
    }
}
