//! A dependency-injection container with a staged lifecycle engine.
//!
//! *Stagewire* accepts a set of component types, resolves the dependency
//! graph among their declared injection points, instantiates each component
//! exactly once, wires references and drives every component through an
//! ordered sequence of lifecycle states. Component fields marked as
//! configuration points are populated from a properties file (plus
//! programmatic overrides) with coercion to their declared scalar types.
//!
//! Since Rust has no runtime reflection, every component describes itself
//! through a [ComponentMetadata](metadata::ComponentMetadata) descriptor
//! assembled with a typed builder; the container only ever sees the erased
//! descriptor.
//!
//! ### Simple usage example
//!
//! ```
//! use stagewire::cast_to;
//! use stagewire::component::{Component, Dep};
//! use stagewire::injector::Injector;
//! use stagewire::metadata::ComponentMetadata;
//!
//! // a trait we would like to inject as an abstract dependency
//! trait TypeMapper: Send + Sync {}
//!
//! #[derive(Default)]
//! struct StringMapper;
//!
//! impl TypeMapper for StringMapper {}
//!
//! impl Component for StringMapper {
//!     fn metadata() -> ComponentMetadata {
//!         ComponentMetadata::for_component::<Self>()
//!             .implements::<dyn TypeMapper>(cast_to!(StringMapper => dyn TypeMapper))
//!             .build()
//!     }
//! }
//!
//! // another component, with a dependency wired by the container
//! #[derive(Default)]
//! struct MapperConsumer {
//!     mapper: Dep<dyn TypeMapper>,
//! }
//!
//! impl Component for MapperConsumer {
//!     fn metadata() -> ComponentMetadata {
//!         ComponentMetadata::for_component::<Self>()
//!             .inject_field("mapper", None, |component: &Self| &component.mapper)
//!             .build()
//!     }
//! }
//!
//! # fn main() -> Result<(), stagewire::error::InjectorError> {
//! let injector = Injector::builder()
//!     .put::<StringMapper>()
//!     .put::<MapperConsumer>()
//!     .build()?;
//!
//! let consumer = injector.get_or_throw::<MapperConsumer>()?;
//! assert!(consumer.mapper.is_wired());
//!
//! injector.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod error;
pub mod injector;
pub mod metadata;
pub mod properties;
pub mod state;

mod graph;
mod lifecycle;
mod registry;
