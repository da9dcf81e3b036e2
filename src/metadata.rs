//! Per-type descriptor tables, the stand-in for runtime reflection.
//!
//! A [ComponentMetadata] describes everything the container needs to know
//! about a component type: its ancestors (the types its instances can be
//! looked up as), its injected fields, its configuration points, and its
//! lifecycle hooks. Descriptors are assembled with the typed
//! [ComponentMetadataBuilder], which erases the component type behind plain
//! function pointers and boxed closures so the container can work with a
//! heterogeneous set of them.

use crate::component::{Component, ComponentInstanceAnyPtr, ComponentInstancePtr, Dep, ErrorPtr};
use crate::error::{ConfigError, InjectorError};
use crate::injector::Injector;
use crate::properties::FromConfigValue;
use crate::state::State;
use derivative::Derivative;
use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Cast function which converts a type-erased instance pointer into a `Box`
/// containing a [ComponentInstancePtr] for one of the instance's ancestor
/// types. Since unsized coercions cannot be written generically, every
/// ancestor entry carries its own cast, usually created with
/// [cast_to!](crate::cast_to).
pub type CastFunction =
    fn(instance: ComponentInstanceAnyPtr) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr>;

/// Constructor for the mutable pre-publication form of an instance.
/// Configuration binding runs against this form, before the instance is
/// shared.
pub type ConstructorFunction = fn() -> Box<dyn Any>;

pub(crate) type SealFunction =
    fn(instance: Box<dyn Any>) -> Result<ComponentInstanceAnyPtr, InjectorError>;

pub(crate) type AssignFunction =
    Box<dyn Fn(&(dyn Any + Send + Sync), &Injector) -> Result<(), InjectorError> + Send + Sync>;

pub(crate) type ApplyFunction =
    Box<dyn Fn(&mut dyn Any, &str) -> Result<(), InjectorError> + Send + Sync>;

pub(crate) type HookFunction =
    Box<dyn Fn(&(dyn Any + Send + Sync), &Injector) -> Result<(), ErrorPtr> + Send + Sync>;

/// A canonical registration key declared by an ancestor, together with its
/// overwrite policy. Registering a type whose ancestor declares a key with
/// `overwrite = true` clears previous registrations under that key; with
/// `overwrite = false` previous registrations remain resolvable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InjectKey {
    pub name: &'static str,
    pub overwrite: bool,
}

/// One entry of a component's ancestor set: the component type itself, or a
/// supertrait its instances can be looked up as.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AncestorMetadata {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub inject_key: Option<InjectKey>,
    #[derivative(Debug = "ignore")]
    pub(crate) cast: CastFunction,
}

/// An injected field declaration. The dependency must have reached
/// `with_state` (or merely exist, when absent) before the owning component may
/// advance. A field without a state annotation is optional: when no
/// implementation is available it is simply left unwired.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct InjectionPoint {
    pub field: &'static str,
    pub target_id: TypeId,
    pub target_name: &'static str,
    pub with_state: Option<State>,
    #[derivative(Debug = "ignore")]
    pub(crate) assign: AssignFunction,
}

/// A configuration point declaration: the property name, the declared default
/// and the coercion into the field.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ConfigPoint {
    pub name: &'static str,
    pub default: &'static str,
    #[derivative(Debug = "ignore")]
    pub(crate) apply: ApplyFunction,
}

/// A dependency declared by a lifecycle hook parameter.
#[derive(Clone, Copy, Debug)]
pub struct HookDependency {
    pub target_id: TypeId,
    pub target_name: &'static str,
    pub with_state: Option<State>,
}

impl HookDependency {
    /// A parameter dependency which merely has to exist.
    pub fn on<U: ?Sized + 'static>() -> Self {
        Self {
            target_id: TypeId::of::<U>(),
            target_name: type_name::<U>(),
            with_state: None,
        }
    }

    /// A parameter dependency which must have reached the given state.
    pub fn with_state<U: ?Sized + 'static>(state: State) -> Self {
        Self {
            with_state: Some(state),
            ..Self::on::<U>()
        }
    }
}

/// A lifecycle hook: a method invoked when the owning component transitions
/// into `state`. Parameters are resolved through the container at invocation
/// time; their declarations feed the dependency graph.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct LifecycleHook {
    pub state: State,
    pub name: &'static str,
    pub dependencies: Vec<HookDependency>,
    #[derivative(Debug = "ignore")]
    pub(crate) invoke: HookFunction,
}

/// The full descriptor of a component type.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ComponentMetadata {
    type_id: TypeId,
    type_name: &'static str,
    ancestors: Vec<AncestorMetadata>,
    injection_points: Vec<InjectionPoint>,
    config_points: Vec<ConfigPoint>,
    hooks: Vec<LifecycleHook>,
    #[derivative(Debug = "ignore")]
    constructor: Option<ConstructorFunction>,
    #[derivative(Debug = "ignore")]
    seal: SealFunction,
}

impl ComponentMetadata {
    /// Starts a descriptor for a type constructible by the container via
    /// [Default].
    pub fn for_component<T: Component + Default>() -> ComponentMetadataBuilder<T> {
        let mut builder = Self::for_type::<T>();
        builder.metadata.constructor = Some(construct::<T>);
        builder
    }

    /// Starts a descriptor for a type the container cannot construct itself.
    /// Such a type can be wired with
    /// [Injector::inject](crate::injector::Injector::inject), but registering
    /// it for construction fails the build with a no-default-constructor
    /// error.
    pub fn for_type<T: Send + Sync + 'static>() -> ComponentMetadataBuilder<T> {
        ComponentMetadataBuilder {
            metadata: ComponentMetadata {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                ancestors: vec![AncestorMetadata {
                    type_id: TypeId::of::<T>(),
                    type_name: type_name::<T>(),
                    inject_key: None,
                    cast: self_cast::<T>,
                }],
                injection_points: Vec::new(),
                config_points: Vec::new(),
                hooks: Vec::new(),
                constructor: None,
                seal: seal::<T>,
            },
            _component: PhantomData,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The ancestor set, the component type itself first.
    #[inline]
    pub fn ancestors(&self) -> &[AncestorMetadata] {
        &self.ancestors
    }

    #[inline]
    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    #[inline]
    pub fn config_points(&self) -> &[ConfigPoint] {
        &self.config_points
    }

    #[inline]
    pub fn hooks(&self) -> &[LifecycleHook] {
        &self.hooks
    }

    /// Looks up the ancestor entry for the given type, if instances of this
    /// component are assignable to it.
    pub fn ancestor(&self, type_id: TypeId) -> Option<&AncestorMetadata> {
        self.ancestors
            .iter()
            .find(|ancestor| ancestor.type_id == type_id)
    }

    #[inline]
    pub fn is_assignable_to(&self, type_id: TypeId) -> bool {
        self.ancestor(type_id).is_some()
    }

    pub(crate) fn constructor(&self) -> Option<ConstructorFunction> {
        self.constructor
    }

    pub(crate) fn seal(&self) -> SealFunction {
        self.seal
    }
}

fn construct<T: Default + Send + Sync + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

fn self_cast<T: Send + Sync + 'static>(
    instance: ComponentInstanceAnyPtr,
) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr> {
    instance
        .downcast::<T>()
        .map(|instance| Box::new(instance) as Box<dyn Any>)
}

fn seal<T: Send + Sync + 'static>(
    instance: Box<dyn Any>,
) -> Result<ComponentInstanceAnyPtr, InjectorError> {
    instance
        .downcast::<T>()
        .map(|instance| ComponentInstancePtr::new(*instance) as ComponentInstanceAnyPtr)
        .map_err(|_| InjectorError::IncompatibleComponent {
            component: type_name::<T>(),
            requested: type_name::<T>(),
        })
}

/// Typed builder for [ComponentMetadata]. The type parameter pins every
/// declaration to the component type, so accessors stay strongly typed while
/// the finished descriptor is fully erased.
pub struct ComponentMetadataBuilder<T> {
    metadata: ComponentMetadata,
    _component: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ComponentMetadataBuilder<T> {
    /// Declares an inject-key on the component type itself.
    pub fn self_key<K: ?Sized + 'static>(mut self, overwrite: bool) -> Self {
        self.metadata.ancestors[0].inject_key = Some(InjectKey {
            name: type_name::<K>(),
            overwrite,
        });
        self
    }

    /// Declares an ancestor: a supertrait instances of this component can be
    /// looked up as.
    pub fn implements<U: ?Sized + 'static>(mut self, cast: CastFunction) -> Self {
        self.metadata.ancestors.push(AncestorMetadata {
            type_id: TypeId::of::<U>(),
            type_name: type_name::<U>(),
            inject_key: None,
            cast,
        });
        self
    }

    /// Declares an ancestor which carries an inject-key naming `K` as the
    /// canonical registration key.
    pub fn implements_keyed<U: ?Sized + 'static, K: ?Sized + 'static>(
        mut self,
        overwrite: bool,
        cast: CastFunction,
    ) -> Self {
        self.metadata.ancestors.push(AncestorMetadata {
            type_id: TypeId::of::<U>(),
            type_name: type_name::<U>(),
            inject_key: Some(InjectKey {
                name: type_name::<K>(),
                overwrite,
            }),
            cast,
        });
        self
    }

    /// Declares an injected field, selected by `accessor`. The dependency is
    /// optional unless `with_state` is given, in which case it is required
    /// and must have reached the state before the component advances.
    pub fn inject_field<U: ?Sized + 'static>(
        mut self,
        field: &'static str,
        with_state: Option<State>,
        accessor: fn(&T) -> &Dep<U>,
    ) -> Self {
        let required = with_state.is_some();
        self.metadata.injection_points.push(InjectionPoint {
            field,
            target_id: TypeId::of::<U>(),
            target_name: type_name::<U>(),
            with_state,
            assign: Box::new(move |instance, injector| {
                let component = instance.downcast_ref::<T>().ok_or(
                    InjectorError::IncompatibleComponent {
                        component: type_name::<T>(),
                        requested: type_name::<U>(),
                    },
                )?;

                if let Some(dependency) = injector.find::<U>(required)? {
                    accessor(component).wire(dependency);
                }

                Ok(())
            }),
        });
        self
    }

    /// Declares a configuration point bound to the field selected by
    /// `accessor`, coerced from the effective property value.
    pub fn config_field<V: FromConfigValue>(
        mut self,
        name: &'static str,
        default: &'static str,
        accessor: fn(&mut T) -> &mut V,
    ) -> Self {
        self.metadata.config_points.push(ConfigPoint {
            name,
            default,
            apply: Box::new(move |instance, raw| {
                let component = instance.downcast_mut::<T>().ok_or(
                    InjectorError::IncompatibleComponent {
                        component: type_name::<T>(),
                        requested: type_name::<V>(),
                    },
                )?;

                *accessor(component) =
                    V::from_config_value(raw).map_err(|source| ConfigError::Coercion {
                        component: type_name::<T>(),
                        name,
                        value: raw.to_string(),
                        expected: type_name::<V>(),
                        source,
                    })?;

                Ok(())
            }),
        });
        self
    }

    /// Declares a lifecycle hook invoked when the component transitions into
    /// `state`. `dependencies` lists the hook's parameters for the dependency
    /// graph; `body` resolves them through the container when invoked.
    pub fn execute_before(
        mut self,
        state: State,
        name: &'static str,
        dependencies: Vec<HookDependency>,
        body: fn(&T, &Injector) -> Result<(), ErrorPtr>,
    ) -> Self {
        self.metadata.hooks.push(LifecycleHook {
            state,
            name,
            dependencies,
            invoke: Box::new(move |instance, injector| {
                let component = instance.downcast_ref::<T>().ok_or_else(|| {
                    Arc::new(InjectorError::IncompatibleComponent {
                        component: type_name::<T>(),
                        requested: type_name::<T>(),
                    }) as ErrorPtr
                })?;

                body(component, injector)
            }),
        });
        self
    }

    pub fn build(self) -> ComponentMetadata {
        self.metadata
    }
}

/// Creates a [CastFunction] from a concrete component type to one of its
/// ancestor (trait) types. The unsized coercion has to be spelled with both
/// types concrete, which is exactly what this macro does:
///
/// ```
/// use stagewire::cast_to;
/// use stagewire::component::Component;
/// use stagewire::metadata::ComponentMetadata;
///
/// trait Greeter: Send + Sync {}
///
/// #[derive(Default)]
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {}
///
/// impl Component for EnglishGreeter {
///     fn metadata() -> ComponentMetadata {
///         ComponentMetadata::for_component::<Self>()
///             .implements::<dyn Greeter>(cast_to!(EnglishGreeter => dyn Greeter))
///             .build()
///     }
/// }
/// ```
#[macro_export]
macro_rules! cast_to {
    ($component:ty => $ancestor:ty) => {
        |instance: $crate::component::ComponentInstanceAnyPtr| {
            instance
                .downcast::<$component>()
                .map(|instance| {
                    Box::new(instance as $crate::component::ComponentInstancePtr<$ancestor>)
                        as Box<dyn ::std::any::Any>
                })
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::cast_to;
    use crate::component::{Component, ComponentInstanceAnyPtr, ComponentInstancePtr, Dep};
    use crate::metadata::ComponentMetadata;
    use crate::state::State;
    use std::any::TypeId;

    trait TestTrait: Send + Sync {}

    #[derive(Default)]
    struct TestDependency;

    impl TestTrait for TestDependency {}

    impl Component for TestDependency {
        fn metadata() -> ComponentMetadata {
            ComponentMetadata::for_component::<Self>()
                .implements::<dyn TestTrait>(cast_to!(TestDependency => dyn TestTrait))
                .build()
        }
    }

    #[derive(Default)]
    struct TestComponent {
        dependency: Dep<dyn TestTrait>,
    }

    impl Component for TestComponent {
        fn metadata() -> ComponentMetadata {
            ComponentMetadata::for_component::<Self>()
                .inject_field("dependency", Some(State::Started), |component: &Self| {
                    &component.dependency
                })
                .build()
        }
    }

    #[test]
    fn should_describe_ancestors() {
        let metadata = TestDependency::metadata();

        assert_eq!(metadata.type_id(), TypeId::of::<TestDependency>());
        assert_eq!(metadata.ancestors().len(), 2);
        assert!(metadata.is_assignable_to(TypeId::of::<TestDependency>()));
        assert!(metadata.is_assignable_to(TypeId::of::<dyn TestTrait>()));
        assert!(!metadata.is_assignable_to(TypeId::of::<TestComponent>()));
    }

    #[test]
    fn should_describe_injection_points() {
        let metadata = TestComponent::metadata();

        assert_eq!(metadata.injection_points().len(), 1);
        let point = &metadata.injection_points()[0];
        assert_eq!(point.field, "dependency");
        assert_eq!(point.target_id, TypeId::of::<dyn TestTrait>());
        assert_eq!(point.with_state, Some(State::Started));
    }

    #[test]
    fn should_cast_through_ancestor_entry() {
        let metadata = TestDependency::metadata();
        let instance = ComponentInstancePtr::new(TestDependency) as ComponentInstanceAnyPtr;

        let ancestor = metadata.ancestor(TypeId::of::<dyn TestTrait>()).unwrap();
        let cast = (ancestor.cast)(instance).unwrap();
        assert!(cast
            .downcast::<ComponentInstancePtr<dyn TestTrait>>()
            .is_ok());
    }

    #[test]
    fn should_construct_through_descriptor() {
        let metadata = TestDependency::metadata();

        let constructor = metadata.constructor().unwrap();
        let instance = (metadata.seal())(constructor()).unwrap();
        assert!(instance.downcast::<TestDependency>().is_ok());
    }
}
