//! Accumulates component registrations under string keys and resolves the
//! final deduplicated set of component types to instantiate.
//!
//! Every key maps to a non-empty, insertion-ordered list of candidate
//! descriptors; the head of the list is the effective default for the key.
//! Re-registering a key moves it to the end of the registry's iteration
//! order, which is what makes the most recently registered default the first
//! one found by lookups after [finalize](ComponentRegistry::finalize).

use crate::metadata::ComponentMetadata;
use itertools::Itertools;
use std::sync::Arc;

#[derive(Debug)]
struct RegistryEntry {
    key: String,
    candidates: Vec<Arc<ComponentMetadata>>,
}

/// Registry of component descriptors keyed by type and inject-key names.
#[derive(Debug, Default)]
pub(crate) struct ComponentRegistry {
    entries: Vec<RegistryEntry>,
}

impl ComponentRegistry {
    /// Registers a descriptor under its auto-derived keys: the name of every
    /// ancestor which is the type itself or carries an inject-key, plus the
    /// key name declared by each keyed ancestor, honoring that key's
    /// overwrite policy.
    pub(crate) fn put(&mut self, metadata: Arc<ComponentMetadata>) {
        let type_id = metadata.type_id();
        let keyed_ancestors: Vec<_> = metadata
            .ancestors()
            .iter()
            .filter(|ancestor| ancestor.type_id == type_id || ancestor.inject_key.is_some())
            .map(|ancestor| (ancestor.type_name, ancestor.inject_key))
            .collect();

        for (name, inject_key) in keyed_ancestors {
            self.append(name, metadata.clone(), true);

            if let Some(key) = inject_key {
                self.append(key.name, metadata.clone(), key.overwrite);
            }
        }
    }

    /// Registers a descriptor under an explicit key only, clearing previous
    /// candidates for that key.
    pub(crate) fn put_with_key(&mut self, key: &str, metadata: Arc<ComponentMetadata>) {
        self.append(key, metadata, true);
    }

    fn append(&mut self, key: &str, metadata: Arc<ComponentMetadata>, overwrite: bool) {
        let mut candidates = self
            .entries
            .iter()
            .position(|entry| entry.key == key)
            .map(|index| self.entries.remove(index).candidates)
            .unwrap_or_default();

        if overwrite {
            candidates.clear();
        }

        candidates.push(metadata);
        self.entries.push(RegistryEntry {
            key: key.to_string(),
            candidates,
        });
    }

    /// Flattens the registry values in key order into a deduplicated list of
    /// distinct component types, keeping the first occurrence of each.
    pub(crate) fn finalize(&self) -> Vec<Arc<ComponentMetadata>> {
        self.entries
            .iter()
            .flat_map(|entry| entry.candidates.iter())
            .unique_by(|metadata| metadata.type_id())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::component::Component;
    use crate::metadata::ComponentMetadata;
    use crate::registry::ComponentRegistry;
    use crate::cast_to;
    use std::any::TypeId;
    use std::sync::Arc;

    trait Codec: Send + Sync {}

    #[derive(Default)]
    struct JsonCodec;

    impl Codec for JsonCodec {}

    impl Component for JsonCodec {
        fn metadata() -> ComponentMetadata {
            ComponentMetadata::for_component::<Self>()
                .implements_keyed::<dyn Codec, dyn Codec>(true, cast_to!(JsonCodec => dyn Codec))
                .build()
        }
    }

    #[derive(Default)]
    struct BinaryCodec;

    impl Codec for BinaryCodec {}

    impl Component for BinaryCodec {
        fn metadata() -> ComponentMetadata {
            ComponentMetadata::for_component::<Self>()
                .implements_keyed::<dyn Codec, dyn Codec>(true, cast_to!(BinaryCodec => dyn Codec))
                .build()
        }
    }

    #[derive(Default)]
    struct FallbackCodec;

    impl Codec for FallbackCodec {}

    impl Component for FallbackCodec {
        fn metadata() -> ComponentMetadata {
            ComponentMetadata::for_component::<Self>()
                .self_key::<dyn Codec>(false)
                .implements::<dyn Codec>(cast_to!(FallbackCodec => dyn Codec))
                .build()
        }
    }

    fn type_ids(registry: &ComponentRegistry) -> Vec<TypeId> {
        registry
            .finalize()
            .iter()
            .map(|metadata| metadata.type_id())
            .collect()
    }

    #[test]
    fn should_register_type_under_own_name() {
        let mut registry = ComponentRegistry::default();
        registry.put(Arc::new(JsonCodec::metadata()));

        assert_eq!(type_ids(&registry), vec![TypeId::of::<JsonCodec>()]);
    }

    #[test]
    fn should_deduplicate_repeated_registration() {
        let mut registry = ComponentRegistry::default();
        registry.put(Arc::new(JsonCodec::metadata()));
        registry.put(Arc::new(JsonCodec::metadata()));

        assert_eq!(type_ids(&registry), vec![TypeId::of::<JsonCodec>()]);
    }

    #[test]
    fn should_move_overwritten_key_to_end() {
        let mut registry = ComponentRegistry::default();
        registry.put(Arc::new(JsonCodec::metadata()));
        registry.put(Arc::new(BinaryCodec::metadata()));

        // the shared key entry now holds only the later registration and sits
        // at the end of the iteration order
        assert_eq!(
            type_ids(&registry),
            vec![TypeId::of::<JsonCodec>(), TypeId::of::<BinaryCodec>()]
        );
    }

    #[test]
    fn should_keep_existing_candidates_without_overwrite() {
        let mut registry = ComponentRegistry::default();
        registry.put(Arc::new(JsonCodec::metadata()));
        registry.put(Arc::new(FallbackCodec::metadata()));

        let finalized = type_ids(&registry);
        assert!(finalized.contains(&TypeId::of::<JsonCodec>()));
        assert!(finalized.contains(&TypeId::of::<FallbackCodec>()));
    }

    #[test]
    fn should_register_under_explicit_key() {
        let mut registry = ComponentRegistry::default();
        registry.put_with_key("codec", Arc::new(JsonCodec::metadata()));
        registry.put_with_key("codec", Arc::new(BinaryCodec::metadata()));

        // explicit keys overwrite: only the latter survives
        assert_eq!(type_ids(&registry), vec![TypeId::of::<BinaryCodec>()]);
    }
}
