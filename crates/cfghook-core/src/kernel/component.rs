use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::Result;

/// Lifecycle trait for the components owned by the [`Backend`](crate::kernel::Backend)
#[async_trait]
pub trait BackendComponent: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Components keyed by the TypeId of their concrete type
#[derive(Default)]
pub struct ComponentRegistry {
    instances: HashMap<TypeId, Arc<dyn BackendComponent>>,
    // Same instances, kept as `Any` for concrete downcasts.
    concrete: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component instance, replacing one of the same type
    pub fn register_instance<V>(&mut self, instance: Arc<V>)
    where
        V: BackendComponent + 'static,
    {
        self.concrete.insert(TypeId::of::<V>(), instance.clone());
        self.instances.insert(TypeId::of::<V>(), instance);
    }

    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn BackendComponent>> {
        self.instances.get(type_id).cloned()
    }

    /// Component of concrete type `T`
    pub fn get_concrete<T: BackendComponent + 'static>(&self) -> Option<Arc<T>> {
        self.concrete
            .get(&TypeId::of::<T>())
            .and_then(|component| Arc::downcast::<T>(component.clone()).ok())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.concrete.clear();
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.instances.values().map(|component| component.name()).collect();
        f.debug_struct("ComponentRegistry").field("components", &names).finish()
    }
}
