//! # Manager Factory
//!
//! Reference-counted construction of entity managers.
//!
//! ```text
//! acquire ─► ref 0→1: build manager, register existing objects, subscribe
//! acquire ─► ref n→n+1: share the same manager
//! release ─► ref 1→0: unsubscribe, dispose (joins pending jobs)
//! ```
//!
//! Every renderer pass that needs a category acquires a [`ManagerLease`].
//! The manager lives exactly as long as at least one lease does.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::character::{CharacterDesc, CharacterEntityManager};
use crate::config::UmbraConfig;
use crate::decal::{DecalDesc, DecalEntityManager};
use crate::error::UmbraResult;
use crate::events::{
    EventBus, RenderableDesc, RenderableEvent, RenderableObserver, SharedObserver, SubscriptionId,
};

/// An entity manager the factory can build.
///
/// Implementors also observe [`ManagedCategory::Desc`] events.
pub trait ManagedCategory: Send + 'static {
    /// Host object description this manager consumes.
    type Desc: RenderableDesc;

    /// Category name for logs.
    const NAME: &'static str;

    /// Builds an empty manager.
    fn create(config: &UmbraConfig) -> Self;

    /// Registers an object that existed before the manager.
    fn register(&mut self, desc: &Self::Desc);

    /// Releases everything, joining pending jobs.
    fn dispose(&mut self);
}

impl ManagedCategory for CharacterEntityManager {
    type Desc = CharacterDesc;
    const NAME: &'static str = "character";

    fn create(config: &UmbraConfig) -> Self {
        Self::new(config)
    }

    fn register(&mut self, desc: &CharacterDesc) {
        self.on_event(&RenderableEvent::Added(desc.clone()));
    }

    fn dispose(&mut self) {
        CharacterEntityManager::dispose(self);
    }
}

impl ManagedCategory for DecalEntityManager {
    type Desc = DecalDesc;
    const NAME: &'static str = "decal";

    fn create(config: &UmbraConfig) -> Self {
        Self::new(config)
    }

    fn register(&mut self, desc: &DecalDesc) {
        self.on_event(&RenderableEvent::Added(desc.clone()));
    }

    fn dispose(&mut self) {
        DecalEntityManager::dispose(self);
    }
}

struct FactoryState<M> {
    manager: Option<Arc<Mutex<M>>>,
    subscription: Option<SubscriptionId>,
    ref_count: usize,
}

struct FactoryShared<M: ManagedCategory> {
    config: UmbraConfig,
    bus: EventBus<M::Desc>,
    state: Mutex<FactoryState<M>>,
}

impl<M: ManagedCategory> FactoryShared<M> {
    fn release(&self) {
        let mut state = self.state.lock();
        assert!(state.ref_count > 0, "Releasing {} manager with no leases", M::NAME);
        state.ref_count -= 1;
        if state.ref_count > 0 {
            return;
        }

        if let Some(subscription) = state.subscription.take() {
            self.bus.unsubscribe(subscription);
        }
        if let Some(manager) = state.manager.take() {
            manager.lock().dispose();
        }
        tracing::info!(category = M::NAME, "entity manager disposed");
    }
}

/// Builds and shares one manager of category `M`.
///
/// Cloning shares the same state.
pub struct EntityManagerFactory<M: ManagedCategory> {
    shared: Arc<FactoryShared<M>>,
}

impl<M: ManagedCategory> Clone for EntityManagerFactory<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ManagedCategory> std::fmt::Debug for EntityManagerFactory<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManagerFactory")
            .field("category", &M::NAME)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl<M: ManagedCategory> EntityManagerFactory<M> {
    /// Creates a factory with no live manager.
    ///
    /// # Errors
    ///
    /// Returns [`crate::UmbraError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: UmbraConfig) -> UmbraResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(FactoryShared {
                config,
                bus: EventBus::new(),
                state: Mutex::new(FactoryState {
                    manager: None,
                    subscription: None,
                    ref_count: 0,
                }),
            }),
        })
    }

    /// Configuration managers are built with.
    #[must_use]
    pub fn config(&self) -> &UmbraConfig {
        &self.shared.config
    }

    /// Event bus of this category.
    #[must_use]
    pub fn bus(&self) -> &EventBus<M::Desc> {
        &self.shared.bus
    }

    /// Publishes `event` to the live manager, if any.
    ///
    /// Must not be called while holding a lease's lock.
    pub fn publish(&self, event: &RenderableEvent<M::Desc>) {
        self.shared.bus.publish(event);
    }

    /// Number of live leases.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.shared.state.lock().ref_count
    }

    /// Checks if a manager is live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.shared.state.lock().manager.is_some()
    }

    /// Takes a lease on the manager, building it on first use.
    ///
    /// `existing` is only read when the manager is built; every object in it
    /// is registered before the manager subscribes to the bus.
    pub fn acquire(&self, existing: &[M::Desc]) -> ManagerLease<M>
    where
        M: RenderableObserver<M::Desc>,
    {
        let mut state = self.shared.state.lock();
        state.ref_count += 1;

        let manager = match state.manager.clone() {
            Some(manager) => manager,
            None => {
                let mut built = M::create(&self.shared.config);
                for desc in existing {
                    built.register(desc);
                }
                let manager = Arc::new(Mutex::new(built));
                let observer: SharedObserver<M::Desc> = manager.clone();
                state.subscription = Some(self.shared.bus.subscribe(observer));
                state.manager = Some(Arc::clone(&manager));
                tracing::info!(
                    category = M::NAME,
                    registered = existing.len(),
                    "entity manager created"
                );
                manager
            }
        };

        ManagerLease {
            shared: Arc::clone(&self.shared),
            manager,
        }
    }

    /// Returns a lease. Same as dropping it.
    pub fn release(&self, lease: ManagerLease<M>) {
        drop(lease);
    }
}

/// Shared handle on a live manager.
///
/// Dropping the last lease disposes the manager.
pub struct ManagerLease<M: ManagedCategory> {
    shared: Arc<FactoryShared<M>>,
    manager: Arc<Mutex<M>>,
}

impl<M: ManagedCategory> ManagerLease<M> {
    /// Locks the manager.
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.manager.lock()
    }

    /// Checks if both leases share one manager.
    #[must_use]
    pub fn same_manager(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.manager, &other.manager)
    }
}

impl<M: ManagedCategory> std::fmt::Debug for ManagerLease<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerLease")
            .field("category", &M::NAME)
            .finish_non_exhaustive()
    }
}

impl<M: ManagedCategory> Drop for ManagerLease<M> {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// Factories for every category, sharing one configuration.
#[derive(Clone, Debug)]
pub struct UmbraContext {
    /// Character managers.
    pub characters: EntityManagerFactory<CharacterEntityManager>,
    /// Decal managers.
    pub decals: EntityManagerFactory<DecalEntityManager>,
}

impl UmbraContext {
    /// Creates every factory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::UmbraError::InvalidConfig`] if `config` is invalid.
    pub fn new(config: UmbraConfig) -> UmbraResult<Self> {
        Ok(Self {
            characters: EntityManagerFactory::new(config.clone())?,
            decals: EntityManagerFactory::new(config)?,
        })
    }
}
