use crate::builder::ActorConfig;
use crate::core::Action;
use crate::effects::Effects;
use crate::lifecycle::LifecycleError;
use crate::runtime::Actor;
use crate::sync::lock;
use dashmap::DashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Where a binding is in its host's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created, no sink attached yet.
    Unbound,
    /// The host is active and its sink receives callbacks.
    Bound,
    /// The host is inactive; work continues against the stub sink.
    Inactive,
    /// The host is gone. Terminal.
    Disposed,
}

/// The three host signals as a single value.
#[derive(Debug)]
pub enum LifecycleEvent<E> {
    Activate(E),
    Deactivate,
    Destroy,
}

impl<E> LifecycleEvent<E> {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Activate(_) => "activate",
            LifecycleEvent::Deactivate => "deactivate",
            LifecycleEvent::Destroy => "destroy",
        }
    }
}

/// One host's actor together with its lifecycle phase.
///
/// Handles are cheap to clone and all clones share the phase.
pub struct Binding<S, E> {
    actor: Actor<S, E>,
    slot: Arc<Mutex<Slot<E>>>,
    // Serializes signals; `slot` is only held for short reads and writes.
    signal: Arc<Mutex<()>>,
}

struct Slot<E> {
    phase: Phase,
    last_effects: Option<Arc<E>>,
    // Removes the binding from the binder that created it.
    unregister: Option<Box<dyn FnOnce() + Send>>,
}

impl<S, E> Clone for Binding<S, E> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
            slot: Arc::clone(&self.slot),
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<S, E> Debug for Binding<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("phase", &lock(&self.slot).phase)
            .field("actor", &self.actor)
            .finish()
    }
}

impl<S, E> Binding<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    /// Wrap an actor that has no host yet.
    pub fn new(actor: Actor<S, E>) -> Self {
        Self {
            actor,
            slot: Arc::new(Mutex::new(Slot {
                phase: Phase::Unbound,
                last_effects: None,
                unregister: None,
            })),
            signal: Arc::new(Mutex::new(())),
        }
    }

    pub fn phase(&self) -> Phase {
        lock(&self.slot).phase
    }

    pub fn actor(&self) -> &Actor<S, E> {
        &self.actor
    }

    pub fn exec(&self, action: Action<S, E>) -> Result<(), LifecycleError> {
        self.actor.exec(action)
    }

    pub fn project<T>(&self, query: impl FnOnce(&S) -> T) -> T {
        self.actor.project(query)
    }

    /// The host became active with a freshly built sink.
    ///
    /// The sink is attached and a `Reenter` is submitted, so the new sink
    /// receives exactly one entry callback with the current state.
    pub fn activate(&self, effects: E) -> Result<(), LifecycleError> {
        let _signal = lock(&self.signal);
        self.bind_sink(Arc::new(effects), "activate")
    }

    /// Re-attach the most recently supplied sink, for hosts that keep one
    /// sink for their whole life.
    pub fn resume(&self) -> Result<(), LifecycleError> {
        let _signal = lock(&self.signal);
        let effects = {
            let slot = lock(&self.slot);
            match &slot.last_effects {
                Some(effects) if slot.phase != Phase::Disposed => Arc::clone(effects),
                _ => {
                    return Err(LifecycleError::IllegalLifecycleState {
                        phase: slot.phase,
                        event: "resume",
                    })
                }
            }
        };
        self.bind_sink(effects, "resume")
    }

    /// The host became inactive. State and in-flight work are kept; results
    /// produced meanwhile are applied silently.
    pub fn deactivate(&self) -> Result<(), LifecycleError> {
        let _signal = lock(&self.signal);
        match self.phase() {
            Phase::Bound | Phase::Inactive => {
                self.actor.detach();
                lock(&self.slot).phase = Phase::Inactive;
                Ok(())
            }
            phase => Err(LifecycleError::IllegalLifecycleState {
                phase,
                event: "deactivate",
            }),
        }
    }

    /// The host is gone for good. Disposes the actor and, for bindings
    /// created by a [`Binder`], forgets the host there too.
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        let _signal = lock(&self.signal);
        let unregister = {
            let mut slot = lock(&self.slot);
            if slot.phase == Phase::Disposed {
                return Err(LifecycleError::IllegalLifecycleState {
                    phase: Phase::Disposed,
                    event: "destroy",
                });
            }
            slot.phase = Phase::Disposed;
            slot.last_effects = None;
            slot.unregister.take()
        };
        if let Some(unregister) = unregister {
            unregister();
        }
        self.actor.dispose();
        Ok(())
    }

    /// Run `hook` once when this binding is destroyed.
    fn on_destroy(&self, hook: Box<dyn FnOnce() + Send>) {
        lock(&self.slot).unregister = Some(hook);
    }

    /// Caller holds the signal lock.
    fn bind_sink(&self, effects: Arc<E>, event: &'static str) -> Result<(), LifecycleError> {
        let phase = self.phase();
        if phase == Phase::Disposed {
            return Err(LifecycleError::IllegalLifecycleState { phase, event });
        }
        self.actor.attach_shared(Arc::clone(&effects));
        {
            let mut slot = lock(&self.slot);
            slot.last_effects = Some(effects);
            slot.phase = Phase::Bound;
        }
        self.actor.exec(Action::reenter())
    }
}

/// Keeps one actor per host identity across the host's lifecycle.
///
/// Hosts are recreated by their framework while their logical identity `K`
/// stays the same. The binder maps that identity to a [`Binding`] so that
/// state and in-flight work outlive each individual host instance, while
/// each new instance gets its own sink.
///
/// A lifecycle signal sent from inside an entry or error callback of the
/// same host panics instead of waiting on itself; the engine logs it like
/// any other failed callback.
pub struct Binder<K, S, E>
where
    K: Eq + Hash,
{
    bindings: Arc<DashMap<K, Binding<S, E>>>,
    config: ActorConfig,
}

impl<K, S, E> Default for Binder<K, S, E>
where
    K: Eq + Hash + Debug + Clone + Send + Sync + 'static,
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S, E> Debug for Binder<K, S, E>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("hosts", &self.bindings.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<K, S, E> Binder<K, S, E>
where
    K: Eq + Hash + Debug + Clone + Send + Sync + 'static,
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    pub fn new() -> Self {
        Self::with_config(ActorConfig::default())
    }

    /// Every actor this binder creates uses `config`.
    pub fn with_config(config: ActorConfig) -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Bind `host`, creating its actor from `state` if it has none yet, and
    /// activate it with `effects`.
    ///
    /// `state` is ignored when the host is already bound; this is how a
    /// recreated host picks up the state its predecessor left behind.
    pub fn bind(&self, host: K, state: S, effects: E) -> Result<Binding<S, E>, LifecycleError> {
        debug!(host = ?host, "binding host");
        let binding = self
            .bindings
            .entry(host.clone())
            .or_insert_with(|| self.create(host, state))
            .value()
            .clone();
        binding.activate(effects)?;
        Ok(binding)
    }

    /// A fresh binding that removes its own entry when destroyed through
    /// any handle.
    fn create(&self, host: K, state: S) -> Binding<S, E> {
        let binding = Binding::new(Actor::with_config(state, self.config.clone()));
        let registry = Arc::downgrade(&self.bindings);
        let slot = Arc::downgrade(&binding.slot);
        binding.on_destroy(Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                // The host may have been rebound to a newer binding meanwhile.
                registry.remove_if(&host, |_, entry| {
                    std::ptr::eq(slot.as_ptr(), Arc::as_ptr(&entry.slot))
                });
            }
        }));
        binding
    }

    pub fn activate(&self, host: &K, effects: E) -> Result<(), LifecycleError> {
        debug!(host = ?host, "activating host");
        self.lookup(host)?.activate(effects)
    }

    pub fn deactivate(&self, host: &K) -> Result<(), LifecycleError> {
        debug!(host = ?host, "deactivating host");
        self.lookup(host)?.deactivate()
    }

    /// Dispose the host's actor and forget the host.
    pub fn destroy(&self, host: &K) -> Result<(), LifecycleError> {
        debug!(host = ?host, "destroying host");
        let (_, binding) = self
            .bindings
            .remove(host)
            .ok_or_else(|| unknown(host))?;
        binding.destroy()
    }

    /// Deliver a lifecycle signal.
    pub fn dispatch(&self, host: &K, event: LifecycleEvent<E>) -> Result<(), LifecycleError> {
        match event {
            LifecycleEvent::Activate(effects) => self.activate(host, effects),
            LifecycleEvent::Deactivate => self.deactivate(host),
            LifecycleEvent::Destroy => self.destroy(host),
        }
    }

    /// Submit an action to the host's actor.
    pub fn exec(&self, host: &K, action: Action<S, E>) -> Result<(), LifecycleError> {
        self.lookup(host)?.exec(action)
    }

    pub fn get(&self, host: &K) -> Option<Binding<S, E>> {
        self.bindings.get(host).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, host: &K) -> bool {
        self.bindings.contains_key(host)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn lookup(&self, host: &K) -> Result<Binding<S, E>, LifecycleError> {
        self.get(host).ok_or_else(|| unknown(host))
    }
}

fn unknown<K: Debug>(host: &K) -> LifecycleError {
    LifecycleError::UnknownHost(format!("{host:?}"))
}
