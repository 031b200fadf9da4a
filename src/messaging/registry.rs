use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct RegistryInner<K, E> {
    next_id: u64,
    entries: HashMap<K, Vec<(u64, Handler<E>)>>,
}

/// Key -> ordered handler list, used for topic subscribers and status observers.
///
/// Handlers run outside the lock, against a snapshot taken at dispatch time, so a
/// handler may subscribe or unsubscribe freely while being invoked.
pub struct Registry<K, E> {
    inner: Arc<Mutex<RegistryInner<K, E>>>,
}

impl<K, E> Registry<K, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner<K, E>> {
        lock_inner(&self.inner)
    }

    /// Registers `handler` under `key`; handlers for a key run in registration order
    pub fn subscribe<F>(&self, key: K, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner
                .entries
                .entry(key.clone())
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<Mutex<RegistryInner<K, E>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = lock_inner(&inner);
            if let Some(handlers) = inner.entries.get_mut(&key) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    inner.entries.remove(&key);
                }
            }
        })
    }

    /// Invokes every handler registered for `key`. Returns how many completed
    /// without panicking.
    pub fn dispatch(&self, key: &K, event: &E) -> usize {
        let handlers: Vec<Handler<E>> = {
            let inner = self.lock();
            match inner.entries.get(key) {
                Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    tracing::error!(
                        "Handler for {:?} panicked: {}",
                        key,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
        delivered
    }

    pub fn handler_count(&self, key: &K) -> usize {
        self.lock().entries.get(key).map_or(0, Vec::len)
    }

    pub fn key_count(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

impl<K, E> Default for Registry<K, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// Handlers never run under the lock, so a poisoned mutex still holds consistent data
fn lock_inner<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Cancels one registration. Unsubscribing twice is a no-op, and dropping the
/// handle does NOT unsubscribe.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&u32) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_factory = Arc::clone(&log);
        let factory = move |name: &str| -> Box<dyn Fn(&u32) + Send + Sync> {
            let log = Arc::clone(&log_for_factory);
            let name = name.to_string();
            Box::new(move |n: &u32| log.lock().unwrap().push(format!("{name}:{n}")))
        };
        (log, factory)
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry: Registry<String, u32> = Registry::new();
        let (log, handler) = recorder();

        let _a = registry.subscribe("vitals".to_string(), handler("a"));
        let _b = registry.subscribe("vitals".to_string(), handler("b"));
        let _c = registry.subscribe("tasks".to_string(), handler("c"));

        assert_eq!(registry.dispatch(&"vitals".to_string(), &1), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_unknown_key_is_silently_dropped() {
        let registry: Registry<String, u32> = Registry::new();
        assert_eq!(registry.dispatch(&"nobody".to_string(), &1), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_prunes_empty_keys() {
        let registry: Registry<String, u32> = Registry::new();
        let (log, handler) = recorder();

        let a = registry.subscribe("vitals".to_string(), handler("a"));
        let b = registry.subscribe("vitals".to_string(), handler("b"));
        assert_eq!(registry.handler_count(&"vitals".to_string()), 2);

        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(registry.handler_count(&"vitals".to_string()), 1);

        registry.dispatch(&"vitals".to_string(), &7);
        assert_eq!(*log.lock().unwrap(), vec!["b:7"]);

        b.unsubscribe();
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn test_same_handler_on_many_keys_is_independent() {
        let registry: Registry<String, u32> = Registry::new();
        let (log, handler) = recorder();

        let on_vitals = registry.subscribe("vitals".to_string(), handler("x"));
        let _on_tasks = registry.subscribe("tasks".to_string(), handler("x"));
        on_vitals.unsubscribe();

        registry.dispatch(&"vitals".to_string(), &1);
        registry.dispatch(&"tasks".to_string(), &2);
        assert_eq!(*log.lock().unwrap(), vec!["x:2"]);
    }

    #[test]
    fn test_panicking_handler_does_not_block_others() {
        let registry: Registry<String, u32> = Registry::new();
        let (log, handler) = recorder();

        let _a = registry.subscribe("vitals".to_string(), handler("a"));
        let _boom = registry.subscribe("vitals".to_string(), |_: &u32| panic!("boom"));
        let _c = registry.subscribe("vitals".to_string(), handler("c"));

        assert_eq!(registry.dispatch(&"vitals".to_string(), &1), 2);
        assert_eq!(registry.dispatch(&"vitals".to_string(), &2), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "c:1", "a:2", "c:2"]);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry: Registry<String, u32> = Registry::new();
        let sub = registry.subscribe("vitals".to_string(), |_: &u32| {});
        drop(registry);
        sub.unsubscribe();
    }

    #[test]
    fn test_clear_removes_everything() {
        let registry: Registry<(), u32> = Registry::new();
        let _a = registry.subscribe((), |_: &u32| {});
        registry.clear();
        assert_eq!(registry.dispatch(&(), &1), 0);
    }
}
