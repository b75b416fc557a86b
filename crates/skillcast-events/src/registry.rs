use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::EventNameConfig;
use crate::error::EventError;

/// Ordered event name → handler storage.
///
/// Handlers are plain handle values rather than closures so a caller can
/// unbind exactly the handle it bound earlier. Dispatch works on a snapshot
/// (`handlers`), which keeps registration and unregistration safe while a
/// handler of the same event is running.
pub struct EventRegistry<H> {
    handlers: HashMap<String, Vec<H>>,
    catalog: EventNameConfig,
}

impl<H> EventRegistry<H>
where
    H: Clone + PartialEq + fmt::Debug,
{
    pub fn new() -> Self {
        Self::with_catalog(EventNameConfig::default())
    }

    /// Create a registry that only accepts the names in `catalog`.
    pub fn with_catalog(catalog: EventNameConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            catalog,
        }
    }

    /// Whether an event name is accepted by this registry.
    pub fn is_known(&self, name: &str) -> bool {
        self.catalog.allows(name)
    }

    /// Append a handler to an event. Returns `Ok(false)` if the identical
    /// handle is already bound to that event.
    pub fn register(&mut self, name: &str, handler: H) -> Result<bool, EventError> {
        if name.is_empty() {
            return Err(EventError::EmptyName);
        }
        if !self.catalog.allows(name) {
            return Err(EventError::UnknownEvent(name.to_string()));
        }

        let list = self.handlers.entry(name.to_string()).or_default();
        if list.contains(&handler) {
            return Ok(false);
        }
        debug!("Bind {:?} -> '{}'", handler, name);
        list.push(handler);
        Ok(true)
    }

    /// Remove one specific handler from an event. Returns `true` if it was bound.
    pub fn unregister(&mut self, name: &str, handler: &H) -> bool {
        let Some(list) = self.handlers.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h != handler);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(name);
        }
        if removed {
            debug!("Unbind {:?} -> '{}'", handler, name);
        }
        removed
    }

    /// Remove every handler matching `predicate` across all events.
    /// Returns the number of bindings removed.
    pub fn unregister_where(&mut self, mut predicate: impl FnMut(&H) -> bool) -> usize {
        let mut removed = 0;
        self.handlers.retain(|_, list| {
            let before = list.len();
            list.retain(|h| !predicate(h));
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Snapshot of the handlers bound to an event, in registration order.
    pub fn handlers(&self, name: &str) -> Vec<H> {
        self.handlers.get(name).cloned().unwrap_or_default()
    }

    /// Whether a specific handler is bound to an event.
    pub fn contains(&self, name: &str, handler: &H) -> bool {
        self.handlers
            .get(name)
            .is_some_and(|list| list.contains(handler))
    }

    /// Number of handlers bound to one event.
    pub fn bindings_for(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    /// Total number of bindings across all events.
    pub fn binding_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Names of all events that currently have at least one handler.
    pub fn bound_events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<H> Default for EventRegistry<H>
where
    H: Clone + PartialEq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Handle(&'static str, u8);

    #[test]
    fn registration_order_is_kept() {
        let mut reg = EventRegistry::new();
        reg.register("fire", Handle("a", 0)).unwrap();
        reg.register("fire", Handle("b", 0)).unwrap();
        reg.register("fire", Handle("c", 0)).unwrap();

        assert_eq!(
            reg.handlers("fire"),
            vec![Handle("a", 0), Handle("b", 0), Handle("c", 0)]
        );
    }

    #[test]
    fn duplicate_handle_is_not_bound_twice() {
        let mut reg = EventRegistry::new();
        assert!(reg.register("fire", Handle("a", 0)).unwrap());
        assert!(!reg.register("fire", Handle("a", 0)).unwrap());
        assert_eq!(reg.bindings_for("fire"), 1);
    }

    #[test]
    fn targeted_unregister() {
        let mut reg = EventRegistry::new();
        reg.register("fire", Handle("a", 0)).unwrap();
        reg.register("fire", Handle("a", 1)).unwrap();

        assert!(reg.unregister("fire", &Handle("a", 1)));
        assert!(!reg.unregister("fire", &Handle("a", 1)));
        assert_eq!(reg.handlers("fire"), vec![Handle("a", 0)]);

        assert!(reg.unregister("fire", &Handle("a", 0)));
        assert_eq!(reg.binding_count(), 0);
        assert_eq!(reg.bound_events().count(), 0);
    }

    #[test]
    fn unregister_where_spans_events() {
        let mut reg = EventRegistry::new();
        reg.register("fire", Handle("a", 0)).unwrap();
        reg.register("aim", Handle("a", 1)).unwrap();
        reg.register("aim", Handle("b", 1)).unwrap();

        assert_eq!(reg.unregister_where(|h| h.0 == "a"), 2);
        assert_eq!(reg.binding_count(), 1);
        assert!(reg.contains("aim", &Handle("b", 1)));
    }

    #[test]
    fn snapshot_survives_self_unregistration() {
        let mut reg = EventRegistry::new();
        reg.register("fire", Handle("a", 0)).unwrap();
        reg.register("fire", Handle("b", 0)).unwrap();

        let mut visited = Vec::new();
        for handle in reg.handlers("fire") {
            // Each handler unbinds itself while the event is being dispatched.
            reg.unregister("fire", &handle);
            visited.push(handle);
        }

        assert_eq!(visited.len(), 2);
        assert_eq!(reg.bindings_for("fire"), 0);
    }

    #[test]
    fn catalog_rejects_unknown_names() {
        let mut reg = EventRegistry::with_catalog(EventNameConfig::new(["fire"]));
        assert!(reg.register("fire", Handle("a", 0)).is_ok());
        assert_eq!(
            reg.register("jump", Handle("a", 0)),
            Err(EventError::UnknownEvent("jump".into()))
        );
        assert!(!reg.is_known("jump"));
    }

    #[test]
    fn empty_name_rejected() {
        let mut reg = EventRegistry::new();
        assert_eq!(reg.register("", Handle("a", 0)), Err(EventError::EmptyName));
    }
}
