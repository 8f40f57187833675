//! Ordered listener storage.
//!
//! A [`HandlerRegistry`] maps a key (for instance `(event, state)`) to a
//! [`HandlerEntry`]: one optional primary handler plus a list of weighted
//! background handlers kept sorted by descending weight. Firing order is
//! always the primary first, then background handlers from the heaviest
//! to the lightest; equal weights fire in registration order.

/// Priority of a background handler. Larger values fire earlier.
pub type Weight = i32;

struct Background<H: ?Sized> {
    weight: Weight,
    handler: Box<H>,
}

/// Every handler registered under a single key.
pub struct HandlerEntry<H: ?Sized> {
    primary: Option<Box<H>>,
    background: Vec<Background<H>>,
}

impl<H: ?Sized> HandlerEntry<H> {
    fn new() -> Self {
        Self {
            primary: None,
            background: Vec::new(),
        }
    }

    /// Install the primary handler, returning the one it replaced.
    pub fn set_primary(&mut self, handler: Box<H>) -> Option<Box<H>> {
        self.primary.replace(handler)
    }

    /// Insert a background handler, keeping descending weight order.
    ///
    /// The new handler goes after every existing handler whose weight is
    /// greater than or equal to its own, so handlers of equal weight keep
    /// their registration order.
    pub fn insert_background(&mut self, weight: Weight, handler: Box<H>) {
        let at = self
            .background
            .iter()
            .position(|existing| existing.weight < weight)
            .unwrap_or(self.background.len());
        self.background.insert(at, Background { weight, handler });
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Weights of the background handlers, in firing order.
    pub fn weights(&self) -> impl Iterator<Item = Weight> + '_ {
        self.background.iter().map(|b| b.weight)
    }

    /// Number of handlers that fire for this key.
    pub fn len(&self) -> usize {
        usize::from(self.primary.is_some()) + self.background.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handlers in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &H> + '_ {
        self.primary
            .iter()
            .map(|h| &**h)
            .chain(self.background.iter().map(|b| &*b.handler))
    }

    /// Handlers in firing order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut H> + '_ {
        self.primary
            .iter_mut()
            .map(|h| &mut **h)
            .chain(self.background.iter_mut().map(|b| &mut *b.handler))
    }
}

/// Keyed collection of [`HandlerEntry`] values with at most one entry per key.
pub struct HandlerRegistry<K, H: ?Sized> {
    entries: Vec<(K, HandlerEntry<H>)>,
}

impl<K: PartialEq, H: ?Sized> HandlerRegistry<K, H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&HandlerEntry<H>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut HandlerEntry<H>> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    /// Entry for `key`, created empty if missing.
    pub fn entry(&mut self, key: K) -> &mut HandlerEntry<H> {
        let index = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key, HandlerEntry::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Set the primary handler for `key`. Returns `true` if one was replaced.
    pub fn set_primary(&mut self, key: K, handler: Box<H>) -> bool {
        self.entry(key).set_primary(handler).is_some()
    }

    pub fn insert_background(&mut self, key: K, weight: Weight, handler: Box<H>) {
        self.entry(key).insert_background(weight, handler);
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: PartialEq, H: ?Sized> Default for HandlerRegistry<K, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Recorder = dyn FnMut(&mut Vec<i32>);

    fn tag(value: i32) -> Box<Recorder> {
        Box::new(move |log: &mut Vec<i32>| log.push(value))
    }

    fn fire(registry: &mut HandlerRegistry<&'static str, Recorder>, key: &'static str) -> Vec<i32> {
        let mut log = Vec::new();
        if let Some(entry) = registry.get_mut(&key) {
            for handler in entry.iter_mut() {
                handler(&mut log);
            }
        }
        log
    }

    #[test]
    fn background_handlers_fire_heaviest_first() {
        let mut registry = HandlerRegistry::new();
        registry.insert_background("update", 5, tag(5));
        registry.insert_background("update", 1, tag(1));
        registry.insert_background("update", 9, tag(9));

        assert_eq!(fire(&mut registry, "update"), vec![9, 5, 1]);
    }

    #[test]
    fn equal_weights_fire_in_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.insert_background("update", 3, tag(1));
        registry.insert_background("update", 3, tag(2));
        registry.insert_background("update", 7, tag(0));
        registry.insert_background("update", 3, tag(3));

        assert_eq!(fire(&mut registry, "update"), vec![0, 1, 2, 3]);
    }

    #[test]
    fn primary_fires_before_background() {
        let mut registry = HandlerRegistry::new();
        registry.insert_background("enter", 100, tag(2));
        registry.set_primary("enter", tag(1));

        assert_eq!(fire(&mut registry, "enter"), vec![1, 2]);
    }

    #[test]
    fn primary_registration_replaces_previous() {
        let mut registry = HandlerRegistry::new();
        assert!(!registry.set_primary("exit", tag(1)));
        assert!(registry.set_primary("exit", tag(2)));

        assert_eq!(fire(&mut registry, "exit"), vec![2]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn background_registrations_accumulate() {
        let mut registry = HandlerRegistry::new();
        registry.set_primary("update", tag(0));
        registry.insert_background("update", 1, tag(1));
        registry.insert_background("update", 1, tag(1));

        let entry = registry.get(&"update").unwrap();
        assert!(entry.has_primary());
        assert_eq!(entry.len(), 3);
        assert_eq!(entry.weights().collect::<Vec<_>>(), vec![1, 1]);
    }

    #[test]
    fn keys_are_independent() {
        let mut registry = HandlerRegistry::new();
        registry.set_primary("a", tag(1));
        registry.set_primary("b", tag(2));

        assert_eq!(fire(&mut registry, "a"), vec![1]);
        assert_eq!(fire(&mut registry, "b"), vec![2]);
        assert!(fire(&mut registry, "c").is_empty());
        assert!(registry.get(&"c").is_none());
    }
}
