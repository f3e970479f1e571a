use std::collections::BTreeMap;

/// Event stream a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// Pointer moves over the container.
    PointerMove,
    /// Viewport resizes.
    Resize,
}

/// Handle returned by [`Listeners::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

/// Registry of the event listeners one mount has attached to its host.
///
/// The host forwards an event only while a listener of that kind is
/// registered, so an emptied registry means the mount is deaf.
#[derive(Debug, Default)]
pub struct Listeners {
    next_id: u64,
    active: BTreeMap<ListenerHandle, ListenerKind>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ListenerKind) -> ListenerHandle {
        self.next_id += 1;
        let handle = ListenerHandle(self.next_id);
        self.active.insert(handle, kind);
        tracing::trace!(?kind, "listener added");
        handle
    }

    /// Returns false if the handle was not registered.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        self.active.remove(&handle).is_some()
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.active.values().any(|k| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove() {
        let mut l = Listeners::new();
        let a = l.add(ListenerKind::PointerMove);
        let b = l.add(ListenerKind::Resize);
        assert_ne!(a, b);
        assert_eq!(l.len(), 2);
        assert!(l.is_listening(ListenerKind::PointerMove));

        assert!(l.remove(a));
        assert!(!l.remove(a));
        assert!(!l.is_listening(ListenerKind::PointerMove));
        assert!(l.is_listening(ListenerKind::Resize));
    }
}
