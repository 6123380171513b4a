use std::cell::RefCell;
use std::rc::{Rc, Weak};

type ActiveListener<T> = Rc<RefCell<dyn FnMut(Option<&Rc<T>>)>>;

struct Inner<T: ?Sized> {
    current: Option<Rc<T>>,
    listeners: Vec<(u64, ActiveListener<T>)>,
    next_id: u64,
    notifying: bool,
    pending: bool,
}

/// Broadcasts which editing region is currently active.
///
/// Created once by the application root and shared by cloning the handle;
/// clones observe the same state. Handles are compared by pointer, so
/// re-activating the active region notifies nobody. The active handle is
/// only ever replaced, never cleared by a region losing focus.
pub struct ActiveRegistry<T: ?Sized> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: ?Sized> Clone for ActiveRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Default for ActiveRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ActiveRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                current: None,
                listeners: Vec::new(),
                next_id: 0,
                notifying: false,
                pending: false,
            })),
        }
    }

    pub fn active(&self) -> Option<Rc<T>> {
        self.inner.borrow().current.clone()
    }

    pub fn is_active(&self, handle: &Rc<T>) -> bool {
        self.inner
            .borrow()
            .current
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, handle))
    }

    /// Replace the active handle and notify subscribers in subscription order.
    ///
    /// A call made from inside a notification updates the handle immediately;
    /// subscribers hear about it after the current round completes.
    pub fn set_active(&self, handle: Option<Rc<T>>) {
        {
            let mut inner = self.inner.borrow_mut();
            let unchanged = match (&inner.current, &handle) {
                (Some(current), Some(next)) => Rc::ptr_eq(current, next),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }
            inner.current = handle;
            if inner.notifying {
                inner.pending = true;
                return;
            }
            inner.notifying = true;
        }

        loop {
            let (current, listeners) = {
                let mut inner = self.inner.borrow_mut();
                inner.pending = false;
                (inner.current.clone(), inner.listeners.clone())
            };
            for (id, listener) in listeners {
                if !self.is_subscribed(id) {
                    continue;
                }
                let mut callback = listener.borrow_mut();
                (&mut *callback)(current.as_ref());
            }
            let mut inner = self.inner.borrow_mut();
            if !inner.pending {
                inner.notifying = false;
                break;
            }
        }
    }

    /// Register `listener`, calling it right away with the current handle.
    pub fn subscribe(&self, listener: impl FnMut(Option<&Rc<T>>) + 'static) -> Subscription<T>
    where
        T: 'static,
    {
        let listener: ActiveListener<T> = Rc::new(RefCell::new(listener));
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::clone(&listener)));
            (id, inner.current.clone())
        };
        (&mut *listener.borrow_mut())(current.as_ref());
        Subscription {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.inner
            .borrow()
            .listeners
            .iter()
            .any(|(lid, _)| *lid == id)
    }
}

/// Keeps a registry listener alive; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription<T: ?Sized> {
    registry: Weak<RefCell<Inner<T>>>,
    id: u64,
}

impl<T: ?Sized> Subscription<T> {
    pub fn unsubscribe(self) {}
}

impl<T: ?Sized> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}
