//! Debounced snapshot writes for one region.
//!
//! Every committed change restarts the region's [`Debouncer`]; the owner polls
//! with the current time and the write happens once the deadline has passed
//! without further changes. Nothing here spawns timers or threads: the event
//! loop drives it through [`AutoSave::poll`] and [`AutoSave::flush`].

use relative_path::{RelativePath, RelativePathBuf};
use std::time::{Duration, Instant};

use crate::editing::{Document, EditorState};
use crate::io::PersistenceAdapter;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

/// A cancellable one-shot deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending deadline and start a new one at `now + delay`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Consume the deadline regardless of time
    pub fn take(&mut self) -> Option<Instant> {
        self.deadline.take()
    }

    /// Put back a deadline unless a newer one is already set
    pub fn restore(&mut self, deadline: Instant) {
        self.deadline.get_or_insert(deadline);
    }
}

/// What a poll or flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing due
    Idle,
    /// Due, but there was nothing new to write
    Unchanged,
    Saved,
    /// The adapter refused the write; the change stays pending
    Failed,
}

/// Auto-save bookkeeping for one region
#[derive(Debug, Clone)]
pub struct AutoSave {
    key: RelativePathBuf,
    debouncer: Debouncer,
    /// Last snapshot known to be in the store
    last_saved: Option<String>,
}

impl AutoSave {
    pub fn new(key: RelativePathBuf, delay: Duration) -> Self {
        Self {
            key,
            debouncer: Debouncer::new(delay),
            last_saved: None,
        }
    }

    pub fn key(&self) -> &RelativePath {
        &self.key
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn mark_changed(&mut self, now: Instant) {
        self.debouncer.schedule(now);
    }

    /// Record that `snapshot` is already what the store holds
    pub fn mark_saved(&mut self, snapshot: impl Into<String>) {
        self.last_saved = Some(snapshot.into());
    }

    /// Write `document` if the debounce deadline has passed. A failed write
    /// starts another debounce cycle.
    pub fn poll<P: PersistenceAdapter + ?Sized>(
        &mut self,
        now: Instant,
        document: &Document,
        store: &P,
    ) -> SaveOutcome {
        if !self.debouncer.fire(now) {
            return SaveOutcome::Idle;
        }
        let outcome = self.write(document, store);
        if outcome == SaveOutcome::Failed {
            self.debouncer.schedule(now);
        }
        outcome
    }

    /// Write a pending change immediately
    pub fn flush<P: PersistenceAdapter + ?Sized>(
        &mut self,
        document: &Document,
        store: &P,
    ) -> SaveOutcome {
        let Some(deadline) = self.debouncer.take() else {
            return SaveOutcome::Idle;
        };
        let outcome = self.write(document, store);
        if outcome == SaveOutcome::Failed {
            self.debouncer.restore(deadline);
        }
        outcome
    }

    fn write<P: PersistenceAdapter + ?Sized>(
        &mut self,
        document: &Document,
        store: &P,
    ) -> SaveOutcome {
        let snapshot = match document.to_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Failed to serialise {}: {}", self.key, e);
                return SaveOutcome::Failed;
            }
        };

        let unchanged = match &self.last_saved {
            Some(last) => *last == snapshot,
            // a blank region with nothing stored has nothing to persist
            None => document.is_blank(),
        };
        if unchanged {
            return SaveOutcome::Unchanged;
        }

        match store.save(&self.key, &snapshot) {
            Ok(()) => {
                log::debug!("Saved {} ({} bytes)", self.key, snapshot.len());
                self.last_saved = Some(snapshot);
                SaveOutcome::Saved
            }
            Err(e) => {
                log::warn!("Failed to save {}: {}", self.key, e);
                SaveOutcome::Failed
            }
        }
    }
}
