use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

#[derive(Debug)]
pub enum ChangeEvent<T> {
    Reset,
    Insert {
        index: usize,
        item: Arc<T>,
    },
}

impl<T> Clone for ChangeEvent<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Reset => Self::Reset,
            Self::Insert { index, item } => Self::Insert {
                index: *index,
                item: Arc::clone(item),
            },
        }
    }
}

impl<T> ChangeEvent<T> {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Reset => None,
            Self::Insert { index, .. } => Some(*index),
        }
    }

    // Применить событие к зеркальной коллекции на стороне потребителя
    pub fn apply_to(&self, items: &mut Vec<Arc<T>>) {
        match self {
            Self::Reset => items.clear(),
            Self::Insert { index, item } => {
                let at = (*index).min(items.len());
                items.insert(at, Arc::clone(item));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type ChangeListener<T> = Arc<dyn Fn(&ChangeEvent<T>) + Send + Sync>;
type ResetListener = Arc<dyn Fn() + Send + Sync>;

// Список подписчиков. Слушатели вызываются в потоке, который эмитит событие,
// в порядке регистрации. Список копируется перед вызовом, так что
// подписчик может отписаться прямо из колбэка.
pub struct EventChannel<T> {
    changes: Mutex<Vec<(SubscriptionId, ChangeListener<T>)>>,
    resets: Mutex<Vec<(SubscriptionId, ResetListener)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            changes: Mutex::new(Vec::new()),
            resets: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // После close() подписка молча игнорируется
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        if !self.is_closed() {
            self.changes.lock().push((id, Arc::new(listener)));
        }
        id
    }

    pub fn on_reset_completed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        if !self.is_closed() {
            self.resets.lock().push((id, Arc::new(listener)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut changes = self.changes.lock();
        let before = changes.len();
        changes.retain(|(sid, _)| *sid != id);
        if changes.len() != before {
            return true;
        }
        drop(changes);
        let mut resets = self.resets.lock();
        let before = resets.len();
        resets.retain(|(sid, _)| *sid != id);
        resets.len() != before
    }

    pub fn listeners_count(&self) -> usize {
        self.changes.lock().len() + self.resets.lock().len()
    }

    pub fn emit(&self, event: &ChangeEvent<T>) {
        if self.is_closed() {
            return;
        }
        let listeners: Vec<ChangeListener<T>> = self.changes
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn emit_all<'a, I>(&self, events: I)
    where
        I: IntoIterator<Item = &'a ChangeEvent<T>>,
        T: 'a,
    {
        if self.is_closed() {
            return;
        }
        let listeners: Vec<ChangeListener<T>> = self.changes
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for event in events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    pub fn emit_reset_completed(&self) {
        if self.is_closed() {
            return;
        }
        let listeners: Vec<ResetListener> = self.resets
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    // Идемпотентно
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.changes.lock().clear();
        self.resets.lock().clear();
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}
