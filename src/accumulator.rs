use parking_lot::RwLock;
use std::sync::Arc;

// Append-only хранилище всех загруженных элементов.
//
// Писатель один (BulkLoader), читателей сколько угодно: snapshot()
// копирует только Arc-указатели, сами элементы не клонируются.
pub struct Accumulator<T>
where
    T: Send + Sync + 'static,
{
    items: RwLock<Vec<Arc<T>>>,
}

impl<T> Accumulator<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(Arc::new).collect()),
        }
    }

    // Возвращает длину после вставки
    #[inline]
    pub fn append(&self, item: T) -> usize {
        self.append_arc(Arc::new(item))
    }

    pub fn append_arc(&self, item: Arc<T>) -> usize {
        let mut items = self.items.write();
        items.push(item);
        items.len()
    }

    pub fn extend<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut guard = self.items.write();
        guard.extend(items.into_iter().map(Arc::new));
        guard.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Снимок в порядке вставки. Всё, что добавлено позже, в снимок не попадёт.
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        Arc::new(self.items.read().clone())
    }
}

impl<T> Default for Accumulator<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
