use super::{
    accumulator::Accumulator,
    errors::{
        WindowError,
        panic_message,
    },
    event::{
        ChangeEvent,
        EventChannel,
        SubscriptionId,
    },
    result::WindowResult,
};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, ReentrantMutex};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
};

const DEFAULT_INITIAL_SIZE: usize = 50;
const PARALLEL_FILTER_THRESHOLD: usize = 10_000;

// Config

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub initial_size: usize,
    pub parallel_threshold: usize,
    pub thread_name: String,
}

impl WindowConfig {
    pub fn new(initial_size: usize) -> Self {
        Self {
            initial_size,
            ..Self::default()
        }
    }

    pub fn builder() -> WindowConfigBuilder {
        WindowConfigBuilder::new()
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_INITIAL_SIZE,
            parallel_threshold: PARALLEL_FILTER_THRESHOLD,
            thread_name: "window-reset".to_string(),
        }
    }
}

pub struct WindowConfigBuilder {
    config: WindowConfig,
}

impl WindowConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WindowConfig::default(),
        }
    }

    pub fn initial_size(mut self, initial_size: usize) -> Self {
        self.config.initial_size = initial_size;
        self
    }

    // Ниже порога фильтруем последовательно, выше через rayon
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    pub fn thread_name(mut self, name: &str) -> Self {
        self.config.thread_name = name.to_string();
        self
    }

    pub fn build(self) -> WindowConfig {
        self.config
    }
}

impl Default for WindowConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Filter

enum Filter<T> {
    All,
    Predicate(Box<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T> Filter<T> {
    #[inline(always)]
    fn accepts(&self, item: &T) -> bool {
        match self {
            Self::All => true,
            Self::Predicate(predicate) => predicate(item),
        }
    }
}

// Reset

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Completed {
        proxy_size: usize,
        staged: usize,
    },
    // Вытеснен более новым reset, ничего не эмитил
    Superseded,
}

impl ResetOutcome {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

pub struct ResetHandle {
    state: ResetHandleState,
}

enum ResetHandleState {
    Running(JoinHandle<WindowResult<ResetOutcome>>),
    Ready(WindowResult<ResetOutcome>),
}

impl ResetHandle {
    fn running(handle: JoinHandle<WindowResult<ResetOutcome>>) -> Self {
        Self { state: ResetHandleState::Running(handle) }
    }

    fn ready(result: WindowResult<ResetOutcome>) -> Self {
        Self { state: ResetHandleState::Ready(result) }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            ResetHandleState::Running(handle) => handle.is_finished(),
            ResetHandleState::Ready(_) => true,
        }
    }

    pub fn wait(self) -> WindowResult<ResetOutcome> {
        match self.state {
            ResetHandleState::Running(handle) => handle
                .join()
                .map_err(|_| WindowError::ResetLost)?,
            ResetHandleState::Ready(result) => result,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounters {
    pub source_size: usize,
    pub proxy_size: usize,
    pub staged_size: usize,
}

// Window

// proxy и staged меняются только вместе, под одним локом
struct WindowState<T> {
    proxy: Arc<Vec<Arc<T>>>,
    staged: Vec<Arc<T>>,
}

struct WindowInner<T>
where
    T: Send + Sync + 'static,
{
    source: Arc<Accumulator<T>>,
    config: WindowConfig,
    filter: ArcSwap<Filter<T>>,
    state: Mutex<WindowState<T>>,
    // Держится на время мутации и эмиссии, чтобы события reset и stage
    // не перемешивались. Реентерабельный: слушатель может вызвать stage()
    dispatch: ReentrantMutex<()>,
    generation: AtomicU64,
    events: EventChannel<T>,
    disposed: AtomicBool,
}

pub struct VirtualWindow<T>
where
    T: Send + Sync + 'static,
{
    inner: Arc<WindowInner<T>>,
}

impl<T> VirtualWindow<T>
where
    T: Send + Sync + 'static,
{
    // Constructors

    // Proxy заполняется текущим содержимым источника без фильтра,
    // staged берёт первые initial_size элементов. События не эмитятся.
    pub fn new(source: Arc<Accumulator<T>>, config: WindowConfig) -> Self {
        let proxy = source.snapshot();
        let take = config.initial_size.min(proxy.len());
        let staged = proxy[..take].to_vec();
        Self {
            inner: Arc::new(WindowInner {
                source,
                config,
                filter: ArcSwap::from_pointee(Filter::All),
                state: Mutex::new(WindowState { proxy, staged }),
                dispatch: ReentrantMutex::new(()),
                generation: AtomicU64::new(0),
                events: EventChannel::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_initial_size(source: Arc<Accumulator<T>>, initial_size: usize) -> Self {
        Self::new(source, WindowConfig::new(initial_size))
    }

    // Filter

    // Действует только со следующего reset()
    pub fn set_filter<F>(&self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.filter.store(Arc::new(Filter::Predicate(Box::new(predicate))));
    }

    pub fn clear_filter(&self) {
        self.inner.filter.store(Arc::new(Filter::All));
    }

    // Reset

    // Отменяет текущий reset (если есть) и запускает новый.
    // Снимок источника берётся в вызывающем потоке, фильтрация в фоне.
    pub fn reset(&self) -> ResetHandle {
        let inner = &self.inner;
        if inner.is_disposed() {
            return ResetHandle::ready(Err(WindowError::Disposed));
        }
        let generation = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = inner.source.snapshot();
        let filter = inner.filter.load_full();
        let worker = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name(inner.config.thread_name.clone())
            .spawn(move || worker.run_reset(generation, &snapshot, &filter));
        match spawned {
            Ok(handle) => ResetHandle::running(handle),
            Err(err) => ResetHandle::ready(Err(WindowError::ThreadSpawn {
                reason: err.to_string(),
            })),
        }
    }

    // Stage

    // Добавляет в staged до n следующих элементов proxy.
    // true, если добавлен хотя бы один.
    pub fn stage(&self, n: usize) -> bool {
        let inner = &self.inner;
        if inner.is_disposed() {
            return false;
        }
        let _dispatch = inner.dispatch.lock();
        let events: SmallVec<[ChangeEvent<T>; 16]> = {
            let mut state = inner.state.lock();
            let current = state.staged.len();
            let end = current.saturating_add(n).min(state.proxy.len());
            if end <= current {
                return false;
            }
            let proxy = Arc::clone(&state.proxy);
            let added = &proxy[current..end];
            state.staged.extend(added.iter().cloned());
            added
                .iter()
                .enumerate()
                .map(|(offset, item)| ChangeEvent::Insert {
                    index: current + offset,
                    item: Arc::clone(item),
                })
                .collect()
        };
        inner.events.emit_all(&events);
        true
    }

    // Counters

    #[inline]
    pub fn source_size(&self) -> usize {
        self.inner.source.len()
    }

    #[inline]
    pub fn proxy_size(&self) -> usize {
        self.inner.state.lock().proxy.len()
    }

    #[inline]
    pub fn staged_size(&self) -> usize {
        self.inner.state.lock().staged.len()
    }

    pub fn counters(&self) -> WindowCounters {
        let (proxy_size, staged_size) = {
            let state = self.inner.state.lock();
            (state.proxy.len(), state.staged.len())
        };
        WindowCounters {
            source_size: self.source_size(),
            proxy_size,
            staged_size,
        }
    }

    // Observable staged items

    pub fn items(&self) -> Vec<Arc<T>> {
        self.inner.state.lock().staged.clone()
    }

    // Слушатели вызываются под блокировкой рассылки. Из слушателя можно
    // вызывать stage и reset, но нельзя ждать сброс через wait(): коммит
    // вложенного сброса ждёт ту же блокировку, получится взаимная блокировка.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    // Те же ограничения, что и у subscribe: reset() без wait()
    pub fn on_reset_completed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.events.on_reset_completed(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    // Disposal

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    // Отменяет reset в полёте и закрывает канал событий. Идемпотентно.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.generation.fetch_add(1, Ordering::AcqRel);
        inner.events.close();
        tracing::debug!("virtual window disposed");
    }
}

impl<T> Drop for VirtualWindow<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> WindowInner<T>
where
    T: Send + Sync + 'static,
{
    #[inline]
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    #[inline]
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn run_reset(
        &self,
        generation: u64,
        snapshot: &[Arc<T>],
        filter: &Filter<T>,
    ) -> WindowResult<ResetOutcome> {
        let filtered = panic::catch_unwind(AssertUnwindSafe(|| {
            self.filter_snapshot(generation, snapshot, filter)
        }));
        match filtered {
            Ok(Some(proxy)) => Ok(self.commit(generation, proxy)),
            Ok(None) => {
                tracing::trace!(generation, "reset superseded during filtering");
                Ok(ResetOutcome::Superseded)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(generation, error = %message, "filter panicked, window kept");
                Err(WindowError::FilterPanicked { message })
            }
        }
    }

    // None, если за время фильтрации стартовал более новый reset
    fn filter_snapshot(
        &self,
        generation: u64,
        snapshot: &[Arc<T>],
        filter: &Filter<T>,
    ) -> Option<Vec<Arc<T>>> {
        if snapshot.len() < self.config.parallel_threshold {
            let mut proxy = Vec::new();
            for item in snapshot {
                if !self.is_current(generation) {
                    return None;
                }
                if filter.accepts(item.as_ref()) {
                    proxy.push(Arc::clone(item));
                }
            }
            Some(proxy)
        } else {
            // Порядок сохраняется: collect индексированного par_iter
            snapshot
                .par_iter()
                .map(|item| {
                    if !self.is_current(generation) {
                        return None;
                    }
                    Some(filter.accepts(item.as_ref()).then(|| Arc::clone(item)))
                })
                .collect::<Option<Vec<Option<Arc<T>>>>>()
                .map(|items| items.into_iter().flatten().collect())
        }
    }

    fn commit(&self, generation: u64, proxy: Vec<Arc<T>>) -> ResetOutcome {
        let _dispatch = self.dispatch.lock();
        let (events, proxy_size, staged) = {
            let mut state = self.state.lock();
            // Повторная проверка под локом: новый reset мог стартовать после фильтрации
            if !self.is_current(generation) || self.is_disposed() {
                tracing::trace!(generation, "reset superseded before commit");
                return ResetOutcome::Superseded;
            }
            let proxy = Arc::new(proxy);
            let take = self.config.initial_size.min(proxy.len());
            let staged: Vec<Arc<T>> = proxy[..take].to_vec();
            let mut events = Vec::with_capacity(take + 1);
            events.push(ChangeEvent::Reset);
            events.extend(staged.iter().enumerate().map(|(index, item)| ChangeEvent::Insert {
                index,
                item: Arc::clone(item),
            }));
            let proxy_size = proxy.len();
            state.proxy = proxy;
            state.staged = staged;
            (events, proxy_size, take)
        };
        self.events.emit_all(&events);
        self.events.emit_reset_completed();
        tracing::info!(generation, proxy_size, staged, "window reset completed");
        ResetOutcome::Completed { proxy_size, staged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_over(values: Vec<u32>, initial_size: usize) -> VirtualWindow<u32> {
        VirtualWindow::with_initial_size(Arc::new(Accumulator::from_vec(values)), initial_size)
    }

    #[test]
    fn constructor_seeds_unfiltered_prefix() {
        let window = window_over((0..20).collect(), 5);
        assert_eq!(window.proxy_size(), 20);
        assert_eq!(window.staged_size(), 5);
    }

    #[test]
    fn config_builder() {
        let config = WindowConfig::builder()
            .initial_size(7)
            .parallel_threshold(3)
            .thread_name("reset")
            .build();
        assert_eq!(config.initial_size, 7);
        assert_eq!(config.parallel_threshold, 3);
        assert_eq!(config.thread_name, "reset");
        assert_eq!(WindowConfig::default().initial_size, 50);
    }

    #[test]
    fn parallel_and_sequential_filters_agree() {
        let values: Vec<u32> = (0..5_000).collect();
        let source = Arc::new(Accumulator::from_vec(values));
        let sequential = VirtualWindow::new(Arc::clone(&source), WindowConfig::new(10));
        let parallel = VirtualWindow::new(
            Arc::clone(&source),
            WindowConfig::builder().initial_size(10).parallel_threshold(1).build(),
        );
        for window in [&sequential, &parallel] {
            window.set_filter(|v| v % 7 == 0);
            assert!(window.reset().wait().unwrap().is_completed());
        }
        assert_eq!(sequential.proxy_size(), parallel.proxy_size());
        while sequential.stage(500) {}
        while parallel.stage(500) {}
        let left: Vec<u32> = sequential.items().iter().map(|v| **v).collect();
        let right: Vec<u32> = parallel.items().iter().map(|v| **v).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn stale_generation_is_not_committed() {
        let window = window_over((0..10).collect(), 3);
        let inner = &window.inner;
        inner.generation.store(5, Ordering::SeqCst);
        let outcome = inner.commit(4, vec![Arc::new(99)]);
        assert_eq!(outcome, ResetOutcome::Superseded);
        assert_eq!(window.proxy_size(), 10);
    }
}
