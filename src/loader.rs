use super::{
    accumulator::Accumulator,
    errors::{
        LoaderError,
        panic_message,
    },
    result::LoaderResult,
};
use std::{
    convert::Infallible,
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub poll_interval: Duration,
    pub thread_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            thread_name: "bulk-loader".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub appended: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

// Фоновая задача загрузки. Паника продюсера приходит через join().
pub struct LoadTask {
    handle: JoinHandle<LoadSummary>,
}

impl LoadTask {
    pub fn join(self) -> LoaderResult<LoadSummary> {
        self.handle
            .join()
            .map_err(|payload| LoaderError::ProducerPanicked {
                message: panic_message(payload.as_ref()),
            })
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

struct LoaderState {
    started: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,
}

// Выставляет finished при любом выходе из потока, включая панику,
// иначе block_until повиснет навсегда
struct FinishGuard(Arc<LoaderState>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finished.store(true, Ordering::Release);
    }
}

pub struct BulkLoader<T>
where
    T: Send + Sync + 'static,
{
    accumulator: Arc<Accumulator<T>>,
    state: Arc<LoaderState>,
    config: LoaderConfig,
}

impl<T> BulkLoader<T>
where
    T: Send + Sync + 'static,
{
    // Constructors

    pub fn new() -> Self {
        Self::with_accumulator(Arc::new(Accumulator::new()))
    }

    pub fn with_accumulator(accumulator: Arc<Accumulator<T>>) -> Self {
        Self::with_config(accumulator, LoaderConfig::default())
    }

    pub fn with_config(accumulator: Arc<Accumulator<T>>, config: LoaderConfig) -> Self {
        Self {
            accumulator,
            state: Arc::new(LoaderState {
                started: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
            config,
        }
    }

    // Access

    pub fn accumulator(&self) -> Arc<Accumulator<T>> {
        Arc::clone(&self.accumulator)
    }

    #[inline]
    pub fn loaded(&self) -> usize {
        self.accumulator.len()
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.state.started.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    // Loading

    // Запускает чтение последовательности в фоновом потоке.
    // Повторный вызов ничего не делает и возвращает Ok(None).
    pub fn start<I>(&self, items: I) -> LoaderResult<Option<LoadTask>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        self.start_fallible(items.into_iter().map(Ok::<T, Infallible>))
    }

    // То же, но ошибки отдельных элементов пропускаются и считаются в skipped
    pub fn start_fallible<I, E>(&self, items: I) -> LoaderResult<Option<LoadTask>>
    where
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: Send + 'static,
        E: Display,
    {
        if self.state.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("bulk loader already started, ignoring");
            return Ok(None);
        }
        let iter = items.into_iter();
        let accumulator = Arc::clone(&self.accumulator);
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || Self::produce(iter, &accumulator, state));
        match spawned {
            Ok(handle) => {
                tracing::info!(thread = %self.config.thread_name, "bulk loading started");
                Ok(Some(LoadTask { handle }))
            }
            Err(err) => {
                self.state.finished.store(true, Ordering::Release);
                Err(LoaderError::ThreadSpawn { reason: err.to_string() })
            }
        }
    }

    fn produce<I, E>(iter: I, accumulator: &Accumulator<T>, state: Arc<LoaderState>) -> LoadSummary
    where
        I: Iterator<Item = Result<T, E>>,
        E: Display,
    {
        let _finish = FinishGuard(Arc::clone(&state));
        let mut summary = LoadSummary::default();
        for produced in iter {
            // Элемент, уже полученный от продюсера, после отмены не добавляется
            if state.cancelled.load(Ordering::Acquire) {
                summary.cancelled = true;
                break;
            }
            match produced {
                Ok(item) => {
                    accumulator.append(item);
                    summary.appended += 1;
                }
                Err(err) => {
                    summary.skipped += 1;
                    tracing::debug!(error = %err, "item skipped");
                }
            }
        }
        tracing::info!(
            appended = summary.appended,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "bulk loading finished"
        );
        summary
    }

    // Blocking

    #[inline]
    fn reached(&self, n: usize) -> bool {
        self.accumulator.len() >= n || self.is_finished()
    }

    // Блокирует поток, пока не загружено n элементов или загрузка не завершилась.
    // Нельзя вызывать до start(): если продюсер не запущен, ждать будем вечно.
    pub fn block_until(&self, n: usize) {
        while !self.reached(n) {
            thread::sleep(self.config.poll_interval);
        }
    }

    // false, если за timeout условие так и не выполнилось
    pub fn block_until_timeout(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.reached(n) {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.config.poll_interval);
        }
        true
    }

    // Disposal

    // Неблокирующая отмена; поток увидит флаг перед следующим элементом
    pub fn dispose(&self) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("bulk loader cancellation requested");
        }
    }
}

impl<T> Default for BulkLoader<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BulkLoader<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
