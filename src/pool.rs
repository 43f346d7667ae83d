use super::{
    errors::{PoolError, PoolResult},
    handle::{Task, WorkerHandle},
    model::PoolMetrics,
    wait_group::WaitGroup,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    thread,
    time::Duration,
};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};


/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    pub num_workers: usize,
    pub queue_capacity: usize,
    /// Префикс имени потоков, к нему добавляется номер воркера.
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_workers: num_cpus,
            queue_capacity: num_cpus * 16,
            thread_name: "fixed-pool".into(),
        }
    }
}

impl Config {
    pub fn new(num_workers: usize, queue_capacity: usize) -> Self {
        Self {
            num_workers,
            queue_capacity,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_workers: num_cpus,
            queue_capacity: num_cpus * 4,
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_workers: num_cpus * 2, // Для I/O-bound задач
            queue_capacity: num_cpus * 64,
            ..Default::default()
        }
    }

    fn validate(&self) -> PoolResult<()> {
        if self.num_workers == 0 {
            return Err(PoolError::InvalidConfig("num_workers must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::InvalidConfig("queue_capacity must be positive".into()));
        }
        Ok(())
    }
}


/// Состояние жизненного цикла пула: `Open → Closing → Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Принимает задачи, воркеры работают.
    Open,
    /// Shutdown вызван, очередь дочищается.
    Closing,
    /// Все воркеры завершены, незавершённых задач нет.
    Terminated,
}

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const TERMINATED: u8 = 2;

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            OPEN => PoolState::Open,
            CLOSING => PoolState::Closing,
            _ => PoolState::Terminated,
        }
    }
}


#[derive(Default)]
struct Shared {
    pending: WaitGroup,
    live_workers: AtomicUsize,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
}

/// Пул с фиксированным числом потоков и ограниченной FIFO-очередью.
///
/// Каждая принятая задача (`submit` вернул `Ok`) выполняется ровно один раз,
/// и [`shutdown`](Self::shutdown) не возвращается, пока все они не завершены.
///
/// # Паники в задачах
///
/// Паника внутри задачи перехватывается на границе воркера: она пишется в лог
/// на уровне `error`, учитывается в [`PoolMetrics::panicked_tasks`] и
/// засчитывается как завершение. Воркер продолжает работу, так что число
/// потоков пула не уменьшается.
///
/// # Блокировки
///
/// `shutdown` из задачи самого пула возвращает [`PoolError::WorkerThread`].
/// Если последняя ссылка на пул освобождается внутри его задачи, `Drop` только
/// закрывает очередь: воркеры дочищают её и завершаются без `join`.
/// Задача не должна вызывать `wait_idle` или блокирующий `submit` на
/// собственном пуле: при заполненной очереди это взаимная блокировка.
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use fixed_pool::WorkerPool;
///
/// let pool = WorkerPool::new(2, 1).unwrap();
/// let ran = Arc::new(AtomicUsize::new(0));
/// for _ in 0..5 {
///     let ran = ran.clone();
///     pool.submit(move || { ran.fetch_add(1, Ordering::Relaxed); }).unwrap();
/// }
/// pool.shutdown().unwrap();
/// assert_eq!(ran.load(Ordering::Relaxed), 5);
/// ```
pub struct WorkerPool {
    sender: RwLock<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
    state: AtomicU8,
    shared: Arc<Shared>,
    workers: Mutex<Vec<WorkerHandle>>,
    config: Config,
}

impl WorkerPool {
    /// Запускает `num_workers` потоков над очередью на `queue_capacity` задач.
    pub fn new(num_workers: usize, queue_capacity: usize) -> PoolResult<Self> {
        Self::with_config(Config::new(num_workers, queue_capacity))
    }

    pub fn with_config(config: Config) -> PoolResult<Self> {
        config.validate()?;

        let (sender, receiver) = channel::bounded::<Task>(config.queue_capacity);
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(config.num_workers);

        // Запускаем воркеры
        for id in 0..config.num_workers {
            let tasks = receiver.clone();
            let shared_clone = shared.clone();
            shared.live_workers.fetch_add(1, Ordering::AcqRel);

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, id))
                .spawn(move || worker_loop(id, tasks, &shared_clone));

            match spawned {
                Ok(thread) => workers.push(WorkerHandle::new(id, thread)),
                Err(err) => {
                    shared.live_workers.fetch_sub(1, Ordering::AcqRel);
                    error!(worker = id, error = %err, "failed to spawn worker");
                    // Без отправителя уже запущенные воркеры сразу завершатся.
                    drop(sender);
                    for worker in workers {
                        worker.join();
                    }
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        info!(
            workers = config.num_workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            state: AtomicU8::new(OPEN),
            shared,
            workers: Mutex::new(workers),
            config,
        })
    }

    /// Ставит задачу в очередь. Если очередь заполнена, ждёт свободного места.
    ///
    /// После начала shutdown возвращает [`PoolError::Closed`], задача не
    /// выполняется.
    pub fn submit<F>(&self, task: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.state.load(Ordering::Acquire) != OPEN {
            warn!("submit rejected: pool is closed");
            return Err(PoolError::Closed);
        }

        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            warn!("submit rejected: pool is closed");
            return Err(PoolError::Closed);
        };

        self.shared.pending.add(1);
        if tx.send(Box::new(task)).is_err() {
            self.shared.pending.done();
            return Err(PoolError::Closed);
        }
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Неблокирующий вариант `submit`: при заполненной очереди сразу
    /// возвращает [`PoolError::QueueFull`].
    pub fn try_submit<F>(&self, task: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.state.load(Ordering::Acquire) != OPEN {
            return Err(PoolError::Closed);
        }

        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(PoolError::Closed);
        };

        self.shared.pending.add(1);
        match tx.try_send(Box::new(task)) {
            Ok(()) => {
                self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.shared.pending.done();
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.pending.done();
                Err(PoolError::Closed)
            }
        }
    }

    /// Закрывает пул и ждёт завершения всех принятых задач и всех воркеров.
    ///
    /// Вызывается один раз: повторный вызов возвращает
    /// [`PoolError::AlreadyShutdown`] и ничего не ждёт. Из задачи самого пула
    /// возвращает [`PoolError::WorkerThread`], пул остаётся открытым.
    pub fn shutdown(&self) -> PoolResult<()> {
        self.reject_worker_thread()?;
        self.close()?;
        self.shared.pending.wait();
        self.retire_workers();
        Ok(())
    }

    /// Как `shutdown`, но ждёт не дольше `timeout`.
    ///
    /// При таймауте пул остаётся в `Closing`: воркеры дочищают очередь в фоне,
    /// новые задачи не принимаются.
    pub fn shutdown_timeout(&self, timeout: Duration) -> PoolResult<()> {
        self.reject_worker_thread()?;
        self.close()?;
        if !self.shared.pending.wait_timeout(timeout) {
            warn!(
                pending = self.shared.pending.count(),
                "shutdown timed out, workers keep draining"
            );
            return Err(PoolError::Timeout);
        }
        self.retire_workers();
        Ok(())
    }

    /// Ждёт завершения всех отправленных на данный момент задач, не закрывая пул.
    pub fn wait_idle(&self) {
        self.shared.pending.wait();
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            num_workers: self.config.num_workers,
            live_workers: self.shared.live_workers.load(Ordering::Acquire),
            queue_capacity: self.config.queue_capacity,
            queued_tasks: self.receiver.len(),
            // add/done паникуют раньше, чем счётчик уйдёт в минус.
            pending_tasks: self.shared.pending.count() as usize,
            submitted_tasks: self.shared.submitted.load(Ordering::Relaxed),
            completed_tasks: self.shared.completed.load(Ordering::Relaxed),
            panicked_tasks: self.shared.panicked.load(Ordering::Relaxed),
        }
    }

    /// Поток текущего вызова является одним из воркеров этого пула.
    fn on_worker_thread(&self) -> bool {
        let current = thread::current().id();
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|worker| worker.thread_id() == current)
    }

    fn reject_worker_thread(&self) -> PoolResult<()> {
        if self.on_worker_thread() {
            warn!("shutdown rejected: called from a pool worker");
            return Err(PoolError::WorkerThread);
        }
        Ok(())
    }

    fn close(&self) -> PoolResult<()> {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("shutdown called more than once");
            return Err(PoolError::AlreadyShutdown);
        }

        info!(pending = self.shared.pending.count(), "worker pool closing");
        // Последний отправитель уходит: воркеры дочитают очередь и выйдут.
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn retire_workers(&self) {
        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            let id = worker.id();
            if !worker.join() {
                error!(worker = id, "worker thread exited with a panic");
            }
        }
        self.state.store(TERMINATED, Ordering::Release);
        info!("worker pool terminated");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.state() != PoolState::Open {
            return;
        }
        if self.on_worker_thread() {
            // Ждать здесь значит ждать самих себя: только закрываем очередь,
            // воркеры дочитают её и завершатся без join.
            let _ = self.close();
            debug!("pool dropped on its own worker, workers detached");
        } else {
            let _ = self.shutdown();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("pending", &self.shared.pending.count())
            .finish()
    }
}


fn worker_loop(id: usize, tasks: Receiver<Task>, shared: &Shared) {
    debug!(worker = id, "worker started");

    // Итератор заканчивается, когда очередь закрыта и пуста.
    for task in tasks.iter() {
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                error!(worker = id, panic = panic_message(payload.as_ref()), "task panicked");
            }
        }
        shared.pending.done();
    }

    shared.live_workers.fetch_sub(1, Ordering::AcqRel);
    debug!(worker = id, "worker retired");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::{panic_message, Config, PoolState};

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(Config::new(0, 1).validate().is_err());
        assert!(Config::new(1, 0).validate().is_err());
        assert!(Config::new(1, 1).validate().is_ok());
    }

    #[test]
    fn presets_are_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::cpu_bound().validate().is_ok());
        assert!(Config::io_bound().validate().is_ok());
    }

    #[test]
    fn state_round_trips_through_raw_value() {
        assert_eq!(PoolState::from_u8(super::OPEN), PoolState::Open);
        assert_eq!(PoolState::from_u8(super::CLOSING), PoolState::Closing);
        assert_eq!(PoolState::from_u8(super::TERMINATED), PoolState::Terminated);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
