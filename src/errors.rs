use thiserror::Error;

/// Ошибки пула воркеров.
///
/// Нарушения контракта счётчика (`WaitGroup` ушёл в минус) сюда не попадают:
/// это ошибка программиста и она заканчивается паникой.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("pool is closed")]
    Closed,
    #[error("task queue is full")]
    QueueFull,
    #[error("shutdown was already called")]
    AlreadyShutdown,
    #[error("timed out waiting for pending tasks")]
    Timeout,
    #[error("pool cannot be shut down from its own worker thread")]
    WorkerThread,
}

pub type PoolResult<T> = Result<T, PoolError>;
