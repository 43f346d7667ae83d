//! Пул потоков фиксированного размера и примитивы синхронизации
//!
//! # Features
//! - Фиксированное число воркеров над ограниченной FIFO-очередью
//! - Backpressure: `submit` ждёт, пока в очереди не появится место
//! - Graceful shutdown: все принятые задачи выполняются до возврата
//! - Изоляция паник в задачах, пул не теряет воркеров
//! - `WaitGroup` с блокирующим, ограниченным по времени и async ожиданием
//! - Обобщённые `Stack<T>` и `Queue<T>`
//! - Демонстрация продюсер-потребитель

pub mod demo;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod structures;
pub mod wait_group;

pub use errors::{PoolError, PoolResult};
pub use pool::{Config, PoolState, WorkerPool};
pub use structures::{Queue, Stack};
pub use wait_group::{DoneGuard, WaitGroup};
