//! Демонстрация паттерна продюсер-потребитель поверх [`WorkerPool`].
//!
//! Продюсеры генерируют числа в ограниченный канал до дедлайна, потребители
//! вычитывают канал до его закрытия. Завершение продюсеров отслеживает
//! [`WaitGroup`].

use super::{
    errors::{PoolError, PoolResult},
    model::DemoReport,
    pool::{Config, WorkerPool},
    wait_group::WaitGroup,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use crossbeam::channel::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};


#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub producers: usize,
    pub consumers: usize,
    /// Размер буфера канала между продюсерами и потребителями.
    pub buffer: usize,
    pub run_for: Duration,
    pub max_produce_delay: Duration,
    pub max_consume_delay: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            producers: 3,
            consumers: 4,
            buffer: 10,
            run_for: Duration::from_secs(5),
            max_produce_delay: Duration::from_millis(100),
            max_consume_delay: Duration::from_millis(150),
        }
    }
}

/// Запускает демонстрацию и блокируется до её завершения.
pub fn run(config: &DemoConfig) -> PoolResult<DemoReport> {
    if config.producers == 0 || config.consumers == 0 || config.buffer == 0 {
        return Err(PoolError::InvalidConfig(
            "producers, consumers and buffer must be positive".into(),
        ));
    }

    let workers = config.producers + config.consumers;
    let pool = WorkerPool::with_config(Config {
        num_workers: workers,
        queue_capacity: workers,
        thread_name: "demo".into(),
    })?;

    let (results_tx, results_rx) = channel::unbounded::<(usize, usize)>();
    let (data_tx, data_rx) = channel::bounded::<u32>(config.buffer);
    let token = CancellationToken::new();
    // При раннем выходе с ошибкой продюсеры тоже должны остановиться.
    let _stop_on_exit = token.clone().drop_guard();

    for id in 0..config.consumers {
        let data = data_rx.clone();
        let results = results_tx.clone();
        let max_delay = config.max_consume_delay;
        pool.submit(move || consumer(id, &data, &results, max_delay))?;
    }
    drop(data_rx);
    drop(results_tx);

    let producers = Arc::new(WaitGroup::new());
    let produced = Arc::new(AtomicUsize::new(0));
    for id in 0..config.producers {
        let data = data_tx.clone();
        let token = token.clone();
        let wg = producers.clone();
        let produced = produced.clone();
        let max_delay = config.max_produce_delay;

        wg.add(1);
        if let Err(err) = pool.submit(move || {
            let _done = wg.done_guard();
            producer(id, &data, &token, max_delay, &produced);
        }) {
            producers.done();
            return Err(err);
        }
    }

    if !producers.wait_timeout(config.run_for) {
        token.cancel();
        producers.wait();
    }
    // Продюсеры закончили: закрываем канал, потребители дочитают остаток.
    drop(data_tx);
    pool.shutdown()?;

    let mut report = DemoReport {
        produced: produced.load(Ordering::Acquire),
        ..Default::default()
    };
    for (id, count) in results_rx.try_iter() {
        report.consumed += count;
        report.per_consumer.insert(id, count);
    }

    info!(
        produced = report.produced,
        consumed = report.consumed,
        "producer-consumer demo finished"
    );
    Ok(report)
}

fn producer(
    id: usize,
    data: &Sender<u32>,
    token: &CancellationToken,
    max_delay: Duration,
    produced: &AtomicUsize,
) {
    let mut rng = XorShift::seeded(id as u64);
    while !token.is_cancelled() {
        let item = (rng.next_u64() % 1000) as u32;
        if data.send(item).is_err() {
            break;
        }
        produced.fetch_add(1, Ordering::AcqRel);
        debug!(producer = id, item, "produced");
        thread::sleep(rng.delay(max_delay));
    }
    debug!(producer = id, "producer stopped");
}

fn consumer(id: usize, data: &Receiver<u32>, results: &Sender<(usize, usize)>, max_delay: Duration) {
    let mut rng = XorShift::seeded(!(id as u64));
    let mut count = 0;
    for item in data.iter() {
        count += 1;
        debug!(consumer = id, item, "consumed");
        thread::sleep(rng.delay(max_delay));
    }
    let _ = results.send((id, count));
    debug!(consumer = id, count, "channel closed, consumer stopped");
}


struct XorShift(u64);

impl XorShift {
    fn seeded(salt: u64) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        // Нулевое состояние xorshift не покидает ноль.
        Self((nanos ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)) | 1)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn delay(&mut self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.next_u64() % max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::XorShift;
    use std::time::Duration;

    #[test]
    fn delay_stays_below_max() {
        let mut rng = XorShift::seeded(42);
        for _ in 0..1000 {
            assert!(rng.delay(Duration::from_millis(10)) < Duration::from_millis(10));
        }
        assert_eq!(rng.delay(Duration::ZERO), Duration::ZERO);
    }
}
