//! Счётчик незавершённой работы с ожиданием нуля.
//!
//! `add`/`done` меняют счётчик одной атомарной операцией. Блокировка берётся
//! только в момент перехода в ноль, поэтому ожидающие потоки не мешают тем,
//! кто добавляет работу.

use std::{
    pin::pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Condvar, Mutex, PoisonError,
    },
    time::Duration,
};
use tokio::sync::Notify;

/// Примитив ожидания группы единиц работы.
///
/// ```
/// use std::{sync::Arc, thread};
/// use fixed_pool::WaitGroup;
///
/// let wg = Arc::new(WaitGroup::new());
/// wg.add(2);
/// for _ in 0..2 {
///     let wg = wg.clone();
///     thread::spawn(move || wg.done());
/// }
/// wg.wait();
/// assert_eq!(wg.count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct WaitGroup {
    counter: AtomicI64,
    lock: Mutex<()>,
    zero: Condvar,
    notify: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Прибавляет `delta` (может быть отрицательной) к счётчику.
    ///
    /// # Panics
    ///
    /// Если счётчик стал отрицательным: `done` вызвали больше раз, чем
    /// было добавлено работы.
    pub fn add(&self, delta: i64) {
        let current = self.counter.fetch_add(delta, Ordering::AcqRel) + delta;
        if current < 0 {
            panic!("WaitGroup: negative counter ({current})");
        }
        if current == 0 && delta != 0 {
            self.wake_all();
        }
    }

    /// То же, что `add(-1)`.
    #[inline]
    pub fn done(&self) {
        self.add(-1);
    }

    /// Вызывает `done` при освобождении, в том числе при раскрутке паники.
    #[must_use = "done() is called when the guard is dropped"]
    pub fn done_guard(&self) -> DoneGuard<'_> {
        DoneGuard(self)
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Блокирует поток, пока счётчик не станет равен нулю.
    pub fn wait(&self) {
        if self.count() == 0 {
            return;
        }
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .zero
            .wait_while(guard, |_| self.count() > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Как [`wait`](Self::wait), но не дольше `timeout`.
    /// Возвращает `true`, если ноль был достигнут.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.count() == 0 {
            return true;
        }
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_guard, result) = self
            .zero
            .wait_timeout_while(guard, timeout, |_| self.count() > 0)
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    /// Асинхронное ожидание нуля, не занимает поток исполнителя.
    pub async fn wait_async(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn wake_all(&self) {
        // Ожидающий проверяет счётчик под этой блокировкой, так что
        // пробуждение не может проскочить между проверкой и сном.
        drop(self.lock.lock().unwrap_or_else(PoisonError::into_inner));
        self.zero.notify_all();
        self.notify.notify_waiters();
    }
}

/// См. [`WaitGroup::done_guard`].
#[derive(Debug)]
pub struct DoneGuard<'a>(&'a WaitGroup);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}

#[cfg(test)]
mod tests {
    use super::WaitGroup;
    use std::{panic, sync::Arc, thread, time::Duration};

    #[test]
    fn done_guard_survives_panic() {
        let wg = WaitGroup::new();
        wg.add(2);

        {
            let _done = wg.done_guard();
        }
        assert_eq!(wg.count(), 1);

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _done = wg.done_guard();
            panic!("body failed");
        }));
        assert!(result.is_err());
        assert!(wg.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_on_zero_returns_immediately() {
        let wg = WaitGroup::new();
        wg.wait();
        assert!(wg.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn wait_timeout_reports_pending_work() {
        let wg = WaitGroup::new();
        wg.add(1);
        assert!(!wg.wait_timeout(Duration::from_millis(20)));
        wg.done();
        assert!(wg.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    #[should_panic(expected = "negative counter")]
    fn extra_done_panics() {
        let wg = WaitGroup::new();
        wg.add(1);
        wg.done();
        wg.done();
    }

    #[test]
    fn many_waiters_all_wake() {
        let wg = Arc::new(WaitGroup::new());
        wg.add(1);

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let wg = wg.clone();
                thread::spawn(move || wg.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        wg.done();

        for w in waiters {
            w.join().unwrap();
        }
    }
}
