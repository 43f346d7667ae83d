#[cfg(test)]
mod tests {
    use fixed_pool::{
        pool::{Config, WorkerPool},
        wait_group::WaitGroup,
    };
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    fn measure<F, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        result
    }

    #[test]
    fn load_test_1_ten_thousand_increments() {
        println!("\n=== LOAD TEST 1: 10k задач с атомарным счётчиком ===");
        let pool = WorkerPool::with_config(Config::cpu_bound()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        measure("10k tasks", || {
            for _ in 0..10_000 {
                let counter = counter.clone();
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
            pool.shutdown().unwrap();
        });

        assert_eq!(counter.load(Ordering::SeqCst), 10_000, "Ни потерянных, ни двойных выполнений");
        let metrics = pool.metrics();
        assert_eq!(metrics.completed_tasks, 10_000);
        println!("  Success rate: {:.1}%", metrics.success_rate() * 100.0);
    }

    #[test]
    fn load_test_2_concurrent_submitters() {
        println!("\n=== LOAD TEST 2: 8 потоков отправляют по 2500 задач ===");
        let pool = Arc::new(WorkerPool::new(4, 16).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        measure("8 x 2500 tasks", || {
            let submitters: Vec<_> = (0..8)
                .map(|_| {
                    let pool = pool.clone();
                    let counter = counter.clone();
                    thread::spawn(move || {
                        for _ in 0..2_500 {
                            let counter = counter.clone();
                            pool.submit(move || {
                                counter.fetch_add(1, Ordering::Relaxed);
                            })
                            .unwrap();
                        }
                    })
                })
                .collect();

            for s in submitters {
                s.join().unwrap();
            }
            pool.shutdown().unwrap();
        });

        assert_eq!(counter.load(Ordering::SeqCst), 20_000);
    }

    #[test]
    fn load_test_3_blocking_tasks() {
        println!("\n=== LOAD TEST 3: 200 блокирующих задач по 2ms ===");
        let pool = WorkerPool::with_config(Config::io_bound()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        measure("200 blocking tasks", || {
            for _ in 0..200 {
                let counter = counter.clone();
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(2));
                    counter.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
            pool.shutdown().unwrap();
        });

        assert_eq!(counter.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn load_test_4_wait_group_churn() {
        println!("\n=== LOAD TEST 4: WaitGroup под нагрузкой ===");
        let wg = Arc::new(WaitGroup::new());
        let threads = 16;
        let per_thread = 10_000;

        wg.add(threads * per_thread);
        measure("160k done()", || {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let wg = wg.clone();
                    thread::spawn(move || {
                        for _ in 0..per_thread {
                            wg.done();
                        }
                    })
                })
                .collect();

            wg.wait();
            for h in handles {
                h.join().unwrap();
            }
        });

        assert_eq!(wg.count(), 0);
    }
}
