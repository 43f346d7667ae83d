use std::collections::BTreeMap;

/// Снимок состояния пула.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub num_workers: usize,
    pub live_workers: usize,
    pub queue_capacity: usize,
    pub queued_tasks: usize,
    pub pending_tasks: usize,
    pub submitted_tasks: usize,
    pub completed_tasks: usize,
    pub panicked_tasks: usize,
}

impl PoolMetrics {
    /// Доля воркеров, занятых задачами прямо сейчас.
    pub fn utilization(&self) -> f64 {
        if self.live_workers == 0 {
            return 0.0;
        }
        let running = self.pending_tasks.saturating_sub(self.queued_tasks);
        running.min(self.live_workers) as f64 / self.live_workers as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        if self.queue_capacity == 0 {
            return 0.0;
        }
        self.queued_tasks as f64 / self.queue_capacity as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.panicked_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}



/// Итог демонстрации продюсер-потребитель
#[derive(Debug, Clone, Default)]
pub struct DemoReport {
    pub produced: usize,
    pub consumed: usize,
    pub per_consumer: BTreeMap<usize, usize>,
}

impl DemoReport {
    pub fn is_balanced(&self) -> bool {
        self.produced == self.consumed
            && self.per_consumer.values().sum::<usize>() == self.consumed
    }
}
