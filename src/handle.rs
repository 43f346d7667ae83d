use std::thread;

/// Единица работы для пула: без аргументов и без результата.
pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Handle на поток воркера
#[derive(Debug)]
pub struct WorkerHandle {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl WorkerHandle {

    pub fn new(id: usize, thread: thread::JoinHandle<()>) -> Self {
        Self { id, thread }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn thread_id(&self) -> thread::ThreadId {
        self.thread.thread().id()
    }

    /// Дожидается завершения потока. `false`, если поток завершился паникой.
    pub fn join(self) -> bool {
        self.thread.join().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerHandle;
    use std::thread;

    #[test]
    fn handle_reports_thread_identity_and_panics() {
        let ok = thread::spawn(|| {});
        let ok_id = ok.thread().id();
        let ok = WorkerHandle::new(0, ok);
        assert_eq!(ok.id(), 0);
        assert_eq!(ok.thread_id(), ok_id);
        assert_ne!(ok.thread_id(), thread::current().id());
        assert!(ok.join());

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let failed = WorkerHandle::new(1, thread::spawn(|| panic!("worker died")));
        let joined = failed.join();
        std::panic::set_hook(prev_hook);
        assert!(!joined);
    }
}
