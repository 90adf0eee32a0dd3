use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed list of work items handed out, in order, to any number of threads. Every
/// item is handed out exactly once.
pub struct WorkQueue<T> {
    work: Vec<T>,
    next: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(work: Vec<T>) -> Self {
        Self {
            work,
            next: AtomicUsize::new(0),
        }
    }

    /// The next item together with its position in the original list.
    pub fn next_index(&self) -> Option<(usize, &T)> {
        let cur = self.next.fetch_add(1, Ordering::SeqCst);
        self.work.get(cur).map(|t| (cur, t))
    }

    /// Number of items, handed out or not.
    pub fn total(&self) -> usize {
        self.work.len()
    }
}
