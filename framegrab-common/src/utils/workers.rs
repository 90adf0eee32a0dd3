use std::{any::Any, fmt, thread};

pub struct CaughtPanic(pub Box<dyn Any + Send + 'static>);

pub struct FinishedWorker<T> {
    pub name: String,
    pub result: Result<T, CaughtPanic>,
}

/// Runs `f` on `count` named scoped threads and waits for all of them. The threads are
/// named `{name}00`, `{name}01` and so on, and `f` gets the worker's number. A panic in
/// one worker does not affect the others.
pub fn scoped_workers<F, T>(count: usize, name: &str, f: F) -> Vec<FinishedWorker<T>>
where
    F: Fn(usize) -> T + Sync,
    T: Send,
{
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|index| {
                let name = format!("{name}{index:>02}");
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || f(index))
                    .expect("the name does not contain null bytes");
                (name, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| FinishedWorker {
                name,
                result: handle.join().map_err(CaughtPanic),
            })
            .collect()
    })
}

impl fmt::Display for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let panic = &self.0;
        let string = panic
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| {
                format!("non-string panic message: {:?}", panic.type_id())
            });
        write!(f, "{string}")
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaughtPanic({self})")
    }
}
