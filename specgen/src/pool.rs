//! Fixed-size worker pool with a completion stream
//!
//! Every submitted item yields exactly one [`Completion`], in completion order.
//! Item failures (including panics) are captured into the completion and logged
//! at the worker boundary; they never stop the pool. [`install_panic_hook`]
//! sends the panic report itself to the same logger.

use crate::error::{FatalError, ItemError};
use crate::types::{Completion, InputFile};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Instant;
use tracing::Dispatch;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    dispatch: Option<Dispatch>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            dispatch: None,
        }
    }

    /// Run work items with this subscriber active on every worker thread
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Submit all items and return the stream of completions
    ///
    /// The returned iterator owns the threads; dropping it early discards the
    /// remaining results.
    pub fn process<F>(&self, items: Vec<InputFile>, work: F) -> Result<Completions, FatalError>
    where
        F: Fn(&InputFile) -> Result<PathBuf, ItemError> + Send + Sync + 'static,
    {
        if self.size == 0 {
            return Err(FatalError::PoolInit("worker count must be at least 1".to_string()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.size)
            .thread_name(|i| format!("specgen-worker-{}", i))
            .build()
            .map_err(|e| FatalError::PoolInit(e.to_string()))?;

        tracing::debug!("Worker pool started: {} threads, {} items", self.size, items.len());

        let total = items.len();
        let work = Arc::new(work);
        let (tx, rx) = mpsc::channel();

        for item in items {
            let tx = tx.clone();
            let work = Arc::clone(&work);
            let dispatch = self.dispatch.clone();

            pool.spawn(move || {
                let completion = match dispatch {
                    Some(dispatch) => {
                        tracing::dispatcher::with_default(&dispatch, || run_item(item, &*work))
                    }
                    None => run_item(item, &*work),
                };
                // Receiver gone means the caller stopped listening
                let _ = tx.send(completion);
            });
        }

        Ok(Completions {
            rx,
            remaining: total,
            _pool: pool,
        })
    }
}

/// Run one item, containing panics and logging failures
fn run_item<F>(item: InputFile, work: &F) -> Completion
where
    F: Fn(&InputFile) -> Result<PathBuf, ItemError>,
{
    let start = Instant::now();

    let outcome = catch_unwind(AssertUnwindSafe(|| work(&item)))
        .unwrap_or_else(|payload| Err(ItemError::Panicked(panic_message(payload.as_ref()))));

    if let Err(e) = &outcome {
        tracing::error!("Failed to process {}: {}", item, e);
    }

    Completion {
        item,
        outcome,
        elapsed: start.elapsed(),
    }
}

/// Report panics through the thread's current dispatcher
///
/// Threads without a dispatcher fall back to the previously installed hook.
pub fn install_panic_hook() {
    let fallback = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let logging = tracing::dispatcher::get_default(|dispatch| {
            !dispatch.is::<tracing::subscriber::NoSubscriber>()
        });
        if !logging {
            fallback(info);
            return;
        }

        let thread = std::thread::current();
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        tracing::error!(
            "Thread '{}' panicked at {}: {}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            panic_message(info.payload())
        );
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Completion stream returned by [`WorkerPool::process`]
pub struct Completions {
    rx: Receiver<Completion>,
    remaining: usize,
    _pool: rayon::ThreadPool,
}

impl Iterator for Completions {
    type Item = Completion;

    fn next(&mut self) -> Option<Completion> {
        if self.remaining == 0 {
            return None;
        }
        match self.rx.recv() {
            Ok(completion) => {
                self.remaining -= 1;
                Some(completion)
            }
            Err(_) => {
                // All workers gone without reporting; should not happen with panics caught
                tracing::error!("Worker pool stopped with {} items outstanding", self.remaining);
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Completions {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn items(n: usize) -> Vec<InputFile> {
        (0..n).map(|i| InputFile::new(format!("/in/{}.mp3", i))).collect()
    }

    #[test]
    fn test_every_item_completes_once() {
        let pool = WorkerPool::new(4);
        let completions: Vec<Completion> = pool
            .process(items(50), |item| Ok(item.output_path("png")))
            .unwrap()
            .collect();

        assert_eq!(completions.len(), 50);
        let unique: HashSet<_> = completions.iter().map(|c| c.item.clone()).collect();
        assert_eq!(unique.len(), 50);
        assert!(completions.iter().all(Completion::is_success));
    }

    #[test]
    fn test_failures_and_panics_are_contained() {
        let pool = WorkerPool::new(3);
        let completions: Vec<Completion> = pool
            .process(items(9), |item| {
                let name = item.path().to_string_lossy().to_string();
                if name.ends_with("3.mp3") {
                    panic!("boom");
                }
                if name.ends_with("5.mp3") {
                    return Err(ItemError::Decode(DecodeError::InvalidAudio {
                        path: item.path().to_path_buf(),
                        reason: "bad".to_string(),
                    }));
                }
                Ok(item.output_path("png"))
            })
            .unwrap()
            .collect();

        assert_eq!(completions.len(), 9);
        let failed: Vec<_> = completions.iter().filter(|c| !c.is_success()).collect();
        assert_eq!(failed.len(), 2);
        assert!(failed
            .iter()
            .any(|c| matches!(&c.outcome, Err(ItemError::Panicked(msg)) if msg == "boom")));
    }

    #[test]
    fn test_concurrency_bounded_by_size() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());

        let pool = WorkerPool::new(2);
        let count = pool
            .process(items(12), move |item| {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                a.fetch_sub(1, Ordering::SeqCst);
                Ok(item.output_path("png"))
            })
            .unwrap()
            .count();

        assert_eq!(count, 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let completions = WorkerPool::new(2)
            .process(Vec::new(), |item| Ok(item.output_path("png")))
            .unwrap();
        assert_eq!(completions.len(), 0);
        assert_eq!(completions.count(), 0);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerPool::new(0).process(items(1), |item| Ok(item.output_path("png")));
        assert!(matches!(result, Err(FatalError::PoolInit(_))));
    }
}
