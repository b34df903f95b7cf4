//! Worker-thread engine for asynchronous transfers.
//!
//! Each worker owns a bounded inbox (capacity = queue depth) and processes
//! jobs sequentially on its own thread. An operation is split into jobs by
//! [`plan_jobs`]; jobs are assigned round-robin. The job that finishes an
//! operation last runs validation and reports completion.
//!
//! # Design
//!
//! - Plain synchronous threads, no async runtime.
//! - A full inbox pushes back on the submitter, which yields until space
//!   frees up. Submission never drops a job.
//! - Idle workers park; submitters unpark the target worker after a push.

use std::fs::File;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, Thread};

use blockio_device::validate::verify_file_contents;
use blockio_device::{Buffer, DeviceError, DeviceSettings, TransferError};
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;

use crate::completion::Completion;
use crate::positional::{Direction, plan_jobs, transfer_range};

/// One read or write in flight, shared by all of its jobs.
pub(crate) struct Operation {
    pub(crate) direction: Direction,
    pub(crate) buffer: Buffer,
    pub(crate) file: File,
    pub(crate) path: PathBuf,
    pub(crate) validate: bool,
    pub(crate) block_size: usize,
}

impl Operation {
    /// Runs the whole operation on the calling thread.
    pub(crate) fn run_inline(&self) -> Result<(), TransferError> {
        transfer_range(
            self.direction,
            &self.buffer,
            &self.file,
            &self.path,
            0..self.buffer.len(),
            self.block_size,
        )?;
        self.validate_if_requested()
    }

    fn validate_if_requested(&self) -> Result<(), TransferError> {
        if self.validate {
            verify_file_contents(&self.path, &self.buffer.bytes())?;
        }
        Ok(())
    }
}

struct InFlight {
    op: Operation,
    remaining: AtomicUsize,
    failure: Mutex<Option<TransferError>>,
    completion: Arc<Completion>,
}

impl InFlight {
    fn run_job(&self, range: Range<usize>) {
        let op = &self.op;
        if let Err(e) = transfer_range(
            op.direction,
            &op.buffer,
            &op.file,
            &op.path,
            range,
            op.block_size,
        ) {
            let mut failure = self.failure.lock();
            if failure.is_none() {
                *failure = Some(e);
            }
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.complete();
        }
    }

    fn complete(&self) {
        let failure = self.failure.lock().take();
        let result = match failure {
            Some(e) => Err(e),
            None => self.op.validate_if_requested(),
        };
        if let Err(e) = &result {
            tracing::debug!(path = %self.op.path.display(), error = %e, "asynchronous transfer failed");
        }
        self.completion.finish(result);
    }
}

enum Job {
    Transfer {
        inflight: Arc<InFlight>,
        range: Range<usize>,
    },
    Shutdown,
}

struct Worker {
    inbox: Arc<ArrayQueue<Job>>,
    waker: Thread,
    handle: Option<JoinHandle<()>>,
}

/// Pool of I/O worker threads sharing one completion tracker.
pub(crate) struct Engine {
    workers: Vec<Worker>,
    next_worker: AtomicUsize,
    completion: Arc<Completion>,
    single_submit: bool,
    overlap_events: bool,
}

impl Engine {
    /// Spawns `settings.thread_count` workers with `settings.queue_depth`
    /// inbox slots each.
    pub(crate) fn start(settings: &DeviceSettings) -> Result<Self, DeviceError> {
        // Built incrementally so a spawn failure shuts down the workers that
        // did start, via Drop.
        let mut engine = Self {
            workers: Vec::with_capacity(settings.thread_count),
            next_worker: AtomicUsize::new(0),
            completion: Arc::new(Completion::default()),
            single_submit: settings.single_submit,
            overlap_events: settings.overlap_events,
        };
        for index in 0..settings.thread_count {
            let inbox = Arc::new(ArrayQueue::new(settings.queue_depth));
            let worker_inbox = Arc::clone(&inbox);
            let handle = thread::Builder::new()
                .name(format!("blockio-posix-{index}"))
                .spawn(move || Self::worker_loop(&worker_inbox))
                .map_err(|e| DeviceError::Backend(format!("failed to spawn I/O worker: {e}")))?;
            engine.workers.push(Worker {
                inbox,
                waker: handle.thread().clone(),
                handle: Some(handle),
            });
        }
        Ok(engine)
    }

    fn worker_loop(inbox: &ArrayQueue<Job>) {
        loop {
            match inbox.pop() {
                Some(Job::Transfer { inflight, range }) => inflight.run_job(range),
                Some(Job::Shutdown) => break,
                None => thread::park(),
            }
        }
    }

    /// Queues `op` and returns once every job has been accepted by a worker.
    ///
    /// Returns the number of bytes submitted.
    pub(crate) fn submit(&self, op: Operation) -> usize {
        if !self.overlap_events {
            self.completion.wait_idle();
        }

        let len = op.buffer.len();
        let jobs = plan_jobs(len, op.block_size, self.workers.len(), self.single_submit);
        self.completion.begin();
        tracing::debug!(
            path = %op.path.display(),
            bytes = len,
            jobs = jobs.len(),
            direction = ?op.direction,
            "submitting asynchronous transfer"
        );

        let inflight = Arc::new(InFlight {
            op,
            remaining: AtomicUsize::new(jobs.len()),
            failure: Mutex::new(None),
            completion: Arc::clone(&self.completion),
        });
        if jobs.is_empty() {
            inflight.complete();
            return 0;
        }

        for range in jobs {
            let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
            Self::push(
                &self.workers[index],
                Job::Transfer {
                    inflight: Arc::clone(&inflight),
                    range,
                },
            );
        }
        len
    }

    fn push(worker: &Worker, job: Job) {
        let mut job = job;
        loop {
            match worker.inbox.push(job) {
                Ok(()) => break,
                Err(rejected) => {
                    job = rejected;
                    worker.waker.unpark();
                    thread::yield_now();
                }
            }
        }
        worker.waker.unpark();
    }

    pub(crate) fn completion(&self) -> &Completion {
        &self.completion
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Never abandon submitted work: the buffers and files stay valid
        // until the last job ends.
        self.completion.wait_idle();

        for worker in &self.workers {
            Self::push(worker, Job::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;

    use blockio_device::ElementType;

    use super::*;

    fn settings(threads: usize, queue_depth: usize, single_submit: bool) -> DeviceSettings {
        DeviceSettings {
            block_size: 4096,
            queue_depth,
            single_submit,
            overlap_events: true,
            thread_count: threads,
        }
    }

    fn write_op(path: &std::path::Path, buffer: Buffer) -> Operation {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .unwrap();
        file.set_len(buffer.len() as u64).unwrap();
        Operation {
            direction: Direction::Write,
            buffer,
            file,
            path: path.to_path_buf(),
            validate: false,
            block_size: 4096,
        }
    }

    #[test]
    fn engine_spawns_requested_workers() {
        let engine = Engine::start(&settings(3, 4, false)).unwrap();
        assert_eq!(engine.worker_count(), 3);
    }

    #[test]
    fn submitted_write_lands_after_drain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.bin");
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
        let buffer = Buffer::from_bytes(ElementType::U8, &data).unwrap();

        // Tiny queue depth with per-block jobs exercises backpressure.
        let engine = Engine::start(&settings(2, 1, true)).unwrap();
        assert_eq!(engine.submit(write_op(&path, buffer)), data.len());
        assert_eq!(engine.completion().drain().unwrap(), 1);

        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn empty_operation_completes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        let engine = Engine::start(&settings(1, 4, false)).unwrap();

        assert_eq!(engine.submit(write_op(&path, Buffer::zeroed(ElementType::U8, 0))), 0);
        assert_eq!(engine.completion().drain().unwrap(), 1);
    }

    #[test]
    fn drop_waits_for_in_flight_work() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.bin");
        let data = vec![0xA5u8; 64 * 1024];
        let buffer = Buffer::from_bytes(ElementType::U8, &data).unwrap();

        {
            let engine = Engine::start(&settings(2, 8, false)).unwrap();
            engine.submit(write_op(&path, buffer));
        }

        assert_eq!(std::fs::read(&path).unwrap(), data);
    }
}
