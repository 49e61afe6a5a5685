use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::cache::{DirectoryCache, DirectoryListing, resolve_dir};
use crate::fs::DirSignature;
use crate::scanner::{CancelFlag, DirectoryScanner, ScanError, ScanOutcome, degraded_listing};

#[derive(Debug)]
enum SlotState {
    Running,
    Done(DirectoryListing),
    Cancelled,
}

#[derive(Debug)]
struct ScanSlot {
    state: Mutex<SlotState>,
    done: Condvar,
    cancel: CancelFlag,
}

impl ScanSlot {
    fn running() -> Self {
        Self {
            state: Mutex::new(SlotState::Running),
            done: Condvar::new(),
            cancel: CancelFlag::new(),
        }
    }

    fn finished(listing: DirectoryListing) -> Self {
        Self {
            state: Mutex::new(SlotState::Done(listing)),
            done: Condvar::new(),
            cancel: CancelFlag::new(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    scanner: DirectoryScanner,
    cache: Mutex<DirectoryCache>,
    in_flight: Mutex<HashMap<PathBuf, Arc<ScanSlot>>>,
}

#[derive(Clone)]
struct ScanJob {
    key: PathBuf,
    scan_dir: PathBuf,
    signature: Option<DirSignature>,
    slot: Arc<ScanSlot>,
}

/// Scans directories on worker threads and publishes into a shared cache.
///
/// At most one scan runs per directory; concurrent requests for the same
/// directory share it. Listings are published whole, so readers never see
/// a partial directory.
#[derive(Clone, Debug)]
pub struct ScanService {
    shared: Arc<Shared>,
}

impl ScanService {
    /// Creates a service over `scanner` publishing into `cache`.
    pub fn new(scanner: DirectoryScanner, cache: DirectoryCache) -> Self {
        Self {
            shared: Arc::new(Shared {
                scanner,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The scanner used by workers.
    pub fn scanner(&self) -> &DirectoryScanner {
        &self.shared.scanner
    }

    /// Requests the listing of `dir`.
    ///
    /// A valid cached listing completes the ticket immediately. Otherwise a
    /// worker is started, or the ticket joins the scan already running for
    /// the same directory.
    pub fn request(&self, dir: &Path) -> ScanTicket {
        let fs = self.shared.scanner.file_system();
        let (scan_dir, key) = resolve_dir(fs, dir);
        let signature = fs.signature(&scan_dir).ok();

        let job = {
            let mut in_flight = self.shared.in_flight.lock();
            if let Some(slot) = in_flight.get(&key) {
                trace_request_joined(&key);
                return self.ticket(key, slot.clone());
            }
            if let Some(listing) = self.shared.cache.lock().lookup_valid(&key, signature) {
                return self.ticket(key, Arc::new(ScanSlot::finished(listing)));
            }
            let slot = Arc::new(ScanSlot::running());
            in_flight.insert(key.clone(), slot.clone());
            ScanJob {
                key,
                scan_dir,
                signature,
                slot,
            }
        };

        let ticket = self.ticket(job.key.clone(), job.slot.clone());
        let shared = self.shared.clone();
        let worker_job = job.clone();
        let spawned = std::thread::Builder::new()
            .name("tracker-scan".to_string())
            .spawn(move || run_job(&shared, worker_job));
        if let Err(err) = spawned {
            debug_spawn_failed(&err);
            run_job(&self.shared, job);
        }
        ticket
    }

    /// Convenience for `request(dir).wait()`.
    pub fn get_blocking(&self, dir: &Path) -> Option<DirectoryListing> {
        self.request(dir).wait()
    }

    /// Drops the cached listing of `dir`.
    pub fn invalidate(&self, dir: &Path) -> bool {
        let key = resolve_dir(self.shared.scanner.file_system(), dir).1;
        self.shared.cache.lock().invalidate_key(&key)
    }

    /// Number of scans currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    /// Runs `f` with the shared cache locked.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut DirectoryCache) -> R) -> R {
        f(&mut self.shared.cache.lock())
    }

    fn ticket(&self, key: PathBuf, slot: Arc<ScanSlot>) -> ScanTicket {
        ScanTicket {
            key,
            slot,
            shared: self.shared.clone(),
        }
    }
}

/// Handle to a requested listing.
#[derive(Debug)]
pub struct ScanTicket {
    key: PathBuf,
    slot: Arc<ScanSlot>,
    shared: Arc<Shared>,
}

impl ScanTicket {
    /// Normalized directory key of the request.
    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Blocks until the scan finishes. Returns `None` if it was cancelled.
    pub fn wait(&self) -> Option<DirectoryListing> {
        let mut state = self.slot.state.lock();
        loop {
            match &*state {
                SlotState::Done(listing) => return Some(listing.clone()),
                SlotState::Cancelled => return None,
                SlotState::Running => {}
            }
            self.slot.done.wait(&mut state);
        }
    }

    /// Returns the listing if the scan has finished, without blocking.
    pub fn try_take(&self) -> Option<DirectoryListing> {
        match &*self.slot.state.lock() {
            SlotState::Done(listing) => Some(listing.clone()),
            _ => None,
        }
    }

    /// Whether the scan finished or was cancelled.
    pub fn is_finished(&self) -> bool {
        !matches!(*self.slot.state.lock(), SlotState::Running)
    }

    /// Cancels the scan for every ticket sharing it. Nothing is published.
    /// Returns `false` if the scan had already finished.
    pub fn cancel(&self) -> bool {
        let mut state = self.slot.state.lock();
        if !matches!(*state, SlotState::Running) {
            return false;
        }
        *state = SlotState::Cancelled;
        self.slot.cancel.cancel();
        remove_in_flight(&self.shared, &self.key, &self.slot);
        self.slot.done.notify_all();
        trace_scan_cancelled(&self.key);
        true
    }
}

fn run_job(shared: &Shared, job: ScanJob) {
    let result = shared
        .scanner
        .scan_cancellable(&job.scan_dir, &job.slot.cancel);
    let outcome = match result {
        Ok(entries) => ScanOutcome {
            entries,
            error: None,
        },
        Err(ScanError::Cancelled { .. }) => return,
        Err(err) => ScanOutcome {
            entries: degraded_listing(&job.scan_dir),
            error: Some(err),
        },
    };

    let mut state = job.slot.state.lock();
    if !matches!(*state, SlotState::Running) {
        return;
    }
    let listing = shared.cache.lock().store(
        job.key.clone(),
        job.signature,
        DirectoryListing::from_outcome(job.scan_dir, outcome),
    );
    remove_in_flight(shared, &job.key, &job.slot);
    trace_scan_published(&job.key, listing.entries.len());
    *state = SlotState::Done(listing);
    job.slot.done.notify_all();
}

fn remove_in_flight(shared: &Shared, key: &Path, slot: &Arc<ScanSlot>) {
    let mut in_flight = shared.in_flight.lock();
    if in_flight.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
        in_flight.remove(key);
    }
}

#[cfg(feature = "tracing")]
fn trace_request_joined(key: &Path) {
    trace!(event = "service.joined", dir = %key.display(), "joined running scan");
}

#[cfg(not(feature = "tracing"))]
fn trace_request_joined(_key: &Path) {}

#[cfg(feature = "tracing")]
fn trace_scan_cancelled(key: &Path) {
    trace!(event = "service.cancelled", dir = %key.display(), "scan cancelled");
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_cancelled(_key: &Path) {}

#[cfg(feature = "tracing")]
fn trace_scan_published(key: &Path, total_entries: usize) {
    trace!(
        event = "service.published",
        dir = %key.display(),
        total_entries,
        "listing published"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_scan_published(_key: &Path, _total_entries: usize) {}

#[cfg(feature = "tracing")]
fn debug_spawn_failed(err: &std::io::Error) {
    debug!(event = "service.spawn_failed", error = %err, "scanning inline");
}

#[cfg(not(feature = "tracing"))]
fn debug_spawn_failed(_err: &std::io::Error) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FormatDescriptor, FormatTable};
    use crate::entry::{ExtendedMetadata, FormatFamily};
    use crate::fs::test_fs::TestFs;
    use crate::probe::{ProbeError, ProbeTable};

    /// Blocks probers until released.
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        changed: Condvar,
        entered: Mutex<usize>,
        entered_changed: Condvar,
    }

    impl Gate {
        fn pass(&self) {
            {
                let mut entered = self.entered.lock();
                *entered += 1;
                self.entered_changed.notify_all();
            }
            let mut open = self.open.lock();
            while !*open {
                self.changed.wait(&mut open);
            }
        }

        fn wait_entered(&self) {
            let mut entered = self.entered.lock();
            while *entered == 0 {
                self.entered_changed.wait(&mut entered);
            }
        }

        fn release(&self) {
            *self.open.lock() = true;
            self.changed.notify_all();
        }
    }

    fn service(fs: Arc<TestFs>, gate: Arc<Gate>) -> ScanService {
        let formats = FormatTable::new().with(
            FormatDescriptor::new("its", FormatFamily::Sample)
                .extensions(["its"])
                .signature(0, *b"IMPS"),
        );
        let mut probers = ProbeTable::new();
        probers.register("its", move |_: &Path| -> Result<ExtendedMetadata, ProbeError> {
            gate.pass();
            Ok(ExtendedMetadata::default())
        });
        ScanService::new(
            DirectoryScanner::from_shared(fs, formats, probers),
            DirectoryCache::new(),
        )
    }

    fn lib_fs() -> Arc<TestFs> {
        let fs = Arc::new(TestFs::default());
        fs.add_file("/lib", "a.its", b"IMPS");
        fs.add_file("/lib", "b.its", b"IMPS");
        fs
    }

    #[test]
    fn concurrent_requests_share_one_scan() {
        let fs = lib_fs();
        let gate = Arc::new(Gate::default());
        let svc = service(fs.clone(), gate.clone());

        let first = svc.request(Path::new("/lib"));
        gate.wait_entered();
        let second = svc.request(Path::new("/lib"));
        assert_eq!(svc.in_flight(), 1);
        assert!(second.try_take().is_none());

        gate.release();
        let a = first.wait().unwrap();
        let b = second.wait().unwrap();
        assert!(Arc::ptr_eq(&a.entries, &b.entries));
        assert_eq!(a.entries.len(), 3);
        assert_eq!(fs.read_dir_count(), 1);
        assert_eq!(svc.in_flight(), 0);
        assert!(first.is_finished());
    }

    #[test]
    fn cached_listing_completes_immediately() {
        let fs = lib_fs();
        let gate = Arc::new(Gate::default());
        gate.release();
        let svc = service(fs.clone(), gate);

        svc.get_blocking(Path::new("/lib")).unwrap();
        let ticket = svc.request(Path::new("/lib"));
        assert!(ticket.is_finished());
        assert!(ticket.try_take().is_some());
        assert_eq!(fs.read_dir_count(), 1);
        assert_eq!(svc.with_cache(|c| c.stats().hits), 1);
    }

    #[test]
    fn cancel_publishes_nothing() {
        let fs = lib_fs();
        let gate = Arc::new(Gate::default());
        let svc = service(fs, gate.clone());

        let ticket = svc.request(Path::new("/lib"));
        gate.wait_entered();
        assert!(ticket.cancel());
        assert_eq!(svc.in_flight(), 0);
        gate.release();

        assert!(ticket.wait().is_none());
        assert!(!ticket.cancel());
        assert!(svc.with_cache(|c| c.is_empty()));
    }

    #[test]
    fn request_after_cancel_starts_fresh_scan() {
        let fs = lib_fs();
        let gate = Arc::new(Gate::default());
        let svc = service(fs, gate.clone());

        let cancelled = svc.request(Path::new("/lib"));
        gate.wait_entered();
        cancelled.cancel();

        let fresh = svc.request(Path::new("/lib"));
        gate.release();
        assert!(cancelled.wait().is_none());
        let listing = fresh.wait().unwrap();
        assert_eq!(listing.entries.len(), 3);
    }

    #[test]
    fn unreadable_directory_publishes_degraded_listing() {
        let fs = lib_fs();
        fs.set_error("/lib", std::io::ErrorKind::PermissionDenied);
        let svc = service(fs, Arc::new(Gate::default()));
        let listing = svc.get_blocking(Path::new("/lib")).unwrap();
        assert!(listing.is_degraded());
        assert_eq!(listing.entries.len(), 1);
        assert!(svc.invalidate(Path::new("/lib")));
    }
}
