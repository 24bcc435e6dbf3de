//! Thread-local slot emulation.
//!
//! Typed per-thread storage for a host without language-level thread-local
//! storage in the runtime image.
//!
//! ## Design
//!
//! - **Slot table**: a process-wide table of `TLS_MINIMUM_AVAILABLE +
//!   TLS_EXPANSION_SLOTS` indices protected by a mutex. Every allocation gets
//!   a fresh sequence number so a recycled index never aliases an old slot.
//!
//! - **Per-thread lookup**: each thread keeps a native `thread_local!` vector
//!   of `(seq, value pointer)` bindings indexed by slot. `get` reads only this
//!   vector; no lock is taken on the hot path.
//!
//! - **Ownership**: values are owned by the [`ThreadLocal`] that bound them.
//!   A thread's bindings vector is itself a native thread local; when the
//!   thread exits it hands each value back to its slot, which frees it.
//!   Dropping the slot frees every value still bound, then returns the index
//!   to the table. Bindings left behind in other threads' vectors carry the
//!   old sequence number and never match again.

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::config;
use crate::error::{Result, RuntimeError};
use crate::fatal;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::structured_log::{self, LogEntry, LogLevel};

/// Slot indices every host guarantees.
pub const TLS_MINIMUM_AVAILABLE: usize = 64;

/// Additional indices available through the expansion table.
pub const TLS_EXPANSION_SLOTS: usize = 1024;

// ---------------------------------------------------------------------------
// Slot table
// ---------------------------------------------------------------------------

/// Identity of one allocated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    /// Index into the slot table and the per-thread binding vectors.
    pub index: usize,
    /// Allocation sequence number; unique for the life of the process.
    pub seq: u64,
}

/// Process-wide source of sequence numbers. 0 is never handed out.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Allocator for slot indices.
#[derive(Debug)]
pub struct SlotTable {
    /// Sequence number of the live allocation per index, 0 when free.
    slots: Vec<u64>,
    limit: Option<usize>,
}

impl SlotTable {
    /// Table whose capacity follows the runtime configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            limit: None,
        }
    }

    /// Table with a fixed capacity.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Maximum number of live slots.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or_else(|| config().tls_slot_limit)
    }

    /// Number of live slots.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|&&seq| seq != 0).count()
    }

    /// Hand out the lowest free index.
    pub fn allocate(&mut self) -> Result<SlotHandle> {
        let limit = self.limit();
        let index = match self.slots.iter().position(|&seq| seq == 0) {
            Some(i) if i < limit => i,
            _ if self.slots.len() < limit => {
                self.slots.push(0);
                self.slots.len() - 1
            }
            _ => return Err(RuntimeError::SlotsExhausted { limit }),
        };
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        self.slots[index] = seq;
        Ok(SlotHandle { index, seq })
    }

    /// Return `handle` to the table. Stale or foreign handles are ignored.
    pub fn release(&mut self, handle: SlotHandle) -> bool {
        match self.slots.get_mut(handle.index) {
            Some(seq) if *seq == handle.seq => {
                *seq = 0;
                true
            }
            _ => false,
        }
    }

    /// Returns true if `handle` is the live allocation at its index.
    #[must_use]
    pub fn is_live(&self, handle: SlotHandle) -> bool {
        self.slots.get(handle.index) == Some(&handle.seq)
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

static SLOT_TABLE: Mutex<SlotTable> = parking_lot::const_mutex(SlotTable::new());

/// Allocate an index from the process-wide table.
pub fn slot_alloc() -> Result<SlotHandle> {
    let result = SLOT_TABLE.lock().allocate();
    match &result {
        Ok(handle) => {
            RuntimeMetrics::inc(&global_metrics().tls_slots_allocated);
            structured_log::emit(
                LogEntry::new(LogLevel::Trace, "tls.slot_alloc")
                    .with_component("tls")
                    .with_slot(handle.index),
            );
        }
        Err(err) => structured_log::emit(
            LogEntry::new(LogLevel::Error, "tls.slot_exhausted")
                .with_component("tls")
                .with_message(err.to_string()),
        ),
    }
    result
}

/// Return an index to the process-wide table.
pub fn slot_free(handle: SlotHandle) -> bool {
    let released = SLOT_TABLE.lock().release(handle);
    if released {
        RuntimeMetrics::inc(&global_metrics().tls_slots_released);
    }
    released
}

/// Number of live slots in the process-wide table.
#[must_use]
pub fn slots_in_use() -> usize {
    SLOT_TABLE.lock().in_use()
}

// ---------------------------------------------------------------------------
// Per-thread bindings
// ---------------------------------------------------------------------------

/// Hands a value back to the slot that owns it.
trait Reclaim: Send + Sync {
    /// Free `value` if the slot still owns it. Returns true if freed.
    fn reclaim(&self, value: *const ()) -> bool;
}

#[derive(Clone)]
struct Binding {
    seq: u64,
    value: *const (),
    owner: Option<Arc<dyn Reclaim>>,
}

impl Binding {
    const EMPTY: Self = Self {
        seq: 0,
        value: std::ptr::null(),
        owner: None,
    };
}

/// A thread's bindings. Dropped at thread exit, releasing every value the
/// thread still has bound.
struct ThreadBindings(RefCell<Vec<Binding>>);

impl Drop for ThreadBindings {
    fn drop(&mut self) {
        let bindings = std::mem::take(self.0.get_mut());
        let mut released = 0_usize;
        for binding in bindings {
            if let Some(owner) = binding.owner {
                if owner.reclaim(binding.value) {
                    released += 1;
                }
            }
        }
        if released > 0 {
            structured_log::emit(
                LogEntry::new(LogLevel::Trace, "tls.thread_exit")
                    .with_component("tls")
                    .with_details(serde_json::json!({ "released": released })),
            );
        }
    }
}

thread_local! {
    static BINDINGS: ThreadBindings = const { ThreadBindings(RefCell::new(Vec::new())) };
}

/// Value bound to `handle` for the calling thread, or null.
fn binding_get(handle: SlotHandle) -> *const () {
    BINDINGS
        .try_with(|bindings| match bindings.0.borrow().get(handle.index) {
            Some(b) if b.seq == handle.seq => b.value,
            _ => std::ptr::null(),
        })
        .unwrap_or(std::ptr::null())
}

/// Record `value` as the calling thread's binding for `handle`.
fn binding_set(handle: SlotHandle, value: *const (), owner: Arc<dyn Reclaim>) -> Result<()> {
    BINDINGS
        .try_with(|bindings| {
            let mut bindings = bindings.0.borrow_mut();
            if bindings.len() <= handle.index {
                bindings.resize(handle.index + 1, Binding::EMPTY);
            }
            bindings[handle.index] = Binding {
                seq: handle.seq,
                value,
                owner: Some(owner),
            };
        })
        .map_err(|_| RuntimeError::BindFailed {
            index: handle.index,
        })
}

/// Forget the calling thread's binding for `handle`, if any.
fn binding_clear(handle: SlotHandle) {
    let _ = BINDINGS.try_with(|bindings| {
        if let Some(b) = bindings.0.borrow_mut().get_mut(handle.index) {
            if b.seq == handle.seq {
                *b = Binding::EMPTY;
            }
        }
    });
}

// ---------------------------------------------------------------------------
// ThreadLocal<T>
// ---------------------------------------------------------------------------

/// Every value bound to one slot. Shared with each binding thread so the
/// thread can return its value when it exits.
struct SlotValues<T> {
    values: Mutex<Vec<NonNull<T>>>,
}

// SAFETY: each pointer is a uniquely owned box. It is freed by whichever
// side removes it from `values` under the lock, possibly on another thread,
// which `T: Send` permits.
unsafe impl<T: Send> Send for SlotValues<T> {}
// SAFETY: shared access only moves pointers in and out under the lock.
unsafe impl<T: Send> Sync for SlotValues<T> {}

impl<T: Send> Reclaim for SlotValues<T> {
    fn reclaim(&self, value: *const ()) -> bool {
        let taken = {
            let mut values = self.values.lock();
            values
                .iter()
                .position(|ptr| ptr.as_ptr().cast_const().cast::<()>() == value)
                .map(|pos| values.swap_remove(pos))
        };
        let Some(ptr) = taken else {
            return false;
        };
        // SAFETY: removed from `values` under the lock; nobody else can
        // reach it to free it again.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        RuntimeMetrics::inc(&global_metrics().tls_values_freed);
        true
    }
}

/// Typed per-thread storage backed by one slot.
///
/// The constructing thread gets its value at construction; other threads
/// start unbound and may bind through [`get_or`](Self::get_or). Each thread
/// only ever sees its own value, which is freed when that thread exits or
/// when the slot is dropped, whichever comes first.
pub struct ThreadLocal<T> {
    handle: SlotHandle,
    shared: Arc<SlotValues<T>>,
    _owns: PhantomData<T>,
}

// SAFETY: values are only dereferenced by the thread that bound them, except
// in `for_each_bound` (requires `T: Sync`) and `for_each_mut`/`Drop`
// (exclusive access, requires `T: Send` to move values across threads).
unsafe impl<T: Send> Send for ThreadLocal<T> {}
// SAFETY: see above; shared access never hands one thread's `&T` to another
// unless `T: Sync`.
unsafe impl<T: Send> Sync for ThreadLocal<T> {}

impl<T: Send + 'static> ThreadLocal<T> {
    /// Allocate a slot and bind `value` for the calling thread.
    ///
    /// Slot exhaustion and bind failure are fatal.
    #[track_caller]
    pub fn new(value: T) -> Self {
        Self::try_new(value).unwrap_or_else(|err| fatal::raise(err))
    }

    /// Fallible form of [`new`](Self::new).
    pub fn try_new(value: T) -> Result<Self> {
        let handle = slot_alloc()?;
        let slot = Self {
            handle,
            shared: Arc::new(SlotValues {
                values: parking_lot::const_mutex(Vec::new()),
            }),
            _owns: PhantomData,
        };
        slot.bind(value)?;
        Ok(slot)
    }

    /// Slot identity.
    #[must_use]
    pub fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// The calling thread's value, or `None` if it never bound one.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        let ptr = binding_get(self.handle).cast::<T>();
        // SAFETY: a non-null binding with our sequence number was produced by
        // `bind` on this thread. It is freed only by `Drop` or by this
        // thread's exit, and neither can overlap a live `&self` here.
        unsafe { ptr.as_ref() }
    }

    /// The calling thread's value, binding `init()` first if needed.
    ///
    /// Bind failure is fatal.
    #[track_caller]
    pub fn get_or<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.try_get_or(init).unwrap_or_else(|err| fatal::raise(err))
    }

    /// Fallible form of [`get_or`](Self::get_or).
    pub fn try_get_or<F>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> T,
    {
        match self.get() {
            Some(value) => Ok(value),
            None => self.bind(init()),
        }
    }

    /// Returns true if the calling thread has a value.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !binding_get(self.handle).is_null()
    }

    /// Number of values currently bound across all threads.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.shared.values.lock().len()
    }

    /// Visit every bound value, whichever thread bound it.
    ///
    /// Threads exiting meanwhile wait until the visit finishes.
    pub fn for_each_bound<F>(&self, mut f: F)
    where
        F: FnMut(&T),
        T: Sync,
    {
        for ptr in self.shared.values.lock().iter() {
            // SAFETY: values leave the list only under this lock; `T: Sync`
            // allows shared access from this thread.
            f(unsafe { ptr.as_ref() });
        }
    }

    /// Mutable access to every bound value.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for ptr in self.shared.values.lock().iter_mut() {
            // SAFETY: `&mut self` excludes every outstanding `&T`, the lock
            // keeps exiting threads from freeing, and each pointer is a
            // distinct live allocation.
            f(unsafe { ptr.as_mut() });
        }
    }

    fn bind(&self, value: T) -> Result<&T> {
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        let owner: Arc<dyn Reclaim> = Arc::clone(&self.shared) as Arc<dyn Reclaim>;
        if let Err(err) = binding_set(self.handle, ptr.as_ptr().cast_const().cast(), owner) {
            // SAFETY: `ptr` came from `Box::leak` above and was never shared.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
            structured_log::emit(
                LogEntry::new(LogLevel::Error, "tls.bind_failed")
                    .with_component("tls")
                    .with_slot(self.handle.index),
            );
            return Err(err);
        }
        self.shared.values.lock().push(ptr);
        RuntimeMetrics::inc(&global_metrics().tls_values_bound);
        // SAFETY: the allocation stays in `self.shared` until `Drop` or this
        // thread's exit.
        Ok(unsafe { ptr.as_ref() })
    }
}

impl<T: Send + 'static> Deref for ThreadLocal<T> {
    type Target = T;

    /// The calling thread's value; dereferencing an unbound slot is fatal.
    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => fatal::raise(RuntimeError::Unbound {
                index: self.handle.index,
            }),
        }
    }
}

impl<T> Drop for ThreadLocal<T> {
    fn drop(&mut self) {
        binding_clear(self.handle);
        let values = std::mem::take(&mut *self.shared.values.lock());
        let freed = values.len() as u64;
        for ptr in values {
            // SAFETY: each pointer came from `Box::leak` in `bind`; taking
            // the list under the lock means no exiting thread frees it too.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
        RuntimeMetrics::add(&global_metrics().tls_values_freed, freed);
        slot_free(self.handle);
    }
}

impl<T: fmt::Debug + Send + 'static> fmt::Debug for ThreadLocal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocal")
            .field("handle", &self.handle)
            .field("local", &self.get())
            .field("bound", &self.bound_count())
            .finish()
    }
}
