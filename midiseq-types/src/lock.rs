//! Exclusion between the real-time player and the editor.
//!
//! The editor side blocks and may nest: an editing operation that calls
//! another editing operation only releases the underlying mutex when the
//! outermost guard drops. The player side never waits. `player_try_lock`
//! makes exactly one attempt and hands back `None` on contention, so the
//! audio thread can skip a tick instead of stalling.
//!
//! Every editor acquisition raises a dirty flag. The player consumes it with
//! [`MidiLock::data_model_dirty`] to learn that the data moved under it.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::lock_api::RawMutex as _;
use parking_lot::{Mutex, RawMutex};

pub struct MidiLock<T> {
    raw: RawMutex,
    editor_owner: Mutex<Option<ThreadId>>,
    editor_depth: AtomicU32,
    dirty: AtomicBool,
    data: RefCell<T>,
}

// Safety: `data` is only reachable through a guard, guards only exist while
// `raw` is held, and nested editor guards are confined to the owning thread
// (guards are !Send). The RefCell borrow flag is therefore never touched by
// two threads without the mutex ordering them.
unsafe impl<T: Send> Sync for MidiLock<T> {}

impl<T> MidiLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            raw: RawMutex::INIT,
            editor_owner: Mutex::new(None),
            editor_depth: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            data: RefCell::new(data),
        }
    }

    /// Blocking, reentrant acquisition for the editor thread.
    pub fn editor_lock(&self) -> EditorGuard<'_, T> {
        self.editor_acquire();
        self.dirty.store(true, Ordering::Release);
        EditorGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Editor acquisition for inspection only. Leaves the dirty flag alone,
    /// so looking at the model does not restart playback.
    pub fn editor_read(&self) -> EditorReadGuard<'_, T> {
        self.editor_acquire();
        EditorReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    fn editor_acquire(&self) {
        let me = thread::current().id();
        let reentered = {
            let owner = self.editor_owner.lock();
            *owner == Some(me)
        };
        if reentered {
            self.editor_depth.fetch_add(1, Ordering::AcqRel);
        } else {
            self.raw.lock();
            *self.editor_owner.lock() = Some(me);
            self.editor_depth.store(1, Ordering::Release);
        }
    }

    /// Single non-blocking attempt for the real-time thread.
    pub fn player_try_lock(&self) -> Option<PlayerGuard<'_, T>> {
        if self.raw.try_lock() {
            Some(PlayerGuard {
                lock: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// Whether an editor lock cycle happened since the last call. Clears the flag.
    pub fn data_model_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Nesting depth of the editor lock; 0 when the editor does not hold it.
    pub fn editor_depth(&self) -> u32 {
        self.editor_depth.load(Ordering::Acquire)
    }

    /// Direct access when nothing else can be holding the lock.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn editor_unlock(&self) {
        if self.editor_depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            *self.editor_owner.lock() = None;
            // Safety: depth reached zero on the owning thread, which holds `raw`.
            unsafe { self.raw.unlock() };
        }
    }
}

impl<T: Default> Default for MidiLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for MidiLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiLock")
            .field("locked", &self.is_locked())
            .field("editor_depth", &self.editor_depth())
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish()
    }
}

/// Editor-side guard. Derefs to the protected `RefCell`.
pub struct EditorGuard<'a, T> {
    lock: &'a MidiLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for EditorGuard<'_, T> {
    type Target = RefCell<T>;

    fn deref(&self) -> &RefCell<T> {
        &self.lock.data
    }
}

impl<T> Drop for EditorGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.editor_unlock();
    }
}

/// Editor-side read guard.
pub struct EditorReadGuard<'a, T> {
    lock: &'a MidiLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> EditorReadGuard<'_, T> {
    pub fn data(&self) -> Ref<'_, T> {
        self.lock.data.borrow()
    }
}

impl<T> Drop for EditorReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.editor_unlock();
    }
}

/// Player-side guard. Read-only.
pub struct PlayerGuard<'a, T> {
    lock: &'a MidiLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> PlayerGuard<'_, T> {
    pub fn data(&self) -> Ref<'_, T> {
        self.lock.data.borrow()
    }
}

impl<T> Drop for PlayerGuard<'_, T> {
    fn drop(&mut self) {
        // Safety: this guard was created by a successful try_lock.
        unsafe { self.lock.raw.unlock() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn player_locks_when_free() {
        let lock = MidiLock::new(5);
        let guard = lock.player_try_lock().expect("free lock");
        assert_eq!(*guard.data(), 5);
        assert!(lock.is_locked());
        drop(guard);
        assert!(!lock.is_locked());
    }

    #[test]
    fn player_fails_while_editor_holds() {
        let lock = MidiLock::new(0);
        let editor = lock.editor_lock();
        assert!(lock.player_try_lock().is_none());
        drop(editor);
        assert!(lock.player_try_lock().is_some());
    }

    #[test]
    fn editor_nests_and_releases_at_outermost() {
        let lock = MidiLock::new(0);
        let outer = lock.editor_lock();
        {
            let inner = lock.editor_lock();
            *inner.borrow_mut() += 1;
            assert_eq!(lock.editor_depth(), 2);
        }
        assert_eq!(lock.editor_depth(), 1);
        assert!(lock.player_try_lock().is_none());
        *outer.borrow_mut() += 1;
        drop(outer);
        assert_eq!(lock.editor_depth(), 0);
        assert_eq!(*lock.player_try_lock().unwrap().data(), 2);
    }

    #[test]
    fn dirty_flag_is_consumed() {
        let lock = MidiLock::new(());
        assert!(!lock.data_model_dirty());
        drop(lock.editor_lock());
        assert!(lock.data_model_dirty());
        assert!(!lock.data_model_dirty());
    }

    #[test]
    fn player_lock_does_not_dirty() {
        let lock = MidiLock::new(());
        drop(lock.player_try_lock());
        assert!(!lock.data_model_dirty());
    }

    #[test]
    fn editor_read_excludes_player_without_dirtying() {
        let lock = MidiLock::new(5u32);
        {
            let read = lock.editor_read();
            assert_eq!(*read.data(), 5);
            let nested = lock.editor_lock();
            assert_eq!(lock.editor_depth(), 2);
            drop(nested);
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert!(lock.data_model_dirty());

        drop(lock.editor_read());
        assert!(!lock.data_model_dirty());
    }

    #[test]
    fn player_never_blocks_on_other_thread_editor() {
        let lock = Arc::new(MidiLock::new(0u32));
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let editor_lock = Arc::clone(&lock);
        let editor = std::thread::spawn(move || {
            let guard = editor_lock.editor_lock();
            *guard.borrow_mut() = 7;
            locked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        locked_rx.recv().unwrap();
        assert!(lock.player_try_lock().is_none());
        release_tx.send(()).unwrap();
        editor.join().unwrap();
        assert!(lock.data_model_dirty());
        assert_eq!(*lock.player_try_lock().unwrap().data(), 7);
    }

    #[test]
    fn editor_waits_for_player() {
        let lock = Arc::new(MidiLock::new(0u32));
        let player = lock.player_try_lock().unwrap();
        let (done_tx, done_rx) = mpsc::channel();
        let editor_lock = Arc::clone(&lock);
        let editor = std::thread::spawn(move || {
            let guard = editor_lock.editor_lock();
            *guard.borrow_mut() += 1;
            done_tx.send(()).unwrap();
        });
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(player);
        done_rx.recv().unwrap();
        editor.join().unwrap();
        assert_eq!(*lock.player_try_lock().unwrap().data(), 1);
    }
}
