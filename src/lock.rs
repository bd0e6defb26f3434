use std::sync::{Mutex, MutexGuard};

/// Take a mutex even if a previous holder panicked; session state stays usable
/// after a worker panic so `stop()` can still tear the session down.
pub(crate) fn lock_or_recover<'a, T: ?Sized>(
    lock: &'a Mutex<T>,
    context: &str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            crate::log_debug(&format!("Mutex poisoned in {context}; recovering"));
            poisoned.into_inner()
        }
    }
}
