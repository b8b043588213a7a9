//! Thread and synchronization wrappers.

use std::ffi::{c_int, c_void};

use libc::{
    pthread_attr_t, pthread_cond_t, pthread_mutex_t, pthread_rwlock_t, pthread_rwlockattr_t,
    pthread_t, timespec,
};
use rtcheck_core::CheckFlags;

type StartRoutine = extern "C" fn(*mut c_void) -> *mut c_void;

intercept! {
    fn pthread_create(
        thread: *mut pthread_t,
        attr: *const pthread_attr_t,
        start: StartRoutine,
        arg: *mut c_void,
    ) -> c_int => CheckFlags::PTHREAD_CREATE;
    fn pthread_join(thread: pthread_t, retval: *mut *mut c_void) -> c_int
        => CheckFlags::PTHREAD_JOIN;

    fn pthread_mutex_lock(mutex: *mut pthread_mutex_t) -> c_int
        => CheckFlags::PTHREAD_MUTEX_LOCK;
    fn pthread_mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int
        => CheckFlags::PTHREAD_MUTEX_UNLOCK;

    fn pthread_cond_signal(cond: *mut pthread_cond_t) -> c_int
        => CheckFlags::PTHREAD_COND_SIGNAL;
    fn pthread_cond_broadcast(cond: *mut pthread_cond_t) -> c_int
        => CheckFlags::PTHREAD_COND_BROADCAST;
    fn pthread_cond_wait(cond: *mut pthread_cond_t, mutex: *mut pthread_mutex_t) -> c_int
        => CheckFlags::PTHREAD_COND_WAIT;
    fn pthread_cond_timedwait(
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec,
    ) -> c_int => CheckFlags::PTHREAD_COND_TIMEDWAIT;

    fn pthread_rwlock_init(rwlock: *mut pthread_rwlock_t, attr: *const pthread_rwlockattr_t)
        -> c_int => CheckFlags::PTHREAD_RWLOCK_INIT;
    fn pthread_rwlock_destroy(rwlock: *mut pthread_rwlock_t) -> c_int
        => CheckFlags::PTHREAD_RWLOCK_DESTROY;
    fn pthread_rwlock_rdlock(rwlock: *mut pthread_rwlock_t) -> c_int
        => CheckFlags::PTHREAD_RWLOCK_RDLOCK;
    fn pthread_rwlock_wrlock(rwlock: *mut pthread_rwlock_t) -> c_int
        => CheckFlags::PTHREAD_RWLOCK_WRLOCK;
    fn pthread_rwlock_unlock(rwlock: *mut pthread_rwlock_t) -> c_int
        => CheckFlags::PTHREAD_RWLOCK_UNLOCK;
}

#[cfg(target_os = "linux")]
intercept! {
    fn pthread_spin_lock(lock: *mut libc::pthread_spinlock_t) -> c_int
        => CheckFlags::PTHREAD_SPIN_LOCK;
}
