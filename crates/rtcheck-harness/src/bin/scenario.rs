//! Scenario bodies run by the harness, one per invocation:
//!
//! ```text
//! scenario <name>
//! ```
//!
//! Anything a body needs that is not under test (paths, files, threads) is
//! prepared before its real-time region opens.

#![allow(unsafe_code)]

use std::fs::File;
use std::hint::black_box;
use std::os::fd::AsRawFd;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rtcheck::{CheckFlags, ErrorMode, NonRealtimeContext, RealtimeContext};
use rtcheck_harness::HarnessError;

const NAP: Duration = Duration::from_millis(1);

fn mutex_then_sleep() -> std::io::Result<()> {
    let counter = Mutex::new(0u32);
    let _rt = RealtimeContext::new();
    *counter.lock() += 1;
    thread::sleep(NAP);
    Ok(())
}

fn memory_disabled() -> std::io::Result<()> {
    let _rt = RealtimeContext::new();
    rtcheck::disable_checks_for_thread(CheckFlags::MEMORY);
    let mut values: Vec<u64> = Vec::with_capacity(black_box(4));
    values.extend(0..black_box(256));
    drop(black_box(values));
    Ok(())
}

fn contended_sleepers() -> std::io::Result<()> {
    let shared = Arc::new(Mutex::new(0u64));
    let start = Arc::new(Barrier::new(2));
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let _rt = RealtimeContext::new();
                let mut guard = shared.lock();
                *guard += 1;
                thread::sleep(NAP);
                drop(guard);
            })
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .map_err(|_| std::io::Error::other("sleeper thread panicked"))?;
    }
    Ok(())
}

fn file_size() -> std::io::Result<()> {
    let exe = std::env::current_exe()?;
    let _rt = RealtimeContext::new();
    let len = File::open(&exe).and_then(|f| f.metadata()).map(|m| m.len());
    black_box(len)?;
    Ok(())
}

fn fcntl_getlk_continue() -> std::io::Result<()> {
    rtcheck::set_error_mode(ErrorMode::Continue);
    let path = std::env::temp_dir().join(format!("rtcheck-getlk-{}", std::process::id()));
    let file = File::create(&path)?;

    // SAFETY: `flock` is plain old data; all-zero is a valid value.
    let mut lock: libc::flock = unsafe { std::mem::zeroed() };
    lock.l_type = libc::F_WRLCK as libc::c_short;
    lock.l_whence = libc::SEEK_SET as libc::c_short;

    let ret = {
        let _rt = RealtimeContext::new();
        // SAFETY: valid descriptor and a live, writable `flock`.
        unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETLK, &mut lock) }
    };

    let state = if lock.l_type == libc::F_UNLCK as libc::c_short {
        "unlocked"
    } else {
        "locked"
    };
    println!("l_type={state} ret={ret}");
    drop(file);
    std::fs::remove_file(&path)
}

fn outside_realtime() -> std::io::Result<()> {
    let counter = Mutex::new(Vec::new());
    counter.lock().push(black_box(1u8));
    thread::sleep(NAP);
    drop(black_box(counter));
    Ok(())
}

fn nested_non_realtime() -> std::io::Result<()> {
    let _rt = RealtimeContext::new();
    {
        let _carve_out = NonRealtimeContext::new();
        thread::sleep(NAP);
    }
    let block: Vec<u8> = Vec::with_capacity(black_box(32));
    black_box(block);
    Ok(())
}

fn user_flagged() -> std::io::Result<()> {
    let _rt = RealtimeContext::new();
    rtcheck::log_function_if_realtime_context(c"my_unsafe_fn");
    Ok(())
}

fn partial_memory_disable() -> std::io::Result<()> {
    let block = Box::new(black_box([7u8; 64]));
    let _rt = RealtimeContext::new();
    rtcheck::disable_checks_for_thread(CheckFlags::MALLOC);
    drop(black_box(block));
    Ok(())
}

/// Bodies that make one kind of cataloged C library call, in or out of a
/// real-time region. Everything else is prepared outside the region and
/// checked after it closes.
#[cfg(target_os = "linux")]
mod leaves {
    use std::ffi::{CString, c_int, c_void};
    use std::fs;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;
    use std::ptr;

    use rtcheck::RealtimeContext;

    unsafe extern "C" {
        // Not declared by `libc` for Linux.
        fn valloc(size: libc::size_t) -> *mut c_void;
        // Bound by name so the call is never redirected to `fopen64`.
        fn fopen(path: *const libc::c_char, mode: *const libc::c_char) -> *mut libc::FILE;
    }

    const FUTEX_WAKE_PRIVATE: c_int = 1 | 128;
    const PAGE: usize = 4096;

    #[derive(Clone, Copy)]
    pub enum Region {
        Realtime,
        Plain,
    }

    impl Region {
        fn enter(self) -> Option<RealtimeContext> {
            match self {
                Region::Realtime => Some(RealtimeContext::new()),
                Region::Plain => None,
            }
        }
    }

    pub type Leaf = fn(Region) -> io::Result<()>;

    pub const LEAVES: &[(&str, Leaf)] = &[
        ("leaf_calloc", calloc),
        ("leaf_realloc", realloc),
        ("leaf_valloc", valloc_page),
        ("leaf_posix_memalign", posix_memalign),
        ("leaf_mmap", mmap),
        ("leaf_munmap", munmap),
        ("leaf_pthread_create", pthread_create),
        ("leaf_pthread_mutex", pthread_mutex),
        ("leaf_pthread_cond", pthread_cond),
        ("leaf_pthread_rwlock", pthread_rwlock),
        ("leaf_pthread_spin", pthread_spin),
        ("leaf_fopen", fopen_stream),
        ("leaf_syscall", syscall),
        ("leaf_futex", futex),
        ("leaf_sched_yield", sched_yield),
        ("leaf_sleep", sleep),
        ("leaf_usleep", usleep),
        ("leaf_nanosleep", nanosleep),
        ("leaf_clock_nanosleep", clock_nanosleep),
    ];

    pub fn find(name: &str) -> Option<Leaf> {
        LEAVES.iter().find(|(leaf, _)| *leaf == name).map(|&(_, body)| body)
    }

    pub fn all_outside_realtime() -> io::Result<()> {
        LEAVES.iter().try_for_each(|(_, body)| body(Region::Plain))
    }

    fn status(what: &str, ret: c_int) -> io::Result<()> {
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::other(format!("{what} returned {ret}")))
        }
    }

    fn block(what: &str, ptr: *mut c_void) -> io::Result<*mut c_void> {
        if ptr.is_null() {
            Err(io::Error::other(format!("{what} returned null")))
        } else {
            Ok(ptr)
        }
    }

    fn calloc(region: Region) -> io::Result<()> {
        let ptr = {
            let _rt = region.enter();
            // SAFETY: plain allocation.
            unsafe { libc::calloc(4, 16) }
        };
        // SAFETY: `ptr` came from the allocator above.
        unsafe { libc::free(block("calloc", ptr)?) };
        Ok(())
    }

    fn realloc(region: Region) -> io::Result<()> {
        // SAFETY: plain allocation.
        let small = block("malloc", unsafe { libc::malloc(16) })?;
        let grown = {
            let _rt = region.enter();
            // SAFETY: `small` is a live heap block.
            unsafe { libc::realloc(small, PAGE) }
        };
        // SAFETY: on success `grown` replaces `small`.
        unsafe { libc::free(block("realloc", grown)?) };
        Ok(())
    }

    fn valloc_page(region: Region) -> io::Result<()> {
        let ptr = {
            let _rt = region.enter();
            // SAFETY: plain allocation.
            unsafe { valloc(64) }
        };
        // SAFETY: `ptr` came from the allocator above.
        unsafe { libc::free(block("valloc", ptr)?) };
        Ok(())
    }

    fn posix_memalign(region: Region) -> io::Result<()> {
        let mut ptr = ptr::null_mut();
        let ret = {
            let _rt = region.enter();
            // SAFETY: `ptr` is a writable out-pointer; 64 is a power of two.
            unsafe { libc::posix_memalign(&mut ptr, 64, 256) }
        };
        status("posix_memalign", ret)?;
        // SAFETY: `ptr` came from the allocator above.
        unsafe { libc::free(ptr) };
        Ok(())
    }

    fn map_page() -> *mut c_void {
        // SAFETY: anonymous private mapping with no address hint.
        unsafe {
            libc::mmap(
                ptr::null_mut(),
                PAGE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        }
    }

    fn mmap(region: Region) -> io::Result<()> {
        let page = {
            let _rt = region.enter();
            map_page()
        };
        if page == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `page` is the mapping created above.
        status("munmap", unsafe { libc::munmap(page, PAGE) })
    }

    fn munmap(region: Region) -> io::Result<()> {
        let page = map_page();
        if page == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ret = {
            let _rt = region.enter();
            // SAFETY: `page` is the mapping created above.
            unsafe { libc::munmap(page, PAGE) }
        };
        status("munmap", ret)
    }

    extern "C" fn idle(arg: *mut c_void) -> *mut c_void {
        arg
    }

    fn pthread_create(region: Region) -> io::Result<()> {
        // SAFETY: placeholder handle, overwritten by `pthread_create`.
        let mut thread: libc::pthread_t = unsafe { std::mem::zeroed() };
        let (created, joined) = {
            let _rt = region.enter();
            // SAFETY: default attributes; `idle` touches nothing.
            let created =
                unsafe { libc::pthread_create(&mut thread, ptr::null(), idle, ptr::null_mut()) };
            let joined = if created == 0 {
                // SAFETY: `thread` was just created and is joinable.
                unsafe { libc::pthread_join(thread, ptr::null_mut()) }
            } else {
                created
            };
            (created, joined)
        };
        status("pthread_create", created)?;
        status("pthread_join", joined)
    }

    fn pthread_mutex(region: Region) -> io::Result<()> {
        let mut mutex = libc::PTHREAD_MUTEX_INITIALIZER;
        let (locked, unlocked) = {
            let _rt = region.enter();
            // SAFETY: statically initialized mutex owned by this frame.
            unsafe { (libc::pthread_mutex_lock(&mut mutex), libc::pthread_mutex_unlock(&mut mutex)) }
        };
        status("pthread_mutex_lock", locked)?;
        status("pthread_mutex_unlock", unlocked)
    }

    fn pthread_cond(region: Region) -> io::Result<()> {
        let mut mutex = libc::PTHREAD_MUTEX_INITIALIZER;
        let mut cond = libc::PTHREAD_COND_INITIALIZER;
        let expired = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: statically initialized mutex owned by this frame.
        status("pthread_mutex_lock", unsafe { libc::pthread_mutex_lock(&mut mutex) })?;
        let (signalled, broadcast, waited) = {
            let _rt = region.enter();
            // SAFETY: `cond` has no waiters; `mutex` is held by this thread
            // and the deadline has already passed.
            unsafe {
                (
                    libc::pthread_cond_signal(&mut cond),
                    libc::pthread_cond_broadcast(&mut cond),
                    libc::pthread_cond_timedwait(&mut cond, &mut mutex, &expired),
                )
            }
        };
        // SAFETY: the timed wait returns with `mutex` re-acquired.
        status("pthread_mutex_unlock", unsafe { libc::pthread_mutex_unlock(&mut mutex) })?;
        status("pthread_cond_signal", signalled)?;
        status("pthread_cond_broadcast", broadcast)?;
        if waited == libc::ETIMEDOUT {
            Ok(())
        } else {
            Err(io::Error::other(format!("pthread_cond_timedwait returned {waited}")))
        }
    }

    fn pthread_rwlock(region: Region) -> io::Result<()> {
        // SAFETY: storage only; `pthread_rwlock_init` sets it up.
        let mut lock: libc::pthread_rwlock_t = unsafe { std::mem::zeroed() };
        let results = {
            let _rt = region.enter();
            // SAFETY: each call sees the lock in the state the previous one
            // left it in.
            unsafe {
                [
                    libc::pthread_rwlock_init(&mut lock, ptr::null()),
                    libc::pthread_rwlock_rdlock(&mut lock),
                    libc::pthread_rwlock_unlock(&mut lock),
                    libc::pthread_rwlock_wrlock(&mut lock),
                    libc::pthread_rwlock_unlock(&mut lock),
                    libc::pthread_rwlock_destroy(&mut lock),
                ]
            }
        };
        results.into_iter().try_for_each(|ret| status("pthread_rwlock", ret))
    }

    fn pthread_spin(region: Region) -> io::Result<()> {
        let mut lock: libc::pthread_spinlock_t = 0;
        // SAFETY: `lock` is owned by this frame.
        status("pthread_spin_init", unsafe {
            libc::pthread_spin_init(&mut lock, libc::PTHREAD_PROCESS_PRIVATE)
        })?;
        let locked = {
            let _rt = region.enter();
            // SAFETY: initialized, unlocked spinlock.
            unsafe { libc::pthread_spin_lock(&mut lock) }
        };
        // SAFETY: held by this thread when `locked` is 0.
        unsafe {
            if locked == 0 {
                libc::pthread_spin_unlock(&mut lock);
            }
            libc::pthread_spin_destroy(&mut lock);
        }
        status("pthread_spin_lock", locked)
    }

    fn fopen_stream(region: Region) -> io::Result<()> {
        let exe = std::env::current_exe()?;
        let path = CString::new(exe.as_os_str().as_bytes())?;
        let stream = {
            let _rt = region.enter();
            // SAFETY: both arguments are NUL-terminated strings.
            unsafe { fopen(path.as_ptr(), c"r".as_ptr()) }
        };
        if stream.is_null() {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `stream` is the open stream from above.
        status("fclose", unsafe { libc::fclose(stream) })
    }

    fn syscall(region: Region) -> io::Result<()> {
        let pid = {
            let _rt = region.enter();
            // SAFETY: getpid takes no arguments.
            unsafe { libc::syscall(libc::SYS_getpid) }
        };
        if pid == libc::c_long::from(std::process::id() as libc::pid_t) {
            Ok(())
        } else {
            Err(io::Error::other(format!("SYS_getpid returned {pid}")))
        }
    }

    fn futex(region: Region) -> io::Result<()> {
        let mut word: u32 = 0;
        let woken = {
            let _rt = region.enter();
            // SAFETY: wakes waiters on a local word; there are none.
            unsafe {
                libc::syscall(
                    libc::SYS_futex,
                    &mut word as *mut u32,
                    FUTEX_WAKE_PRIVATE,
                    1,
                    ptr::null::<libc::timespec>(),
                    ptr::null::<u32>(),
                    0,
                )
            }
        };
        if woken == 0 {
            Ok(())
        } else {
            Err(io::Error::other(format!("FUTEX_WAKE returned {woken}")))
        }
    }

    fn sched_yield(region: Region) -> io::Result<()> {
        let ret = {
            let _rt = region.enter();
            // SAFETY: no arguments.
            unsafe { libc::sched_yield() }
        };
        status("sched_yield", ret)
    }

    fn sleep(region: Region) -> io::Result<()> {
        let left = {
            let _rt = region.enter();
            // SAFETY: no pointers involved.
            unsafe { libc::sleep(0) }
        };
        status("sleep", c_int::try_from(left).unwrap_or(c_int::MAX))
    }

    fn usleep(region: Region) -> io::Result<()> {
        let ret = {
            let _rt = region.enter();
            // SAFETY: no pointers involved.
            unsafe { libc::usleep(1) }
        };
        status("usleep", ret)
    }

    const MICROSECOND: libc::timespec = libc::timespec {
        tv_sec: 0,
        tv_nsec: 1_000,
    };

    fn nanosleep(region: Region) -> io::Result<()> {
        let ret = {
            let _rt = region.enter();
            // SAFETY: valid request; no remainder wanted.
            unsafe { libc::nanosleep(&MICROSECOND, ptr::null_mut()) }
        };
        status("nanosleep", ret)
    }

    fn clock_nanosleep(region: Region) -> io::Result<()> {
        let ret = {
            let _rt = region.enter();
            // SAFETY: valid relative request; no remainder wanted.
            unsafe {
                libc::clock_nanosleep(libc::CLOCK_MONOTONIC, 0, &MICROSECOND, ptr::null_mut())
            }
        };
        status("clock_nanosleep", ret)
    }

    /// Create a file with `open(O_CREAT, 0644)` inside a real-time region and
    /// print the mode it ends up with.
    pub fn open_creat_mode() -> io::Result<()> {
        let path = std::env::temp_dir().join(format!("rtcheck-mode-{}", std::process::id()));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let c_path = CString::new(path.as_os_str().as_bytes())?;
        let mode: libc::c_uint = 0o644;

        // SAFETY: only swaps the process file-creation mask.
        let previous = unsafe { libc::umask(0) };
        let fd = {
            let _rt = RealtimeContext::new();
            // SAFETY: NUL-terminated path; O_CREAT takes the mode argument.
            unsafe { libc::open(c_path.as_ptr(), libc::O_CREAT | libc::O_WRONLY | libc::O_TRUNC, mode) }
        };
        let opened = if fd < 0 { Err(io::Error::last_os_error()) } else { Ok(fd) };
        // SAFETY: restores the mask saved above.
        unsafe { libc::umask(previous) };
        // SAFETY: `fd` is the descriptor opened above.
        status("close", unsafe { libc::close(opened?) })?;

        let permissions = fs::metadata(&path)?.permissions().mode() & 0o777;
        println!("mode={permissions:o}");
        fs::remove_file(&path)
    }
}

fn main() -> Result<(), HarnessError> {
    // Bind the checker's API before any real-time region opens.
    let _ = rtcheck::is_loaded();

    let name = std::env::args().nth(1).unwrap_or_default();
    #[cfg(target_os = "linux")]
    if let Some(leaf) = leaves::find(&name) {
        leaf(leaves::Region::Realtime)?;
        return Ok(());
    }

    let body: fn() -> std::io::Result<()> = match name.as_str() {
        "mutex_then_sleep" => mutex_then_sleep,
        "memory_disabled" => memory_disabled,
        "contended_sleepers" => contended_sleepers,
        "file_size" => file_size,
        "fcntl_getlk_continue" => fcntl_getlk_continue,
        "outside_realtime" => outside_realtime,
        "nested_non_realtime" => nested_non_realtime,
        "user_flagged" => user_flagged,
        "partial_memory_disable" => partial_memory_disable,
        #[cfg(target_os = "linux")]
        "leaves_outside_realtime" => leaves::all_outside_realtime,
        #[cfg(target_os = "linux")]
        "open_creat_mode" => leaves::open_creat_mode,
        _ => return Err(HarnessError::UnknownScenario(name)),
    };
    body()?;
    Ok(())
}
