use kernel_sync::SpinLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
fn guard_releases_on_drop() {
    let lock = SpinLock::new(0_u32);

    {
        let mut guard = lock.lock();
        *guard = 41;
    }

    // locking again must succeed; the previous drop unlocked
    {
        let mut guard = lock.lock();
        *guard += 1;
        assert_eq!(*guard, 42);
    }
}

#[test]
fn try_lock_fails_while_held() {
    let lock = SpinLock::new(1_u8);

    let first = lock.try_lock();
    assert!(first.is_some());

    // while the guard is live, every attempt must fail
    assert!(lock.try_lock().is_none());

    drop(first);
    assert!(lock.try_lock().is_some());
}

#[test]
fn get_mut_bypasses_locking() {
    let mut lock = SpinLock::new(vec![1, 2, 3]);
    // &mut self rules out contention; no guard needed
    lock.get_mut().push(4);
    assert_eq!(lock.lock().as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    let threads = 8;
    let iters = 5_000;

    let lock = SpinLock::new(0_usize);
    let in_cs = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..iters {
                    {
                        let mut guard = lock.lock();
                        let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(prev, 0, "mutual exclusion violated");
                        *guard += 1;
                        in_cs.fetch_sub(1, Ordering::SeqCst);
                    }
                    // yield only after releasing to reduce convoy effects
                    thread::yield_now();
                }
            });
        }
    });

    assert_eq!(*lock.lock(), threads * iters);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
}
