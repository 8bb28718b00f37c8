//! Connection pool behaviour under contention.
//!
//! The pool must never let `created` pass `max_connections`, must never block, and must
//! hand released connections back out before opening new ones.

mod common;

use docguard::connection::ConnectionParams;
use docguard::pool::ConnectionPool;
use docguard::store::memory::MemoryStore;
use docguard::OrmError;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pool(max_connections: usize) -> (Arc<ConnectionPool>, MemoryStore) {
    let store = MemoryStore::new().with_database(common::DATABASE);
    let pool = ConnectionPool::new(Arc::new(store.clone()));
    pool.configure(max_connections, ConnectionParams::default());
    (Arc::new(pool), store)
}

#[test]
fn test_two_connection_scenario() {
    let (pool, _) = pool(2);

    let first = pool.get().expect("Failed to get first connection");
    let second = pool.get().expect("Failed to get second connection");
    assert_ne!(first.serial(), second.serial());

    match pool.get() {
        Err(OrmError::PoolExhausted { max_connections }) => assert_eq!(max_connections, 2),
        other => panic!("expected PoolExhausted, got {other:?}"),
    }

    let released = first.serial();
    pool.put(first);
    let fourth = pool.get().expect("Failed to get connection after put");
    assert_eq!(fourth.serial(), released, "the released connection is recycled first");
    assert!(pool.created() <= 2);

    pool.put(second);
    pool.put(fourth);
}

#[test]
fn test_exhaustion_does_not_block() {
    let (pool, store) = pool(1);
    let held = pool.acquire().expect("Failed to acquire");

    for _ in 0..100 {
        assert!(matches!(pool.get(), Err(OrmError::PoolExhausted { .. })));
    }
    assert_eq!(store.opened_connections(), 1);
    drop(held);

    assert_eq!(pool.idle(), 1);
    assert!(pool.get().is_ok());
}

#[test]
fn test_created_bounded_under_threads() {
    const MAX: usize = 4;
    let (pool, store) = pool(MAX);
    let served = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let served = Arc::clone(&served);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..200 {
                    match pool.get() {
                        Ok(conn) => {
                            assert!(pool.created() <= MAX);
                            thread::sleep(Duration::from_micros(rng.gen_range(0..50)));
                            pool.put(conn);
                            served.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(OrmError::PoolExhausted { .. }) => thread::yield_now(),
                        Err(e) => panic!("unexpected pool error: {e}"),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert!(served.load(Ordering::Relaxed) > 0);
    assert_eq!(pool.created(), 0, "every checkout was returned");
    assert_eq!(pool.idle(), store.opened_connections());
}

#[test]
fn test_created_bounded_under_coroutines() {
    const MAX: usize = 3;
    may::config().set_workers(4).set_stack_size(0x80000);
    let (pool, store) = pool(MAX);
    // open the first handle on the main thread so one-time initialisation runs off the coroutine stacks
    let warm = pool.get().expect("Failed to warm up pool");
    pool.put(warm);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let pool = Arc::clone(&pool);
            may::go!(move || {
                let mut served = 0usize;
                for _ in 0..100 {
                    match pool.get() {
                        Ok(conn) => {
                            assert!(pool.created() <= MAX);
                            may::coroutine::yield_now();
                            pool.put(conn);
                            served += 1;
                        }
                        Err(OrmError::PoolExhausted { .. }) => may::coroutine::yield_now(),
                        Err(e) => panic!("unexpected pool error: {e}"),
                    }
                }
                served
            })
        })
        .collect();

    let served: usize = handles
        .into_iter()
        .map(|handle| handle.join().expect("coroutine panicked"))
        .sum();

    assert!(served > 0);
    assert_eq!(pool.created(), 0);
    assert_eq!(pool.idle(), store.opened_connections());
}

#[test]
fn test_scoped_acquire_returns_on_error_path() {
    let (pool, _) = pool(1);

    let result: Result<(), OrmError> = pool.with_connection(|conn| {
        conn.get("no_such_table", "x")?;
        Ok(())
    });
    assert!(matches!(result, Err(OrmError::Store(_))));
    assert_eq!(pool.idle(), 1);
    assert_eq!(pool.created(), 0);
    assert!(pool.get().is_ok());
}

#[test]
fn test_close_idle_on_shutdown() {
    let (pool, store) = pool(3);
    let a = pool.get().expect("a");
    let b = pool.get().expect("b");
    pool.put(a);
    pool.put(b);

    assert_eq!(pool.close_idle(), 2);
    assert_eq!(store.closed_connections(), 2);
    assert_eq!(pool.idle(), 0);
}
