/// Concurrent first lookups
///
/// Threads racing to resolve the same singleton, directly or through an
/// enhanced configuration, must all observe one instance built once.
use ferrous_beans::{Configuration, ConfigurationMethods, ContainerBuilder, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

// ===== Test Services =====

struct Registry {
    built_by: String,
}

struct Service {
    registry: Arc<Registry>,
}

struct Shared {
    builds: Arc<AtomicUsize>,
}

impl Configuration for Shared {
    fn describe(m: &mut ConfigurationMethods<Self>) {
        m.component("registry", |this, _| {
            this.builds.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            thread::sleep(Duration::from_millis(5));
            Ok(Registry {
                built_by: format!("{:?}", thread::current().id()),
            })
        });
        m.component("service", |this, _| Ok(Service { registry: this.call("registry")? }))
            .lifetime(ferrous_beans::Lifetime::Transient);
    }
}

fn container() -> (ferrous_beans::Container, Arc<AtomicUsize>) {
    let builds = Arc::new(AtomicUsize::new(0));
    let mut builder = ContainerBuilder::new();
    builder.add_configuration(Shared { builds: builds.clone() }).unwrap();
    (builder.build().unwrap(), builds)
}

// ===== Tests =====

#[test]
fn concurrent_lookups_build_one_singleton() {
    let (container, builds) = container();
    let barrier = Barrier::new(THREADS);

    let seen: Vec<Arc<Registry>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.get::<Registry>("registry").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(seen.iter().all(|r| Arc::ptr_eq(r, &seen[0])));
    assert!(!seen[0].built_by.is_empty());
    assert!(!container.singleton_registry().is_in_creation("registry"));
}

#[test]
fn concurrent_method_calls_converge() {
    let (container, builds) = container();
    let instance = container.configuration::<Shared>().unwrap();
    let barrier = Barrier::new(THREADS);

    let seen: Vec<Arc<Registry>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let instance = &instance;
                let container = &container;
                let barrier = &barrier;
                s.spawn(move |_| {
                    barrier.wait();
                    if i % 2 == 0 {
                        instance.call::<Registry>("registry").unwrap()
                    } else {
                        container.get::<Service>("service").unwrap().registry.clone()
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(seen.iter().all(|r| Arc::ptr_eq(r, &seen[0])));
}

#[test]
fn containers_on_different_threads_are_independent() {
    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let (container, builds) = container();
                barrier.wait();
                for _ in 0..10 {
                    container.get::<Service>("service").unwrap();
                }
                builds.load(Ordering::SeqCst)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}
