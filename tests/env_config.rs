/// Container options read from the environment.
use ferrous_beans::config::{ENV_ALLOW_OVERRIDING, ENV_EAGER_INIT};
use ferrous_beans::{ContainerBuilder, ContainerOptions, DiError, Lifetime, Resolver};
use serial_test::serial;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn reset_env() {
    env::remove_var(ENV_ALLOW_OVERRIDING);
    env::remove_var(ENV_EAGER_INIT);
}

#[test]
#[serial]
fn eager_init_from_environment() {
    reset_env();
    env::set_var(ENV_EAGER_INIT, "yes");

    let builds = Arc::new(AtomicUsize::new(0));
    let counted = builds.clone();
    let mut builder = ContainerBuilder::new();
    builder.with_options(ContainerOptions::from_env().unwrap());
    builder.add_factory("clock", Lifetime::Singleton, move |_, _| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(0u64)
    });
    let container = builder.build().unwrap();
    reset_env();

    assert!(container.options().eager_init);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    container.get::<u64>("clock").unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn overriding_from_environment() {
    reset_env();
    env::set_var(ENV_ALLOW_OVERRIDING, "1");

    let mut builder = ContainerBuilder::new();
    builder.with_options(ContainerOptions::from_env().unwrap());
    builder.add_singleton("port", 80u16).add_singleton("port", 8080u16);
    let container = builder.build().unwrap();
    reset_env();

    assert_eq!(*container.get::<u16>("port").unwrap(), 8080);
}

#[test]
#[serial]
fn malformed_environment_is_rejected() {
    reset_env();
    env::set_var(ENV_EAGER_INIT, "later");
    let result = ContainerOptions::from_env();
    reset_env();

    assert!(matches!(result, Err(DiError::Config(_))));
}
