/// Error reporting from enhanced configurations and the container.
use ferrous_beans::{
    Args, Configuration, ConfigurationMethods, ContainerBuilder, ContainerObserver, DiError, Enhancer,
    Lifetime, Resolver,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// ===== Test Services =====

#[derive(Debug)]
struct DataSource;

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct ConnectionRefused;

struct Broken;

impl Configuration for Broken {
    fn describe(m: &mut ConfigurationMethods<Self>) {
        m.component("dataSource", |_, _| Ok(DataSource)).lazy();
        m.component("flaky", |_, _| -> Result<DataSource, DiError> {
            Err(DiError::resolution("flaky", ConnectionRefused))
        });
        m.component("stamp", |_, _| Ok(DataSource)).lifetime(Lifetime::Transient);
        m.component("dependent", |this, _| {
            this.call::<DataSource>("flaky")?;
            Ok(DataSource)
        });
    }
}

#[derive(Default)]
struct Failures {
    names: Mutex<Vec<String>>,
}

impl ContainerObserver for Failures {
    fn creating(&self, _name: &str) {}

    fn created(&self, _name: &str, _elapsed: Duration) {}

    fn creation_failed(&self, name: &str, _error: &DiError) {
        self.names.lock().push(name.to_string());
    }
}

fn broken() -> ferrous_beans::Container {
    let mut builder = ContainerBuilder::new();
    builder.add_configuration(Broken).unwrap();
    builder.build().unwrap()
}

// ===== Tests =====

#[test]
fn incompatible_instance_is_a_configuration_conflict() {
    let container = broken();
    container
        .register_singleton("dataSource", "not a data source".to_string())
        .unwrap();

    let instance = container.configuration::<Broken>().unwrap();
    match instance.call::<DataSource>("dataSource") {
        Err(DiError::ConfigurationConflict {
            name,
            method,
            expected,
            actual,
        }) => {
            assert_eq!(name, "dataSource");
            assert!(method.ends_with("::dataSource()"));
            assert!(expected.ends_with("DataSource"));
            assert_eq!(actual, std::any::type_name::<String>());
        }
        other => panic!("expected a configuration conflict, got {other:?}"),
    }
}

#[test]
fn conflict_message_names_both_types() {
    let container = broken();
    container.register_singleton("dataSource", 7u32).unwrap();
    let instance = container.configuration::<Broken>().unwrap();
    let message = instance.call::<DataSource>("dataSource").unwrap_err().to_string();
    assert!(message.contains("DataSource"));
    assert!(message.contains("u32"));
}

#[test]
fn detached_instance_has_no_back_reference() {
    let class = Enhancer::new().enhance::<Broken>().unwrap();
    let detached = class.instantiate(Arc::new(Broken));
    let err = detached.call::<DataSource>("dataSource").unwrap_err();
    assert!(matches!(err, DiError::MissingBackReference { class } if class.ends_with("Broken")));
}

#[test]
fn body_errors_propagate_unchanged() {
    let failures = Arc::new(Failures::default());
    let mut builder = ContainerBuilder::new();
    builder.add_configuration(Broken).unwrap();
    builder.add_observer(failures.clone());
    let container = builder.build().unwrap();

    let err = container.get::<DataSource>("dependent").unwrap_err();
    match &err {
        DiError::Resolution { name, .. } => assert_eq!(name, "flaky"),
        other => panic!("expected a resolution error, got {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());

    // Neither component was stored, and both failures were observed.
    assert!(!container.singleton_registry().contains("flaky"));
    assert!(!container.singleton_registry().contains("dependent"));
    assert_eq!(*failures.names.lock(), ["flaky", "dependent"]);
}

#[test]
fn wrong_type_on_lookup_is_a_mismatch() {
    let container = broken();
    let err = container.get::<String>("dataSource").unwrap_err();
    assert!(matches!(err, DiError::TypeMismatch { name, .. } if name == "dataSource"));
}

#[test]
fn unknown_names() {
    let container = broken();
    assert!(matches!(container.get::<DataSource>("nope"), Err(DiError::NotFound(_))));
    assert!(container.try_get::<DataSource>("nope").unwrap().is_none());

    let instance = container.configuration::<Broken>().unwrap();
    assert!(matches!(
        instance.invoke("nope", &Args::new()),
        Err(DiError::NotFound(name)) if name.ends_with("Broken::nope")
    ));
}

#[test]
fn null_without_declared_parameter_is_rejected() {
    let container = broken();
    let err = container
        .get_with::<DataSource>("stamp", &Args::new().with_null())
        .unwrap_err();
    assert!(matches!(err, DiError::InvariantViolation(msg) if msg.contains("argument 0")));

    let instance = container.configuration::<Broken>().unwrap();
    let err = instance
        .call_with::<DataSource>("stamp", &Args::new().with_null())
        .unwrap_err();
    assert!(matches!(err, DiError::InvariantViolation(_)));

    // Without arguments the transient builds normally.
    assert!(container.get::<DataSource>("stamp").is_ok());
}
