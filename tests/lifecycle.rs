mod common;

use actionwire::lifecycle::LifecycleError;
use actionwire::prelude::*;
use common::AppDir;
use std::sync::Mutex;
use std::time::{Duration, Instant};

type Events = Arc<Mutex<Vec<(String, Instant)>>>;

struct Tracked {
    name: &'static str,
    delay: Duration,
    events: Events,
}

impl Tracked {
    fn record(&self, phase: &str) {
        self.events
            .lock()
            .unwrap()
            .push((format!("{}:{}", phase, self.name), Instant::now()));
    }
}

#[async_trait]
impl OnLoad for Tracked {
    async fn on_load(&self) -> HandlerResult {
        tokio::time::sleep(self.delay).await;
        self.record("load");
        Ok(())
    }
}

#[async_trait]
impl OnReady for Tracked {
    async fn on_ready(&self) -> HandlerResult {
        self.record("ready");
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl OnLoad for Failing {
    async fn on_load(&self) -> HandlerResult {
        Err(anyhow::anyhow!("connection refused"))
    }
}

fn tracked(
    registry: &MetadataRegistry,
    identity: &'static str,
    name: &'static str,
    delay: Duration,
    events: &Events,
) {
    let events = Arc::clone(events);
    registry
        .register_class(
            ClassDefinition::new(identity, move |_| Tracked {
                name,
                delay,
                events: Arc::clone(&events),
            })
            .with_on_load()
            .with_on_ready(),
        )
        .unwrap();
    registry.register_domain(identity, name).unwrap();
}

fn configuration(app: &AppDir) -> Configuration {
    Configuration::builder()
        .root_file(app.root_file())
        .api_prefix("/api")
        .debug_log(|_| {})
        .debug_error(|_| {})
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_on_ready_waits_for_every_on_load() {
    let app = AppDir::new();
    app.touch("domain/a.rs", "").touch("domain/b.rs", "");

    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let registry = MetadataRegistry::new();
    tracked(&registry, "SlowDomain", "A", Duration::from_millis(50), &events);
    tracked(&registry, "FastDomain", "B", Duration::ZERO, &events);

    let started = Instant::now();
    let application = Application::builder()
        .configuration(configuration(&app))
        .registry(registry)
        .loader(
            ModuleCatalog::new()
                .module("domain/a", "SlowDomain")
                .module("domain/b", "FastDomain"),
        )
        .build()
        .await
        .unwrap();

    // on_ready runs detached
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 4);

    let last_load = events
        .iter()
        .filter(|(event, _)| event.starts_with("load:"))
        .map(|(_, at)| *at)
        .max()
        .unwrap();
    for (event, at) in events.iter().filter(|(event, _)| event.starts_with("ready:")) {
        assert!(*at >= last_load, "{event} fired before every on_load settled");
        assert!(at.duration_since(started) >= Duration::from_millis(50));
    }

    assert!(application.injector().contains("Domain.A"));
    assert!(application.injector().contains("Domain.B"));
}

#[tokio::test]
async fn test_failed_on_load_aborts_startup() {
    let app = AppDir::new();
    app.touch("domain/failing.rs", "");

    let registry = MetadataRegistry::new();
    registry
        .register_class(ClassDefinition::new("FailingDomain", |_| Failing).with_on_load())
        .unwrap();
    registry.register_domain("FailingDomain", "Failing").unwrap();

    let result = Application::builder()
        .configuration(configuration(&app))
        .registry(registry.clone())
        .loader(ModuleCatalog::new().module("domain/failing", "FailingDomain"))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(ActionwireError::Lifecycle(LifecycleError::HookFailed { .. }))
    ));
    assert!(!registry.is_frozen());
}

#[tokio::test]
async fn test_registration_after_startup_is_rejected() {
    let app = AppDir::new();
    let registry = MetadataRegistry::new();

    Application::builder()
        .configuration(configuration(&app))
        .registry(registry.clone())
        .loader(ModuleCatalog::new())
        .build()
        .await
        .unwrap();

    let late = registry.register_domain("LateDomain", "Late");
    assert!(matches!(
        late,
        Err(actionwire::error::RegistryError::Frozen { .. })
    ));
}
