//! The public instance surface.
//!
//! An `Instance` owns everything a deployment used to keep in module-level
//! globals: the command executor, and (after configure) the wired pipeline.
//! Independent instances share nothing but the cookie jar and transport
//! they were constructed with.

use crate::component::ComponentTools;
use crate::components::{DataCollector, Identity, Privacy};
use crate::consent::ConsentGate;
use crate::event_manager::EventManager;
use crate::executor::{CommandExecutor, ConfigureFn, ConfiguredCore, PipelineHandles};
use crate::lifecycle::Lifecycle;
use crate::registry::ComponentRegistry;
use edgekit_net::{EdgeNetwork, NetworkRequester, NetworkStrategy, ReqwestStrategy};
use edgekit_types::{ConfigOptions, CookieJar, MemoryCookieJar, Result};
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Instance {
    executor: Arc<CommandExecutor>,
}

impl Instance {
    /// Builds an unconfigured instance over the given cookie store and
    /// transport.
    pub fn new(cookie_jar: Arc<dyn CookieJar>, strategy: Arc<dyn NetworkStrategy>) -> Self {
        let configure_fn: ConfigureFn = Box::new(move |options| {
            let jar = Arc::clone(&cookie_jar);
            let strategy = Arc::clone(&strategy);
            Box::pin(async move { build_core(options, jar, strategy) })
        });
        Self {
            executor: Arc::new(CommandExecutor::new(configure_fn)),
        }
    }

    /// In-memory cookie jar and the production `reqwest` transport.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(MemoryCookieJar::new()),
            Arc::new(ReqwestStrategy::new()),
        )
    }

    /// Runs the configure command. Valid exactly once.
    pub async fn configure(&self, options: ConfigOptions) -> Result<Value> {
        self.executor.configure(options).await
    }

    /// Runs a command by name with JSON options.
    pub async fn execute(&self, name: &str, options: Value) -> Result<Value> {
        self.executor.execute(name, options).await
    }
}

fn build_core(
    options: ConfigOptions,
    jar: Arc<dyn CookieJar>,
    strategy: Arc<dyn NetworkStrategy>,
) -> Result<Arc<ConfiguredCore>> {
    let config = Arc::new(options.validate()?);
    let consent = Arc::new(ConsentGate::new(config.default_consent));
    let edge = Arc::new(EdgeNetwork::new(
        Arc::clone(&config),
        Arc::clone(&jar),
        NetworkRequester::new(strategy),
    ));

    let mut registry = ComponentRegistry::new();
    registry.register(Arc::new(DataCollector::new()))?;
    registry.register(Arc::new(Identity::new(
        Arc::clone(&config),
        Arc::clone(&jar),
    )))?;
    registry.register(Arc::new(Privacy::new(
        Arc::clone(&config),
        Arc::clone(&jar),
        Arc::clone(&consent),
    )))?;

    let lifecycle = Arc::new(Lifecycle::new(registry.components().to_vec()));
    let event_manager = Arc::new(EventManager::new(
        Arc::clone(&config),
        Arc::clone(&lifecycle),
        Arc::clone(&consent),
        Arc::clone(&edge),
    ));

    let tools = ComponentTools {
        config: Arc::clone(&config),
        cookie_jar: jar,
        consent: Arc::clone(&consent),
        event_manager: Arc::clone(&event_manager),
        edge: Arc::clone(&edge),
        lifecycle: Arc::clone(&lifecycle),
    };
    for component in registry.components() {
        component.on_components_registered(&tools);
    }

    info!(
        org_id = %config.org_id,
        edge_domain = %config.edge_domain,
        "instance configured"
    );
    Ok(Arc::new(ConfiguredCore {
        registry,
        debug: AtomicBool::new(config.debug_enabled),
        _pipeline: PipelineHandles {
            lifecycle,
            consent,
            event_manager,
            edge,
        },
    }))
}
