//! The command executor.
//!
//! Public entry point for every command. A four-state machine guards the
//! configure handshake: commands issued before `configure` are rejected,
//! commands issued *while* configuring suspend until it settles, and a
//! failed configure poisons the instance for every later command. Every
//! rejection funnels through one place so each command failure is logged
//! exactly once.

use crate::consent::ConsentGate;
use crate::event_manager::EventManager;
use crate::lifecycle::Lifecycle;
use crate::registry::ComponentRegistry;
use edgekit_net::EdgeNetwork;
use edgekit_types::{ConfigOptions, Error, Result};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Builds the configured pipeline from validated options. Injected by
/// [`crate::Instance`] so the executor stays independent of the wiring.
pub type ConfigureFn =
    Box<dyn Fn(ConfigOptions) -> BoxFuture<'static, Result<Arc<ConfiguredCore>>> + Send + Sync>;

/// Strong handles keeping the wired pipeline alive. Components only hold
/// `Weak` references to these collaborators, so the instance graph stays
/// acyclic and this struct is the sole owner.
pub(crate) struct PipelineHandles {
    pub(crate) lifecycle: Arc<Lifecycle>,
    pub(crate) consent: Arc<ConsentGate>,
    pub(crate) event_manager: Arc<EventManager>,
    pub(crate) edge: Arc<EdgeNetwork>,
}

/// Everything that exists only after a successful configure.
pub struct ConfiguredCore {
    pub(crate) registry: ComponentRegistry,
    pub(crate) debug: AtomicBool,
    pub(crate) _pipeline: PipelineHandles,
}

impl ConfiguredCore {
    fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    async fn run_command(&self, name: &str, options: Value) -> Result<Value> {
        match name {
            "setDebug" => self.set_debug(&options),
            _ => match self.registry.find_command(name) {
                Some(component) => {
                    // The debug toggle promotes per-command tracing to info
                    // so it shows without reconfiguring the subscriber.
                    if self.debug_enabled() {
                        info!(
                            command = name,
                            component = component.namespace(),
                            options = %options,
                            "executing command"
                        );
                    } else {
                        debug!(command = name, component = component.namespace(), "executing command");
                    }
                    let result = component.run_command(name, options).await?;
                    // Commands resolving with nothing still resolve with an
                    // object, so callers can always destructure.
                    Ok(if result.is_null() { json!({}) } else { result })
                }
                None => Err(Error::Validation(format!(
                    "The {name} command does not exist. List of available commands: {}.",
                    self.command_names().join(", ")
                ))),
            },
        }
    }

    fn set_debug(&self, options: &Value) -> Result<Value> {
        let enabled = options
            .get("enabled")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                Error::Validation("The setDebug command requires a boolean 'enabled'.".to_string())
            })?;
        self.debug.store(enabled, Ordering::SeqCst);
        Ok(json!({}))
    }

    fn command_names(&self) -> Vec<String> {
        ["configure", "setDebug"]
            .into_iter()
            .map(str::to_string)
            .chain(self.registry.command_names().into_iter().map(str::to_string))
            .collect()
    }
}

#[derive(Clone)]
enum State {
    Unconfigured,
    /// Configure in flight; the channel settles with its success.
    Configuring(watch::Receiver<Option<bool>>),
    Configured(Arc<ConfiguredCore>),
    Failed,
}

pub struct CommandExecutor {
    state: Mutex<State>,
    configure_fn: ConfigureFn,
}

impl CommandExecutor {
    pub fn new(configure_fn: ConfigureFn) -> Self {
        Self {
            state: Mutex::new(State::Unconfigured),
            configure_fn,
        }
    }

    /// Runs the configure command. Valid exactly once per instance.
    pub async fn configure(&self, options: ConfigOptions) -> Result<Value> {
        let settled_tx = {
            let mut state = self.state.lock().await;
            if !matches!(*state, State::Unconfigured) {
                return self.funnel(
                    "configure",
                    Err(Error::Config(
                        "The library has already been configured and may only be configured once."
                            .to_string(),
                    )),
                );
            }
            let (tx, rx) = watch::channel(None);
            *state = State::Configuring(rx);
            tx
        };

        let result = (self.configure_fn)(options).await;
        let mut state = self.state.lock().await;
        match result {
            Ok(core) => {
                *state = State::Configured(core);
                let _ = settled_tx.send(Some(true));
                Ok(json!({}))
            }
            Err(err) => {
                *state = State::Failed;
                let _ = settled_tx.send(Some(false));
                self.funnel("configure", Err(err))
            }
        }
    }

    /// Runs any other command, suspending while a configure is in flight.
    pub async fn execute(&self, name: &str, options: Value) -> Result<Value> {
        if name == "configure" {
            let parsed: ConfigOptions = match serde_json::from_value(options) {
                Ok(parsed) => parsed,
                Err(err) => {
                    return self.funnel(
                        name,
                        Err(Error::Config(format!("Invalid configure options: {err}."))),
                    )
                }
            };
            return self.configure(parsed).await;
        }

        loop {
            let snapshot = self.state.lock().await.clone();
            match snapshot {
                State::Unconfigured => {
                    return self.funnel(
                        name,
                        Err(Error::Config(
                            "The library must be configured first. Please do so by executing \
                             the configure command."
                                .to_string(),
                        )),
                    )
                }
                State::Configuring(mut settled) => {
                    if settled.wait_for(Option::is_some).await.is_err() {
                        // Configure task dropped without settling.
                        return Err(configure_failed(name));
                    }
                }
                State::Failed => return Err(configure_failed(name)),
                State::Configured(core) => {
                    return self.funnel(name, core.run_command(name, options).await)
                }
            }
        }
    }

    /// Single funnel for command outcomes so each failure is logged once.
    fn funnel(&self, name: &str, result: Result<Value>) -> Result<Value> {
        if let Err(err) = &result {
            error!(command = name, error = %err, "command failed");
        }
        result
    }
}

fn configure_failed(name: &str) -> Error {
    let message = format!(
        "An error during configuration is preventing the {name} command from executing."
    );
    warn!("{message}");
    Error::Config(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use async_trait::async_trait;
    use edgekit_net::{NetworkRequester, NetworkStrategy, TransportResponse};
    use edgekit_types::{ConsentStatus, MemoryCookieJar};
    use std::time::Duration;

    struct Ping;

    #[async_trait]
    impl Component for Ping {
        fn namespace(&self) -> &'static str {
            "Ping"
        }

        fn command_names(&self) -> &'static [&'static str] {
            &["ping"]
        }

        async fn run_command(&self, _name: &str, _options: Value) -> Result<Value> {
            Ok(json!({ "pong": true }))
        }
    }

    struct NoopStrategy;

    #[async_trait]
    impl NetworkStrategy for NoopStrategy {
        async fn send(&self, _url: &str, _body: &str) -> Result<TransportResponse> {
            Ok(TransportResponse {
                status: 200,
                body: r#"{"requestId":"r1","handle":[]}"#.to_string(),
            })
        }
    }

    fn options() -> ConfigOptions {
        ConfigOptions {
            org_id: "org@x".to_string(),
            edge_config_id: "cfg".to_string(),
            ..Default::default()
        }
    }

    fn test_core() -> Arc<ConfiguredCore> {
        let config = Arc::new(options().validate().unwrap());
        let consent = Arc::new(ConsentGate::new(ConsentStatus::In));
        let edge = Arc::new(EdgeNetwork::new(
            Arc::clone(&config),
            Arc::new(MemoryCookieJar::new()),
            NetworkRequester::new(Arc::new(NoopStrategy)),
        ));
        let mut registry = ComponentRegistry::new();
        registry.register(Arc::new(Ping)).unwrap();
        let lifecycle = Arc::new(Lifecycle::new(registry.components().to_vec()));
        let event_manager = Arc::new(EventManager::new(
            config,
            Arc::clone(&lifecycle),
            Arc::clone(&consent),
            Arc::clone(&edge),
        ));
        Arc::new(ConfiguredCore {
            registry,
            debug: AtomicBool::new(false),
            _pipeline: PipelineHandles {
                lifecycle,
                consent,
                event_manager,
                edge,
            },
        })
    }

    // ── the Configuring wait path ───────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn commands_wait_for_an_in_flight_configure_to_succeed() {
        let executor = Arc::new(CommandExecutor::new(Box::new(|_options| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(test_core())
            })
        })));

        let configure = tokio::spawn({
            let executor = Arc::clone(&executor);
            async move { executor.configure(options()).await }
        });
        tokio::task::yield_now().await;

        let command = tokio::spawn({
            let executor = Arc::clone(&executor);
            async move { executor.execute("ping", json!({})).await }
        });
        tokio::task::yield_now().await;
        assert!(!command.is_finished(), "command ran before configure settled");

        configure.await.unwrap().unwrap();
        assert_eq!(command.await.unwrap().unwrap(), json!({ "pong": true }));
    }

    #[tokio::test(start_paused = true)]
    async fn commands_waiting_on_a_failed_configure_are_rejected() {
        let executor = Arc::new(CommandExecutor::new(Box::new(|_options| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(Error::Config("wiring failed".to_string()))
            })
        })));

        let configure = tokio::spawn({
            let executor = Arc::clone(&executor);
            async move { executor.configure(options()).await }
        });
        tokio::task::yield_now().await;

        let command = tokio::spawn({
            let executor = Arc::clone(&executor);
            async move { executor.execute("ping", json!({})).await }
        });
        tokio::task::yield_now().await;
        assert!(!command.is_finished());

        assert!(configure.await.unwrap().is_err());
        let err = command.await.unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "An error during configuration is preventing the ping command from executing."
        );
    }
}
