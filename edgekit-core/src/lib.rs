//! Pipeline core for the edgekit collection client.
//!
//! Ties the pieces from `edgekit-types` and `edgekit-net` into a working
//! instance:
//! - **Components** implement ordered lifecycle hooks and expose commands
//! - the **Lifecycle** coordinator fans each hook out to every component
//!   concurrently and collects results in registration order
//! - the **ConsentGate** suspends event submission until a general-purpose
//!   consent decision exists
//! - the **EventManager** drives one event through the hook/consent/network
//!   sequence
//! - the **CommandExecutor** guards the public command surface behind the
//!   configure state machine
//! - [`Instance`] wires it all together with the built-in components
//!   (data collection, identity bootstrap, privacy)

mod component;
mod components;
mod consent;
mod event_manager;
mod executor;
mod instance;
mod lifecycle;
mod registry;

pub use component::{Component, ComponentTools, EventContext};
pub use components::{DataCollector, Identity, Privacy, ECID_NAMESPACE};
pub use consent::ConsentGate;
pub use event_manager::{EventManager, SendEventOptions};
pub use executor::{CommandExecutor, ConfiguredCore};
pub use instance::Instance;
pub use lifecycle::Lifecycle;
pub use registry::ComponentRegistry;
