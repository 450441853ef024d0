//! Component registry: registration order, namespace uniqueness, command
//! routing.

use crate::component::Component;
use edgekit_types::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Registration-ordered set of components. The order fixes both lifecycle
/// result order and command listing.
#[derive(Default)]
pub struct ComponentRegistry {
    components: Vec<Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component. Namespaces and command names must be unique
    /// across the registry.
    pub fn register(&mut self, component: Arc<dyn Component>) -> Result<()> {
        if self
            .components
            .iter()
            .any(|existing| existing.namespace() == component.namespace())
        {
            return Err(Error::Config(format!(
                "A component with the namespace {} has already been registered.",
                component.namespace()
            )));
        }
        let taken: HashSet<&str> = self
            .components
            .iter()
            .flat_map(|existing| existing.command_names().iter().copied())
            .collect();
        if let Some(clash) = component
            .command_names()
            .iter()
            .find(|name| taken.contains(**name))
        {
            return Err(Error::Config(format!(
                "The {clash} command is already served by another component."
            )));
        }
        self.components.push(component);
        Ok(())
    }

    /// All components in registration order.
    pub fn components(&self) -> &[Arc<dyn Component>] {
        &self.components
    }

    /// The component serving a command, if any.
    pub fn find_command(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components
            .iter()
            .find(|component| component.command_names().contains(&name))
            .cloned()
    }

    /// Command names across all components, in registration order.
    pub fn command_names(&self) -> Vec<&'static str> {
        self.components
            .iter()
            .flat_map(|component| component.command_names().iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        namespace: &'static str,
        commands: &'static [&'static str],
    }

    impl Component for Named {
        fn namespace(&self) -> &'static str {
            self.namespace
        }

        fn command_names(&self) -> &'static [&'static str] {
            self.commands
        }
    }

    #[test]
    fn rejects_duplicate_namespaces() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Arc::new(Named {
                namespace: "A",
                commands: &[],
            }))
            .unwrap();
        let err = registry
            .register(Arc::new(Named {
                namespace: "A",
                commands: &[],
            }))
            .unwrap_err();
        assert!(err.to_string().contains("namespace A"));
    }

    #[test]
    fn rejects_duplicate_commands() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Arc::new(Named {
                namespace: "A",
                commands: &["doThing"],
            }))
            .unwrap();
        assert!(registry
            .register(Arc::new(Named {
                namespace: "B",
                commands: &["doThing"],
            }))
            .is_err());
    }

    #[test]
    fn lists_commands_in_registration_order() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Arc::new(Named {
                namespace: "B",
                commands: &["second", "third"],
            }))
            .unwrap();
        registry
            .register(Arc::new(Named {
                namespace: "A",
                commands: &["first"],
            }))
            .unwrap();
        assert_eq!(registry.command_names(), vec!["second", "third", "first"]);
        assert_eq!(registry.find_command("first").unwrap().namespace(), "A");
        assert!(registry.find_command("missing").is_none());
    }
}
