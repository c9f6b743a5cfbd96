//! Eager dependency-graph validation.
//!
//! Runs inside [`ServiceCollection::build`](crate::ServiceCollection::build)
//! over the declared dependencies of every registration.
//!
//! # Validation Rules
//!
//! - **Duplicate**: a contract registered more than once
//! - **Missing dependency**: a declared dependency has no registration
//! - **Singleton → Scoped**: a process-wide instance would capture one request's state
//! - **Circular dependency**: a cycle in the declared graph

use std::collections::{HashMap, HashSet};

use crate::error::RegistrationError;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::Registry;

/// Checks a registry before it becomes a provider.
///
/// # Examples
///
/// ```
/// use acme_order::{RegistrationError, ServiceCollection};
///
/// struct RequestContext;
/// struct Cache;
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<RequestContext, _>(|_| Ok(RequestContext));
/// services
///     .add_singleton_factory::<Cache, _>(|_| Ok(Cache))
///     .requires::<RequestContext>();
///
/// assert!(matches!(
///     services.build(),
///     Err(RegistrationError::CapturedScope { .. })
/// ));
/// ```
pub(crate) struct GraphValidator<'a> {
    registry: &'a Registry,
}

impl<'a> GraphValidator<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Every problem found, in a stable order: duplicates, edges, cycles.
    pub(crate) fn validate(&self) -> Vec<RegistrationError> {
        let mut errors: Vec<RegistrationError> = self
            .registry
            .duplicate_keys()
            .into_iter()
            .map(|key| RegistrationError::Duplicate {
                service: key.display_name(),
            })
            .collect();

        for (key, reg) in self.registry.iter() {
            for dep in &reg.dependencies {
                match self.registry.get(dep) {
                    None => errors.push(RegistrationError::MissingDependency {
                        service: key.display_name(),
                        dependency: dep.display_name(),
                    }),
                    Some(dep_reg) => {
                        if reg.lifetime == Lifetime::Singleton && dep_reg.lifetime == Lifetime::Scoped {
                            errors.push(RegistrationError::CapturedScope {
                                singleton: key.display_name(),
                                scoped: dep.display_name(),
                            });
                        }
                    }
                }
            }
        }

        errors.extend(
            self.detect_cycles()
                .into_iter()
                .map(|path| RegistrationError::Circular { path }),
        );
        errors
    }

    fn edges(&self) -> HashMap<Key, Vec<Key>> {
        let mut edges: HashMap<Key, Vec<Key>> = HashMap::new();
        for (key, reg) in self.registry.iter() {
            edges.entry(*key).or_default().extend(reg.dependencies.iter().copied());
        }
        edges
    }

    /// Detects circular dependencies using DFS.
    fn detect_cycles(&self) -> Vec<Vec<&'static str>> {
        let edges = self.edges();
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for (key, _) in self.registry.iter() {
            if !visited.contains(key) {
                Self::dfs(*key, &edges, &mut visited, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn dfs(
        key: Key,
        edges: &HashMap<Key, Vec<Key>>,
        visited: &mut HashSet<Key>,
        path: &mut Vec<Key>,
        cycles: &mut Vec<Vec<&'static str>>,
    ) {
        if let Some(start) = path.iter().position(|k| *k == key) {
            let mut cycle: Vec<&'static str> = path[start..].iter().map(|k| k.display_name()).collect();
            cycle.push(key.display_name());
            cycles.push(cycle);
            return;
        }
        if !visited.insert(key) {
            return;
        }

        path.push(key);
        if let Some(deps) = edges.get(&key) {
            for dep in deps {
                Self::dfs(*dep, edges, visited, path, cycles);
            }
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RegistrationError;
    use crate::ServiceCollection;

    struct A;
    struct B;
    struct C;

    #[test]
    fn detects_three_node_cycle() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton_factory::<A, _>(|_| Ok(A)).requires::<B>();
        sc.add_singleton_factory::<B, _>(|_| Ok(B)).requires::<C>();
        sc.add_singleton_factory::<C, _>(|_| Ok(C)).requires::<A>();

        match sc.build() {
            Err(RegistrationError::Circular { path }) => {
                assert_eq!(path.len(), 4);
                assert_eq!(path.first(), path.last());
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("cycle accepted"),
        }
    }

    #[test]
    fn missing_dependency_names_both_sides() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton_factory::<A, _>(|_| Ok(A)).requires::<B>();

        match sc.build() {
            Err(RegistrationError::MissingDependency { service, dependency }) => {
                assert!(service.ends_with("::A"));
                assert!(dependency.ends_with("::B"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("missing dependency accepted"),
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton(A);
        sc.add_singleton(A);

        assert!(matches!(
            sc.build(),
            Err(RegistrationError::Duplicate { .. })
        ));
    }

    #[test]
    fn scoped_may_depend_on_singleton() {
        let mut sc = ServiceCollection::new();
        sc.add_singleton(A);
        sc.add_scoped_factory::<B, _>(|_| Ok(B)).requires::<A>();

        assert!(sc.build().is_ok());
    }
}
