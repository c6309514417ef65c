//! Dependency-ordered orchestration
//!
//! Drives every service's lifecycle engine strictly one at a time: a
//! service is fully installed, configured, started, and initialized
//! before the next one begins. The first failure aborts the run, leaving
//! dependent services untouched.

use std::collections::{HashMap, VecDeque};

use tracing::{info, warn};

use crate::{Error, Lifecycle, Result, ServiceState};

/// Service dependency graph
#[derive(Debug)]
pub struct DependencyGraph {
    /// Node names in declaration order
    nodes: Vec<String>,
    /// name -> names that depend on it
    dependents: HashMap<String, Vec<String>>,
    /// name -> number of unsatisfied dependencies
    dependency_counts: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build a graph from `(name, dependencies)` pairs
    pub fn new<'a, I, D>(services: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let mut nodes = Vec::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependency_counts: HashMap<String, usize> = HashMap::new();

        for (name, deps) in services {
            nodes.push(name.to_string());
            dependency_counts.entry(name.to_string()).or_insert(0);
            for dep in deps {
                dependents
                    .entry(dep.to_string())
                    .or_default()
                    .push(name.to_string());
                *dependency_counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }

        // Dependencies must name declared services
        for dep in dependents.keys() {
            if !nodes.iter().any(|n| n == dep) {
                return Err(Error::UnknownService(dep.clone()));
            }
        }

        Ok(Self {
            nodes,
            dependents,
            dependency_counts,
        })
    }

    /// Topological order, stable with respect to declaration order.
    ///
    /// A cycle is a configuration error.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut counts = self.dependency_counts.clone();
        let mut queue: VecDeque<String> = self
            .nodes
            .iter()
            .filter(|n| counts[*n] == 0)
            .cloned()
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(name) = queue.pop_front() {
            if let Some(dependents) = self.dependents.get(&name) {
                for dependent in dependents {
                    let count = counts.get_mut(dependent).ok_or_else(|| {
                        Error::UnknownService(dependent.clone())
                    })?;
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent.clone());
                    }
                }
            }
            order.push(name);
        }

        if order.len() != self.nodes.len() {
            return Err(Error::CircularDependency);
        }
        Ok(order)
    }
}

/// Sequences lifecycle engines in dependency order
pub struct Orchestrator {
    lifecycles: Vec<Lifecycle>,
}

impl Orchestrator {
    /// Create an orchestrator over the given engines
    pub fn new(lifecycles: Vec<Lifecycle>) -> Self {
        Self { lifecycles }
    }

    /// The order services will be deployed in
    pub fn deploy_order(&self) -> Result<Vec<String>> {
        let graph = DependencyGraph::new(self.lifecycles.iter().map(|lc| {
            (
                lc.name(),
                lc.dependencies().iter().map(String::as_str),
            )
        }))?;
        graph.topological_order()
    }

    /// Install, configure, start, and initialize every service, one at a
    /// time in dependency order
    pub async fn deploy(&mut self) -> Result<()> {
        let order = self.deploy_order()?;
        info!(?order, "deploying services");

        for name in &order {
            let lifecycle = self.lifecycle_mut(name)?;
            info!(service = %name, "deploying");
            lifecycle.install().await?;
            lifecycle.configure().await?;
            lifecycle.start().await?;
            lifecycle.post_start().await?;
            info!(service = %name, state = %lifecycle.state(), "deployed");
        }
        Ok(())
    }

    /// Remove every service's packages in reverse dependency order.
    ///
    /// Honors the global keep-packages policy: when set, no remove
    /// operation is issued at all.
    pub async fn remove(&mut self) -> Result<Vec<String>> {
        let mut order = self.deploy_order()?;
        order.reverse();

        let mut all_removed = Vec::new();
        for name in &order {
            let lifecycle = self.lifecycle_mut(name)?;
            if lifecycle.keep_packages() {
                warn!(service = %name, "keep-packages is set; leaving host packages in place");
                continue;
            }
            let removed = lifecycle.uninstall().await?;
            info!(service = %name, removed = removed.len(), "removed packages");
            all_removed.extend(removed);
        }
        Ok(all_removed)
    }

    /// Current state of every service, in declaration order
    pub fn states(&self) -> Vec<(String, ServiceState)> {
        self.lifecycles
            .iter()
            .map(|lc| (lc.name().to_string(), lc.state()))
            .collect()
    }

    fn lifecycle_mut(&mut self, name: &str) -> Result<&mut Lifecycle> {
        self.lifecycles
            .iter_mut()
            .find(|lc| lc.name() == name)
            .ok_or_else(|| Error::UnknownService(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = DependencyGraph::new([
            ("identity", vec![]),
            ("catalog", vec!["identity"]),
            ("gateway", vec!["identity", "catalog"]),
        ])
        .unwrap();

        let order = graph.topological_order().unwrap();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("identity") < position("catalog"));
        assert!(position("catalog") < position("gateway"));
    }

    #[test]
    fn order_is_stable_for_independent_services() {
        let services: Vec<(&str, Vec<&str>)> = vec![
            ("alpha", vec![]),
            ("beta", vec![]),
            ("gamma", vec![]),
        ];
        let graph = DependencyGraph::new(services).unwrap();
        assert_eq!(graph.topological_order().unwrap(), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let graph = DependencyGraph::new([
            ("a", vec!["b"]),
            ("b", vec!["a"]),
        ])
        .unwrap();
        assert!(matches!(
            graph.topological_order(),
            Err(Error::CircularDependency)
        ));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let err = DependencyGraph::new([("a", vec!["ghost"])]).unwrap_err();
        assert!(matches!(err, Error::UnknownService(name) if name == "ghost"));
    }
}
