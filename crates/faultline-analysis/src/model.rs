//! Validated architecture graph.
//!
//! Converts an `ArchitectureDefinition` into dense forward and reverse
//! adjacency lists. Loading enforces unique names, resolvable dependencies,
//! and an acyclic dependency relation; no partial graph is ever returned.

use std::collections::HashMap;

use faultline_core::{ArchitectureDefinition, Component};
use serde::Serialize;

use crate::error::ValidationError;
use crate::types::ArchitectureStats;

/// An immutable, validated component dependency graph.
///
/// Serializes as `{system_name, components}` for diagram renderers.
#[derive(Debug, Clone, Serialize)]
pub struct Architecture {
    system_name: String,
    /// Components in declaration order; the position is the dense index.
    components: Vec<Component>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// `dependencies[i]` = components `i` requires, in declared order.
    #[serde(skip)]
    dependencies: Vec<Vec<usize>>,
    /// `dependents[i]` = components requiring `i`, in declaration order.
    #[serde(skip)]
    dependents: Vec<Vec<usize>>,
}

impl Architecture {
    /// Validate a definition and build the graph.
    ///
    /// Checks, in order: names non-empty and unique, every `depends_on`
    /// reference declared, dependency relation acyclic.
    pub fn load(definition: ArchitectureDefinition) -> Result<Self, ValidationError> {
        let ArchitectureDefinition {
            system_name,
            components: defs,
        } = definition;

        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(ValidationError::EmptyName { index: i });
            }
            if index.insert(def.name.clone(), i).is_some() {
                return Err(ValidationError::DuplicateComponent {
                    name: def.name.clone(),
                });
            }
        }

        let mut dependencies = vec![Vec::new(); defs.len()];
        for (i, def) in defs.iter().enumerate() {
            for dep in &def.depends_on {
                let Some(&target) = index.get(dep) else {
                    return Err(ValidationError::DanglingDependency {
                        component: def.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                if !dependencies[i].contains(&target) {
                    dependencies[i].push(target);
                }
            }
        }

        if let Some(cycle) = find_cycle(&dependencies) {
            return Err(ValidationError::CyclicDependency {
                cycle: cycle.into_iter().map(|i| defs[i].name.clone()).collect(),
            });
        }

        // Iterating components in order keeps each dependents list in
        // declaration order.
        let mut dependents = vec![Vec::new(); defs.len()];
        for (i, deps) in dependencies.iter().enumerate() {
            for &target in deps {
                dependents[target].push(i);
            }
        }

        let names: Vec<String> = defs.iter().map(|def| def.name.clone()).collect();
        let components = defs
            .into_iter()
            .zip(&dependencies)
            .map(|(def, deps)| {
                let mut component = Component::from(def);
                component.depends_on = deps.iter().map(|&d| names[d].clone()).collect();
                component
            })
            .collect();

        Ok(Self {
            system_name,
            components,
            index,
            dependencies,
            dependents,
        })
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Components in declaration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.index_of(name).map(|i| &self.components[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components that `idx` requires. Empty for an out-of-range index.
    pub fn dependencies_of(&self, idx: usize) -> &[usize] {
        self.dependencies.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Components that require `idx`. Empty for an out-of-range index.
    pub fn dependents_of(&self, idx: usize) -> &[usize] {
        self.dependents.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(|deps| deps.len()).sum()
    }

    pub fn stats(&self) -> ArchitectureStats {
        ArchitectureStats {
            total_components: self.len(),
            total_dependencies: self.edge_count(),
            public_count: self.components.iter().filter(|c| c.public).count(),
            external_api_count: self.components.iter().filter(|c| c.external_api).count(),
        }
    }
}

/// Find one dependency cycle, returned as a closed walk (`[a, b, a]`).
///
/// Iterative depth-first search with three-colour marking, roots and
/// edges visited in declaration order so the reported cycle is stable.
fn find_cycle(dependencies: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; dependencies.len()];

    for root in 0..dependencies.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // (node, next edge position)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::OnStack;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&next) = dependencies[node].get(frame.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[next] {
                Mark::Unvisited => {
                    marks[next] = Mark::OnStack;
                    stack.push((next, 0));
                }
                Mark::OnStack => {
                    let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    None
}
