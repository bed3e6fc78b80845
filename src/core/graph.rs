//! Prerequisite graph walks: critical-path lengths and cycle detection.
//!
//! Both walks use an explicit stack so adversarial graphs cannot exhaust the
//! thread stack. Edges point from a task to its prerequisites. Prerequisites
//! that were never submitted are treated as leaves with zero duration.

use std::collections::{HashMap, HashSet};

use super::task::TaskId;

#[derive(Debug, Clone, Copy)]
struct Node<'a> {
    deps: &'a [TaskId],
    duration_ms: u64,
}

/// Borrowed adjacency list keyed by task id.
#[derive(Debug, Default)]
pub struct DependencyGraph<'a> {
    nodes: HashMap<&'a str, Node<'a>>,
}

impl<'a> DependencyGraph<'a> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a task with its prerequisites and estimated duration.
    pub fn add(&mut self, id: &'a str, deps: &'a [TaskId], duration_ms: u64) {
        self.nodes.insert(id, Node { deps, duration_ms });
    }

    /// Number of tasks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Critical-path length of every task reachable from `roots`.
    ///
    /// A task's length is its own duration plus the longest length among its
    /// prerequisites. An edge closing a cycle contributes nothing, so the walk
    /// terminates on cyclic input.
    pub fn critical_path_lengths<I>(&self, roots: I) -> HashMap<&'a str, u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lengths: HashMap<&'a str, u64> = HashMap::new();
        let mut on_path: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<(&'a str, bool)> = Vec::new();

        for root in roots {
            stack.push((root, false));
            while let Some((id, expanded)) = stack.pop() {
                let Some(node) = self.nodes.get(id).copied() else {
                    lengths.entry(id).or_insert(0);
                    continue;
                };

                if expanded {
                    on_path.remove(id);
                    let longest = node
                        .deps
                        .iter()
                        .filter_map(|dep| lengths.get(dep.as_str()))
                        .copied()
                        .max()
                        .unwrap_or(0);
                    lengths.insert(id, node.duration_ms.saturating_add(longest));
                    continue;
                }

                if lengths.contains_key(id) || !on_path.insert(id) {
                    continue;
                }

                stack.push((id, true));
                for dep in node.deps.iter().rev() {
                    if !lengths.contains_key(dep.as_str()) {
                        stack.push((dep.as_str(), false));
                    }
                }
            }
        }

        lengths
    }

    /// Critical-path length of a single task.
    #[must_use]
    pub fn critical_path_length(&self, id: &'a str) -> u64 {
        self.critical_path_lengths([id])
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether a cycle is reachable from `start` along prerequisite edges.
    ///
    /// Only tasks on the current walk path count as revisits, so diamonds
    /// (two prerequisites sharing a prerequisite) are not cycles. Tasks proven
    /// cycle-free are added to `acyclic`, which callers can share across
    /// starts to avoid rewalking.
    pub fn reaches_cycle(&self, start: &'a str, acyclic: &mut HashSet<&'a str>) -> bool {
        let mut on_path: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<(&'a str, bool)> = vec![(start, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                on_path.remove(id);
                acyclic.insert(id);
                continue;
            }
            if acyclic.contains(id) {
                continue;
            }
            if on_path.contains(id) {
                return true;
            }
            let Some(node) = self.nodes.get(id) else {
                acyclic.insert(id);
                continue;
            };

            on_path.insert(id);
            stack.push((id, true));
            for dep in node.deps.iter().rev() {
                stack.push((dep.as_str(), false));
            }
        }

        false
    }
}
