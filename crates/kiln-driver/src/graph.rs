//! Module graph built while transpiling a project

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Node in the module graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleNode {
    pub path: String,
    pub transpiled: String,
    /// Resolved modules this module requires
    pub dependencies: Vec<String>,
    /// Directories whose files may be required at run time
    pub directory_dependencies: Vec<String>,
    pub errors: Vec<String>,
}

/// Transpiled modules and the edges between them.
///
/// CommonJS allows circular requires, so cycles are reported rather than
/// rejected.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: BTreeMap<String, ModuleNode>,
    entry: Option<String>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entry(&mut self, path: impl Into<String>) {
        self.entry = Some(path.into());
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn add_module(&mut self, node: ModuleNode) {
        self.modules.insert(node.path.clone(), node);
    }

    pub fn get_module(&self, path: &str) -> Option<&ModuleNode> {
        self.modules.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values()
    }

    /// Modules that recorded at least one error.
    pub fn failed_modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values().filter(|node| !node.errors.is_empty())
    }

    /// Every cycle found by a depth-first walk, each as the path of modules
    /// from the first revisited module back to itself.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for path in self.modules.keys() {
            if !visited.contains(path.as_str()) {
                self.find_cycles_from(path, &mut visited, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_from<'a>(
        &'a self,
        current: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(current);
        stack.push(current);

        if let Some(node) = self.modules.get(current) {
            for dep in &node.dependencies {
                if let Some(start) = stack.iter().position(|path| *path == dep.as_str()) {
                    let mut cycle: Vec<String> = stack[start..].iter().map(|path| path.to_string()).collect();
                    cycle.push(dep.clone());
                    cycles.push(cycle);
                } else if !visited.contains(dep.as_str()) {
                    self.find_cycles_from(dep, visited, stack, cycles);
                }
            }
        }

        stack.pop();
    }

    /// Modules with their dependencies first.
    ///
    /// Modules caught in a cycle follow the rest, in path order.
    pub fn dependency_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for (path, node) in &self.modules {
            let mut count = 0;
            for dep in node.dependencies.iter().filter(|dep| self.modules.contains_key(*dep)) {
                count += 1;
                dependents.entry(dep.as_str()).or_default().push(path.as_str());
            }
            in_degree.insert(path.as_str(), count);
        }

        // Kahn's algorithm, seeded in path order for a stable result
        let mut queue: VecDeque<&str> = self
            .modules
            .keys()
            .map(String::as_str)
            .filter(|path| in_degree.get(path) == Some(&0))
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(self.modules.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());
            placed.insert(current);

            for &dependent in dependents.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        for path in self.modules.keys() {
            if !placed.contains(path.as_str()) {
                order.push(path.clone());
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str, dependencies: &[&str]) -> ModuleNode {
        ModuleNode {
            path: path.to_string(),
            dependencies: dependencies.iter().map(|dep| dep.to_string()).collect(),
            ..Default::default()
        }
    }

    fn position(order: &[String], path: &str) -> usize {
        order.iter().position(|p| p == path).unwrap()
    }

    #[test]
    fn test_simple_graph() {
        let mut graph = ModuleGraph::new();

        // c requires b, b requires a
        graph.add_module(node("/a.js", &[]));
        graph.add_module(node("/b.js", &["/a.js"]));
        graph.add_module(node("/c.js", &["/b.js"]));

        let order = graph.dependency_order();
        assert!(position(&order, "/a.js") < position(&order, "/b.js"));
        assert!(position(&order, "/b.js") < position(&order, "/c.js"));
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn test_cycles_are_reported_not_fatal() {
        let mut graph = ModuleGraph::new();

        graph.add_module(node("/a.js", &["/b.js"]));
        graph.add_module(node("/b.js", &["/a.js"]));
        graph.add_module(node("/c.js", &[]));

        assert_eq!(
            graph.find_cycles(),
            vec![vec!["/a.js".to_string(), "/b.js".to_string(), "/a.js".to_string()]]
        );
        assert_eq!(graph.dependency_order(), vec!["/c.js", "/a.js", "/b.js"]);
    }

    #[test]
    fn test_diamond_dependency() {
        let mut graph = ModuleGraph::new();

        // Diamond: d -> b,c; b,c -> a
        graph.add_module(node("/a.js", &[]));
        graph.add_module(node("/b.js", &["/a.js"]));
        graph.add_module(node("/c.js", &["/a.js"]));
        graph.add_module(node("/d.js", &["/b.js", "/c.js"]));

        let order = graph.dependency_order();
        assert!(position(&order, "/a.js") < position(&order, "/b.js"));
        assert!(position(&order, "/a.js") < position(&order, "/c.js"));
        assert!(position(&order, "/b.js") < position(&order, "/d.js"));
        assert!(position(&order, "/c.js") < position(&order, "/d.js"));
    }

    #[test]
    fn test_failed_modules() {
        let mut graph = ModuleGraph::new();
        graph.add_module(node("/a.js", &[]));
        graph.add_module(ModuleNode {
            errors: vec!["boom".into()],
            ..node("/b.js", &[])
        });

        let failed: Vec<&str> = graph.failed_modules().map(|node| node.path.as_str()).collect();
        assert_eq!(failed, vec!["/b.js"]);
    }
}
