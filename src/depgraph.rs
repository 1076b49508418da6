use std::collections::HashMap;

/// Directed graph over class names, used to order classes so that every
/// superclass is registered and emitted before its subclasses.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    vertices: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_vertex(&mut self, vertex: &str) {
        if !self.vertices.iter().any(|v| v == vertex) {
            self.vertices.push(vertex.to_owned());
        }
    }

    /// Record that `incident` depends on `vertex` coming first.
    pub fn add_edge(&mut self, vertex: &str, incident: &str) {
        self.add_vertex(vertex);
        self.add_vertex(incident);
        self.edges
            .entry(vertex.to_owned())
            .or_default()
            .push(incident.to_owned());
    }

    /// Depth-first topological sort. Vertices are visited in insertion order,
    /// so the result is stable for identical input.
    pub fn topological_sort(&self) -> Vec<String> {
        let mut visited: Vec<String> = vec![];
        let mut stack: Vec<String> = vec![];

        for vertex in &self.vertices {
            if !visited.iter().any(|v| v == vertex) {
                self.visit(vertex, &mut visited, &mut stack);
            }
        }

        stack
    }

    fn visit(&self, vertex: &str, visited: &mut Vec<String>, stack: &mut Vec<String>) {
        visited.push(vertex.to_owned());

        if let Some(neighbours) = self.edges.get(vertex) {
            for neighbour in neighbours {
                if !visited.iter().any(|v| v == neighbour) {
                    self.visit(neighbour, visited, stack);
                }
            }
        }

        stack.insert(0, vertex.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supers_come_first() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("Obj", "A");
        graph.add_edge("A", "B");
        graph.add_edge("A", "C");

        let order = graph.topological_sort();
        let index = |name: &str| order.iter().position(|v| v == name).unwrap();

        assert!(index("Obj") < index("A"));
        assert!(index("A") < index("B"));
        assert!(index("A") < index("C"));
    }

    #[test]
    fn test_order_is_deterministic() {
        let build = || {
            let mut graph = DependencyGraph::new();
            graph.add_edge("Obj", "B");
            graph.add_edge("Obj", "A");
            graph.topological_sort()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_diamond_of_unrelated_roots() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("Obj", "A");
        graph.add_edge("A", "B");
        graph.add_edge("Obj", "C");

        let order = graph.topological_sort();
        assert_eq!(order.len(), 4);
        let index = |name: &str| order.iter().position(|v| v == name).unwrap();
        assert!(index("Obj") < index("C"));
        assert!(index("A") < index("B"));
    }
}
