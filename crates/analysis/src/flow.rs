use std::collections::BTreeMap;

use crate::model::{FlowGraph, GraphLink, GraphNode, NodeKind};

/// Links kept in the graph, by descending value.
pub const MAX_FLOW_LINKS: usize = 50;

/// Source -> target money flow, summed per pair during the row pass.
#[derive(Debug, Default)]
pub struct FlowGraphBuilder {
    pairs: BTreeMap<(String, String), f64>,
}

impl FlowGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, source: String, target: String, amount: f64) {
        *self.pairs.entry((source, target)).or_insert(0.0) += amount;
    }

    /// Keep the top pairs. Node values are the sum of the node's retained
    /// links only, not the entity's total across all rows.
    pub fn finish(self) -> FlowGraph {
        let mut pairs: Vec<((String, String), f64)> = self.pairs.into_iter().collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(MAX_FLOW_LINKS);

        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut index: BTreeMap<(NodeKind, String), usize> = BTreeMap::new();
        let mut add = |nodes: &mut Vec<GraphNode>, kind: NodeKind, id: &str, value: f64| {
            let slot = *index.entry((kind, id.to_string())).or_insert_with(|| {
                nodes.push(GraphNode {
                    id: id.to_string(),
                    kind,
                    value: 0.0,
                });
                nodes.len() - 1
            });
            nodes[slot].value += value;
        };

        let mut links = Vec::with_capacity(pairs.len());
        for ((source, target), value) in pairs {
            add(&mut nodes, NodeKind::Source, &source, value);
            add(&mut nodes, NodeKind::Target, &target, value);
            links.push(GraphLink {
                source,
                target,
                value,
            });
        }

        FlowGraph { nodes, links }
    }
}
