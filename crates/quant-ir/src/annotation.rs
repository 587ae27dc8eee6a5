use std::collections::BTreeMap;

use crate::ir::NodeId;
use crate::qspec::EdgeSpec;

/// Quantization metadata recorded for one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuantizationAnnotation {
    /// Spec for the value this node produces, if the node is an output
    /// anchor of some partition.
    pub output: Option<EdgeSpec>,
    /// Spec per input edge, keyed by the producing node.
    pub inputs: BTreeMap<NodeId, EdgeSpec>,
}

/// Append-only record of quantization annotations, keyed by node identity.
///
/// Kept alongside the graph rather than inside it so the structure and the
/// analysis result stay independently testable. The downstream lowering pass
/// must treat an absent entry (or an absent edge within an entry) as "leave
/// this tensor in float".
///
/// A node counts as annotated as soon as it holds any entry; later patterns
/// must not claim it again. Writes within a single partition merge into an
/// existing entry (a node can be the output anchor of one partition and an
/// input anchor of the same or a neighboring one), but an already-set output
/// spec is never overwritten.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationTable {
    entries: BTreeMap<NodeId, QuantizationAnnotation>,
}

impl AnnotationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The annotation recorded for `id`, if any.
    pub fn get(&self, id: NodeId) -> Option<&QuantizationAnnotation> {
        self.entries.get(&id)
    }

    /// Whether `id` already carries an annotation.
    pub fn is_annotated(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Whether any of `ids` already carries an annotation.
    pub fn any_annotated(&self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        ids.into_iter().any(|id| self.is_annotated(id))
    }

    /// Records the output spec of `node`, creating or merging its entry.
    ///
    /// # Panics
    /// Panics if an output spec is already present; callers gate writes on
    /// [`Self::any_annotated`], so a second claim is a bug in the catalog.
    pub fn set_output(&mut self, node: NodeId, spec: EdgeSpec) {
        let entry = self.entries.entry(node).or_default();
        assert!(
            entry.output.is_none(),
            "output of {node:?} annotated twice"
        );
        entry.output = Some(spec);
    }

    /// Records the spec of the `producer -> node` input edge, creating or
    /// merging the entry for `node`.
    pub fn set_input(&mut self, node: NodeId, producer: NodeId, spec: EdgeSpec) {
        self.entries
            .entry(node)
            .or_default()
            .inputs
            .insert(producer, spec);
    }

    /// Number of annotated nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no node is annotated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &QuantizationAnnotation)> {
        self.entries.iter().map(|(id, ann)| (*id, ann))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Argument, Graph, OpKind};
    use crate::qspec::{default_qconfig, EdgeSpec};

    fn spec() -> EdgeSpec {
        EdgeSpec::Observed(default_qconfig().input_activation.unwrap())
    }

    fn three_nodes() -> (NodeId, NodeId, NodeId) {
        let mut graph = Graph::new();
        let a = graph.add_input("a");
        let b = graph.add_node(OpKind::Relu, "b", vec![Argument::Node(a)]);
        let c = graph.add_node(OpKind::Relu, "c", vec![Argument::Node(b)]);
        (a, b, c)
    }

    #[test]
    fn test_merge_output_then_input_on_same_node() {
        let (a, b, _) = three_nodes();
        let mut table = AnnotationTable::new();

        table.set_output(b, spec());
        table.set_input(b, a, spec());

        let ann = table.get(b).unwrap();
        assert!(ann.output.is_some());
        assert_eq!(ann.inputs.len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_any_annotated() {
        let (a, b, c) = three_nodes();
        let mut table = AnnotationTable::new();
        table.set_input(b, a, spec());

        assert!(table.is_annotated(b));
        assert!(!table.is_annotated(a));
        assert!(table.any_annotated([a, b]));
        assert!(!table.any_annotated([a, c]));
    }

    #[test]
    #[should_panic(expected = "annotated twice")]
    fn test_double_output_claim_panics() {
        let (_, b, _) = three_nodes();
        let mut table = AnnotationTable::new();
        table.set_output(b, spec());
        table.set_output(b, spec());
    }
}
