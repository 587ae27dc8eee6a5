use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::{Graph, NodeId};
use crate::partition::Partition;
use crate::qspec::{DerivedSpec, EdgeSpec};

/// Anchors for the matmul + add affine fusion.
///
/// The activation is the matmul's first operand, the weight its second; the
/// bias is the add operand that is not the matmul output and carries a
/// derived int32 spec (scale = activation-scale x weight-scale). The output
/// anchor is the add node.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[mm, add] = partition.nodes.as_slice() else {
        return None;
    };

    let act = graph.producer(mm, 0)?;
    let wgt = graph.producer(mm, 1)?;
    let bias_input = bias_operand(graph, add, mm)?;

    let bias_spec = EdgeSpec::Derived(DerivedSpec::bias((act, mm), (wgt, mm)));

    Some(PartitionAnchors {
        inputs: vec![AnchorPoint::new(mm, 0, None)],
        weights: vec![AnchorPoint::new(mm, 1, None)],
        biases: vec![AnchorPoint::new(add, bias_input, Some(bias_spec))],
        outputs: vec![OutputAnchor::new(add, None)],
    })
}

/// Index of the add operand that is not the matmul output.
fn bias_operand(graph: &Graph, add: NodeId, mm: NodeId) -> Option<usize> {
    let inputs = &graph.node(add).inputs;
    if inputs.len() != 2 {
        return None;
    }
    let mm_position = inputs
        .iter()
        .position(|input| input.as_node() == Some(mm))?;
    let bias_position = 1 - mm_position;
    // Both operands being the matmul output leaves no bias to annotate.
    inputs[bias_position]
        .as_node()
        .filter(|id| *id != mm)
        .map(|_| bias_position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Argument, ElementType, OpKind};
    use crate::qspec::{Derivation, QuantDType};

    fn affine_graph(swap_add_operands: bool) -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let w = graph.add_constant("w", ElementType::Float32);
        let b = graph.add_constant("b", ElementType::Float32);
        let mm = graph.add_node(
            OpKind::MatMul,
            "mm",
            vec![Argument::Node(x), Argument::Node(w)],
        );
        let add_inputs = if swap_add_operands {
            vec![Argument::Node(b), Argument::Node(mm)]
        } else {
            vec![Argument::Node(mm), Argument::Node(b)]
        };
        let add = graph.add_node(OpKind::Add, "add", add_inputs);
        (graph, mm, add)
    }

    #[test]
    fn test_bucket_assignment() {
        let (graph, mm, add) = affine_graph(false);
        let anchors = anchors(&graph, &Partition::new(vec![mm, add])).unwrap();

        assert_eq!(anchors.inputs, vec![AnchorPoint::new(mm, 0, None)]);
        assert_eq!(anchors.weights, vec![AnchorPoint::new(mm, 1, None)]);
        assert_eq!(anchors.outputs, vec![OutputAnchor::new(add, None)]);
        assert_eq!(anchors.biases.len(), 1);
        assert_eq!(anchors.biases[0].node, add);
        assert_eq!(anchors.biases[0].input, 1);
    }

    #[test]
    fn test_bias_found_on_either_operand() {
        let (graph, mm, add) = affine_graph(true);
        let anchors = anchors(&graph, &Partition::new(vec![mm, add])).unwrap();

        assert_eq!(anchors.biases[0].input, 0);
    }

    #[test]
    fn test_bias_spec_is_derived_from_matmul_edges() {
        let (graph, mm, add) = affine_graph(false);
        let anchors = anchors(&graph, &Partition::new(vec![mm, add])).unwrap();

        let Some(EdgeSpec::Derived(spec)) = &anchors.biases[0].custom else {
            panic!("expected a derived bias spec");
        };
        let act = graph.producer(mm, 0).unwrap();
        let wgt = graph.producer(mm, 1).unwrap();
        assert_eq!(spec.sources, vec![(act, mm), (wgt, mm)]);
        assert_eq!(spec.dtype, QuantDType::Int32);
        assert_eq!(spec.derivation, Derivation::ScaleProduct);
    }

    #[test]
    fn test_add_without_second_operand_disqualifies() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let w = graph.add_constant("w", ElementType::Float32);
        let mm = graph.add_node(
            OpKind::MatMul,
            "mm",
            vec![Argument::Node(x), Argument::Node(w)],
        );
        let add = graph.add_node(OpKind::Add, "add", vec![Argument::Node(mm)]);

        assert!(anchors(&graph, &Partition::new(vec![mm, add])).is_none());
    }
}
