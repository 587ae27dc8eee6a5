use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::Graph;
use crate::partition::Partition;

/// Anchors for layer normalization.
///
/// Only the data edge and the output are quantized; the affine weight and
/// bias operands stay in float on this backend, so the weight/bias buckets
/// are left empty rather than disqualifying the partition.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[ln] = partition.nodes.as_slice() else {
        return None;
    };

    graph.producer(ln, 0)?;

    Some(PartitionAnchors {
        inputs: vec![AnchorPoint::new(ln, 0, None)],
        weights: vec![],
        biases: vec![],
        outputs: vec![OutputAnchor::new(ln, None)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Argument, ElementType, OpKind};

    #[test]
    fn test_weight_and_bias_stay_float() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let w = graph.add_constant("w", ElementType::Float32);
        let b = graph.add_constant("b", ElementType::Float32);
        let ln = graph.add_node(
            OpKind::LayerNorm,
            "ln",
            vec![
                Argument::Node(x),
                Argument::Node(w),
                Argument::Node(b),
                Argument::Scalar(1e-5),
            ],
        );

        let anchors = anchors(&graph, &Partition::new(vec![ln])).unwrap();

        assert_eq!(anchors.inputs, vec![AnchorPoint::new(ln, 0, None)]);
        assert!(anchors.weights.is_empty());
        assert!(anchors.biases.is_empty());
        assert_eq!(anchors.outputs, vec![OutputAnchor::new(ln, None)]);
    }

    #[test]
    fn test_missing_data_input_disqualifies() {
        let mut graph = Graph::new();
        let ln = graph.add_node(OpKind::LayerNorm, "ln", vec![Argument::Scalar(1e-5)]);

        assert!(anchors(&graph, &Partition::new(vec![ln])).is_none());
    }
}
