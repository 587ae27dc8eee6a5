use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::Graph;
use crate::partition::Partition;

/// Anchors for relu applied directly to its producer's output.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[relu] = partition.nodes.as_slice() else {
        return None;
    };

    graph.producer(relu, 0)?;

    Some(PartitionAnchors {
        inputs: vec![AnchorPoint::new(relu, 0, None)],
        weights: vec![],
        biases: vec![],
        outputs: vec![OutputAnchor::new(relu, None)],
    })
}

/// Anchors for relu one level removed from its producer.
///
/// The partition is (bridge, relu); the quantized input edge is the one
/// entering the bridge, and the output is the relu. The bridge op itself is
/// shape-preserving movement, so no spec is attached to the internal edge.
pub(super) fn bridged_anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[bridge, relu] = partition.nodes.as_slice() else {
        return None;
    };

    graph.producer(bridge, 0)?;

    Some(PartitionAnchors {
        inputs: vec![AnchorPoint::new(bridge, 0, None)],
        weights: vec![],
        biases: vec![],
        outputs: vec![OutputAnchor::new(relu, None)],
    })
}
