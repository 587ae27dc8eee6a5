use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::Graph;
use crate::partition::Partition;
use crate::qspec::{DerivedSpec, EdgeSpec};

/// Anchors for the plain linear transform: activation at operand 0, weight
/// at operand 1, optional bias at operand 2 with a derived int32 spec.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[linear] = partition.nodes.as_slice() else {
        return None;
    };

    let act = graph.producer(linear, 0)?;
    let wgt = graph.producer(linear, 1)?;
    if !graph.node(wgt).dtype.is_float() {
        return None;
    }

    let mut anchors = PartitionAnchors {
        inputs: vec![AnchorPoint::new(linear, 0, None)],
        weights: vec![AnchorPoint::new(linear, 1, None)],
        biases: vec![],
        outputs: vec![OutputAnchor::new(linear, None)],
    };

    if graph.producer(linear, 2).is_some() {
        let bias_spec = EdgeSpec::Derived(DerivedSpec::bias((act, linear), (wgt, linear)));
        anchors
            .biases
            .push(AnchorPoint::new(linear, 2, Some(bias_spec)));
    }

    Some(anchors)
}
