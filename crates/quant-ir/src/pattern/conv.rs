use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::Graph;
use crate::partition::Partition;
use crate::qspec::{DerivedSpec, EdgeSpec};

/// Anchors for 1-D and 2-D convolution.
///
/// Activation at operand 0, weight at operand 1, optional bias at operand 2
/// with a derived int32 spec. A non-float weight disqualifies the partition;
/// the backend's observers only collect float statistics.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[conv] = partition.nodes.as_slice() else {
        return None;
    };

    let act = graph.producer(conv, 0)?;
    let wgt = graph.producer(conv, 1)?;
    if !graph.node(wgt).dtype.is_float() {
        log::debug!(
            "conv {} has non-float weight, left in float",
            graph.node(conv).name
        );
        return None;
    }

    let mut anchors = PartitionAnchors {
        inputs: vec![AnchorPoint::new(conv, 0, None)],
        weights: vec![AnchorPoint::new(conv, 1, None)],
        biases: vec![],
        outputs: vec![OutputAnchor::new(conv, None)],
    };

    if graph.producer(conv, 2).is_some() {
        let bias_spec = EdgeSpec::Derived(DerivedSpec::bias((act, conv), (wgt, conv)));
        anchors.biases.push(AnchorPoint::new(conv, 2, Some(bias_spec)));
    }

    Some(anchors)
}
