use super::{AnchorPoint, OutputAnchor, PartitionAnchors};
use crate::ir::Graph;
use crate::partition::Partition;

/// Anchors for general and batched matrix multiply.
///
/// Both operands are runtime activations; there is no weight or bias role.
pub(super) fn anchors(graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
    let &[mm] = partition.nodes.as_slice() else {
        return None;
    };

    graph.producer(mm, 0)?;
    graph.producer(mm, 1)?;

    Some(PartitionAnchors {
        inputs: vec![
            AnchorPoint::new(mm, 0, None),
            AnchorPoint::new(mm, 1, None),
        ],
        weights: vec![],
        biases: vec![],
        outputs: vec![OutputAnchor::new(mm, None)],
    })
}
