//! Catalog of operator sub-patterns the backend quantizes.
//!
//! Each pattern declares the operator signature that defines a match and
//! resolves a matched partition into role buckets (activation inputs,
//! weights, biases, outputs). Patterns are stateless and safely reused
//! across graphs and runs.

mod addmm;
mod conv;
mod layer_norm;
mod linear;
mod matmul;
mod relu;

use crate::ir::{Graph, NodeId, OpKind};
use crate::partition::{OpMatcher, Partition};
use crate::qspec::EdgeSpec;

/// A (node, input index) pair requiring an input-side spec.
#[derive(Debug, Clone, PartialEq, new)]
pub struct AnchorPoint {
    /// The consuming node. Must belong to the matched partition.
    pub node: NodeId,
    /// Index into the node's positional inputs.
    pub input: usize,
    /// Pattern-specific override; `None` falls back to the config spec of
    /// the anchor's bucket.
    pub custom: Option<EdgeSpec>,
}

/// A node whose produced value requires an output-side spec.
#[derive(Debug, Clone, PartialEq, new)]
pub struct OutputAnchor {
    /// The producing node. Must belong to the matched partition.
    pub node: NodeId,
    /// Pattern-specific override; `None` falls back to the config's output
    /// activation spec.
    pub custom: Option<EdgeSpec>,
}

/// Role buckets resolved for one matched partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionAnchors {
    /// Activation inputs.
    pub inputs: Vec<AnchorPoint>,
    /// Weight inputs.
    pub weights: Vec<AnchorPoint>,
    /// Bias inputs.
    pub biases: Vec<AnchorPoint>,
    /// Produced values.
    pub outputs: Vec<OutputAnchor>,
}

impl PartitionAnchors {
    /// All nodes referenced by any bucket, in bucket order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.inputs
            .iter()
            .chain(&self.weights)
            .chain(&self.biases)
            .map(|anchor| anchor.node)
            .chain(self.outputs.iter().map(|anchor| anchor.node))
            .collect()
    }
}

/// The operator sub-patterns eligible for quantization.
///
/// A closed set: adding backend support for a new operator means adding a
/// variant plus its arm in [`Self::partition_types`] and
/// [`Self::get_anchors`].
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizationPattern {
    /// Matrix multiply immediately followed by a bias add (affine fusion).
    Addmm,
    /// Batched matrix multiply.
    Bmm,
    /// 1-D convolution.
    Conv1d,
    /// 2-D convolution.
    Conv2d,
    /// Layer normalization. Weight and bias stay in float.
    LayerNorm,
    /// Plain linear transform with fused weight (and optional bias).
    Linear,
    /// General matrix multiply; both operands are activations.
    MatMul,
    /// Relu applied directly to its producer's output.
    Relu,
    /// Relu one level removed from its producer, through an allow-listed
    /// intermediate op.
    BridgedRelu {
        /// Operator kinds allowed to sit between the producer and the relu.
        bridges: Vec<OpKind>,
    },
}

impl QuantizationPattern {
    /// The bridged-relu variant with the backend's standard allow-list of
    /// shape-preserving movement ops.
    pub fn bridged_relu_default() -> Self {
        Self::BridgedRelu {
            bridges: vec![OpKind::Reshape, OpKind::Transpose],
        }
    }

    /// Ordered operator signature that defines a match.
    pub fn partition_types(&self) -> Vec<OpMatcher> {
        match self {
            Self::Addmm => vec![
                OpMatcher::Exact(OpKind::MatMul),
                OpMatcher::Exact(OpKind::Add),
            ],
            Self::Bmm => vec![OpMatcher::Exact(OpKind::Bmm)],
            Self::Conv1d => vec![OpMatcher::Exact(OpKind::Conv1d)],
            Self::Conv2d => vec![OpMatcher::Exact(OpKind::Conv2d)],
            Self::LayerNorm => vec![OpMatcher::Exact(OpKind::LayerNorm)],
            Self::Linear => vec![OpMatcher::Exact(OpKind::Linear)],
            Self::MatMul => vec![OpMatcher::Exact(OpKind::MatMul)],
            Self::Relu => vec![OpMatcher::Exact(OpKind::Relu)],
            Self::BridgedRelu { bridges } => vec![
                OpMatcher::AnyOf(bridges.clone()),
                OpMatcher::Exact(OpKind::Relu),
            ],
        }
    }

    /// Resolves role buckets for one matched partition.
    ///
    /// Returns `None` when the partition's internal structure disqualifies
    /// it for annotation (e.g. a weight operand whose dtype observers cannot
    /// handle); the caller then skips the partition, leaving it in float.
    pub fn get_anchors(&self, graph: &Graph, partition: &Partition) -> Option<PartitionAnchors> {
        match self {
            Self::Addmm => addmm::anchors(graph, partition),
            Self::Bmm | Self::MatMul => matmul::anchors(graph, partition),
            Self::Conv1d | Self::Conv2d => conv::anchors(graph, partition),
            Self::LayerNorm => layer_norm::anchors(graph, partition),
            Self::Linear => linear::anchors(graph, partition),
            Self::Relu => relu::anchors(graph, partition),
            Self::BridgedRelu { .. } => relu::bridged_anchors(graph, partition),
        }
    }
}
