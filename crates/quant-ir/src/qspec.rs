use serde::{Deserialize, Serialize};

use crate::ir::NodeId;

/// Histogram observer epsilon used by the backend (2^-12).
pub const HISTOGRAM_EPS: f32 = 2.44140625e-4;

/// Integer storage type of a quantized tensor.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantDType {
    /// 8-bit unsigned integer.
    Uint8,
    /// 8-bit signed integer.
    Int8,
    /// 32-bit signed integer (bias accumulator precision).
    Int32,
}

/// Numeric mapping from floating-point values to the fixed-point grid.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantScheme {
    /// Affine or asymmetric quantization, one scale and zero-point per tensor.
    PerTensorAffine,
    /// Symmetric or scale quantization, one scale per tensor.
    PerTensorSymmetric,
}

/// Statistics-collection strategy used to derive scale and zero-point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObserverKind {
    /// Running min/max of observed values. Sufficient for static weights.
    MinMax,
    /// Running histogram of observed values; more robust range estimation
    /// under outliers than plain min/max.
    Histogram {
        /// Smallest representable scale.
        eps: f32,
    },
}

/// Describes how one tensor edge is to be quantized.
///
/// Immutable value object; configs hand out clones of the same spec to many
/// annotations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizationSpec {
    /// Storage type.
    pub dtype: QuantDType,
    /// Lowest representable quantized value.
    pub qmin: i64,
    /// Highest representable quantized value.
    pub qmax: i64,
    /// Quantization scheme.
    pub scheme: QuantScheme,
    /// Dynamic (per-batch) vs static (calibrated) range.
    pub dynamic: bool,
    /// Observer used to derive scale and zero-point.
    pub observer: ObserverKind,
}

impl QuantizationSpec {
    /// Standard 8-bit unsigned affine per-tensor spec with a static range.
    pub fn uint8_affine(observer: ObserverKind) -> Self {
        Self {
            dtype: QuantDType::Uint8,
            qmin: 0,
            qmax: 255,
            scheme: QuantScheme::PerTensorAffine,
            dynamic: false,
            observer,
        }
    }
}

/// How a derived spec computes its parameters from its source edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Derivation {
    /// scale = product of the source edges' scales, zero-point = 0.
    ScaleProduct,
}

/// A spec whose scale/zero-point is computed from other edges' already
/// determined parameters instead of being independently observed.
///
/// The canonical use is the bias of an affine op: its scale must equal
/// activation-scale x weight-scale so the accumulator stays aligned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Source edges as (producer, consumer) pairs, in derivation order.
    pub sources: Vec<(NodeId, NodeId)>,
    /// Storage type.
    pub dtype: QuantDType,
    /// Lowest representable quantized value.
    pub qmin: i64,
    /// Highest representable quantized value.
    pub qmax: i64,
    /// Quantization scheme.
    pub scheme: QuantScheme,
    /// Parameter derivation rule.
    pub derivation: Derivation,
}

impl DerivedSpec {
    /// Int32 bias spec derived from the activation and weight edges feeding
    /// the same consumer.
    pub fn bias(activation: (NodeId, NodeId), weight: (NodeId, NodeId)) -> Self {
        Self {
            sources: vec![activation, weight],
            dtype: QuantDType::Int32,
            qmin: i32::MIN as i64,
            qmax: i32::MAX as i64,
            scheme: QuantScheme::PerTensorSymmetric,
            derivation: Derivation::ScaleProduct,
        }
    }
}

/// Spec attached to a single graph edge by an annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EdgeSpec {
    /// Parameters come from an observer over sampled values.
    Observed(QuantizationSpec),
    /// Parameters are derived from other edges' parameters.
    Derived(DerivedSpec),
}

/// The spec bundle applied uniformly across all patterns, unless a pattern
/// supplies a custom override per anchor.
///
/// `None` means "do not quantize that role"; the default config leaves biases
/// in higher precision this way.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantizationConfig {
    /// Spec for activation inputs.
    pub input_activation: Option<QuantizationSpec>,
    /// Spec for produced activations.
    pub output_activation: Option<QuantizationSpec>,
    /// Spec for weight inputs.
    pub weight: Option<QuantizationSpec>,
    /// Spec for bias inputs.
    pub bias: Option<QuantizationSpec>,
}

/// The backend's standard config: 8-bit unsigned affine per-tensor for
/// activations and weights, no bias quantization.
///
/// Activations use a histogram observer for better range estimation under
/// outliers; weights are static after training, so plain min/max is enough.
/// Returns a fresh value each call; there is no process-wide config object.
pub fn default_qconfig() -> QuantizationConfig {
    let act = QuantizationSpec::uint8_affine(ObserverKind::Histogram { eps: HISTOGRAM_EPS });
    let wgt = QuantizationSpec::uint8_affine(ObserverKind::MinMax);

    QuantizationConfig {
        input_activation: Some(act),
        output_activation: Some(act),
        weight: Some(wgt),
        bias: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_qconfig_activations_use_histogram() {
        let config = default_qconfig();
        let act = config.input_activation.unwrap();

        assert_eq!(act.dtype, QuantDType::Uint8);
        assert_eq!((act.qmin, act.qmax), (0, 255));
        assert_eq!(act.scheme, QuantScheme::PerTensorAffine);
        assert!(!act.dynamic);
        assert_eq!(act.observer, ObserverKind::Histogram { eps: HISTOGRAM_EPS });
        assert_eq!(config.output_activation, Some(act));
    }

    #[test]
    fn test_default_qconfig_weights_use_min_max() {
        let config = default_qconfig();
        let wgt = config.weight.unwrap();

        assert_eq!(wgt.observer, ObserverKind::MinMax);
        assert_eq!((wgt.qmin, wgt.qmax), (0, 255));
        assert_eq!(wgt.scheme, QuantScheme::PerTensorAffine);
    }

    #[test]
    fn test_default_qconfig_has_no_bias_spec() {
        assert_eq!(default_qconfig().bias, None);
    }

    #[test]
    fn test_derived_bias_spec_covers_int32_range() {
        use crate::ir::{Argument, ElementType, Graph, OpKind};

        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let w = graph.add_constant("w", ElementType::Float32);
        let mm = graph.add_node(
            OpKind::MatMul,
            "mm",
            vec![Argument::Node(x), Argument::Node(w)],
        );

        let a = (x, mm);
        let w = (w, mm);
        let spec = DerivedSpec::bias(a, w);

        assert_eq!(spec.dtype, QuantDType::Int32);
        assert_eq!(spec.qmin, i32::MIN as i64);
        assert_eq!(spec.qmax, i32::MAX as i64);
        assert_eq!(spec.derivation, Derivation::ScaleProduct);
        assert_eq!(spec.sources, vec![a, w]);
    }
}
