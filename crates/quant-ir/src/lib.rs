//! `quant-ir` annotates traced computation graphs with quantization metadata
//! for a fixed-point DSP backend. It walks the graph, matches known operator
//! sub-patterns (matmul, convolution, layer norm, ...) and records a
//! quantization spec for each matched tensor edge in an [`AnnotationTable`].
//! A downstream lowering pass reads the table to decide where to materialize
//! quantize/dequantize operations; edges without an entry stay in float.
//!
//! The graph itself is produced by an external tracer and is never
//! structurally modified here.

#[macro_use]
extern crate derive_new;

/// The graph data model shared with the tracer.
pub mod ir;

mod annotation;
mod annotator;
mod partition;
mod pattern;
mod qspec;

pub use annotation::*;
pub use annotator::*;
pub use partition::*;
pub use pattern::*;
pub use qspec::*;
