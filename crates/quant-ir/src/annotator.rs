use crate::annotation::AnnotationTable;
use crate::ir::{Graph, OpKind};
use crate::partition::{find_sequential_partitions, no_outside_users, Partition};
use crate::pattern::{AnchorPoint, PartitionAnchors, QuantizationPattern};
use crate::qspec::{default_qconfig, EdgeSpec, QuantizationConfig, QuantizationSpec};

/// Annotates every eligible partition of one pattern with one config.
///
/// Ineligible partitions (outside users, prior annotation, structural
/// disqualification) are skipped silently: the subgraph simply stays in
/// float. That is the expected path, not an error.
#[derive(Debug, Clone, new)]
pub struct PatternAnnotator {
    pattern: QuantizationPattern,
    config: QuantizationConfig,
}

impl PatternAnnotator {
    /// The pattern this annotator matches.
    pub fn pattern(&self) -> &QuantizationPattern {
        &self.pattern
    }

    /// Runs one pattern pass over the graph, merging results into `table`.
    pub fn annotate(&self, graph: &Graph, table: &mut AnnotationTable) {
        let partitions = find_sequential_partitions(graph, &self.pattern.partition_types());
        let users = graph.users();

        for partition in partitions {
            if !no_outside_users(&users, &partition) {
                log::debug!(
                    "{:?} partition at {} has outside users, left in float",
                    self.pattern,
                    graph.node(partition.output()).name
                );
                continue;
            }

            let Some(anchors) = self.pattern.get_anchors(graph, &partition) else {
                continue;
            };
            assert_anchors_resolvable(graph, &partition, &anchors);

            if table.any_annotated(anchors.nodes()) {
                log::debug!(
                    "{:?} partition at {} already claimed by an earlier pattern",
                    self.pattern,
                    graph.node(partition.output()).name
                );
                continue;
            }

            // All checks passed; from here on the partition is written fully.
            for output in &anchors.outputs {
                let spec = output
                    .custom
                    .clone()
                    .or_else(|| self.config.output_activation.map(EdgeSpec::Observed));
                if let Some(spec) = spec {
                    table.set_output(output.node, spec);
                }
            }
            annotate_inputs(graph, table, &anchors.inputs, self.config.input_activation);
            annotate_inputs(graph, table, &anchors.weights, self.config.weight);
            annotate_inputs(graph, table, &anchors.biases, self.config.bias);
        }
    }
}

/// Attaches the bucket spec (or the anchor's custom override) to each input
/// edge. An absent spec with no override writes nothing: that role stays in
/// float.
fn annotate_inputs(
    graph: &Graph,
    table: &mut AnnotationTable,
    anchors: &[AnchorPoint],
    bucket_spec: Option<QuantizationSpec>,
) {
    for anchor in anchors {
        let producer = graph
            .producer(anchor.node, anchor.input)
            .expect("anchor edges were validated before writing");
        let spec = anchor
            .custom
            .clone()
            .or_else(|| bucket_spec.map(EdgeSpec::Observed));
        if let Some(spec) = spec {
            table.set_input(anchor.node, producer, spec);
        }
    }
}

/// Fail-fast guard against malformed catalog entries.
///
/// An anchor referencing a node outside its own partition, or an input slot
/// that is not fed by a producer node, would turn into silently wrong
/// metadata downstream; crash here instead.
fn assert_anchors_resolvable(graph: &Graph, partition: &Partition, anchors: &PartitionAnchors) {
    for anchor in anchors
        .inputs
        .iter()
        .chain(&anchors.weights)
        .chain(&anchors.biases)
    {
        assert!(
            partition.contains(anchor.node),
            "anchor {} is outside its partition",
            graph.node(anchor.node).name
        );
        assert!(
            graph.producer(anchor.node, anchor.input).is_some(),
            "anchor {}:{} does not reference a producer",
            graph.node(anchor.node).name,
            anchor.input
        );
    }
    for output in &anchors.outputs {
        assert!(
            partition.contains(output.node),
            "output anchor {} is outside its partition",
            graph.node(output.node).name
        );
    }
}

/// Runs a fixed, ordered list of pattern annotators against one graph.
///
/// Order matters: the first pattern to claim an anchor node wins, so callers
/// needing a different operator priority reorder the list they supply.
#[derive(Debug, Clone)]
pub struct ComposableAnnotator {
    annotators: Vec<PatternAnnotator>,
}

impl ComposableAnnotator {
    /// Composes an explicit ordered annotator list.
    pub fn new(annotators: Vec<PatternAnnotator>) -> Self {
        Self { annotators }
    }

    /// The backend's standard catalog with one shared config.
    pub fn with_default_patterns(config: QuantizationConfig) -> Self {
        Self::new(default_annotators(&config))
    }

    /// Annotates the graph into a fresh table.
    pub fn annotate(&self, graph: &Graph) -> AnnotationTable {
        let mut table = AnnotationTable::new();
        self.annotate_into(graph, &mut table);
        table
    }

    /// Annotates the graph, merging into an existing table.
    pub fn annotate_into(&self, graph: &Graph, table: &mut AnnotationTable) {
        for annotator in &self.annotators {
            annotator.annotate(graph, table);
        }
    }

    /// Hook for model-structure validation before lowering proceeds.
    ///
    /// Intentionally empty: this layer imposes no structural constraints.
    pub fn validate(&self, _graph: &Graph) {}

    /// Operators this layer constrains. The backend declares none; real
    /// constraints live in later lowering stages.
    pub fn supported_operators() -> &'static [OpKind] {
        &[]
    }
}

impl Default for ComposableAnnotator {
    fn default() -> Self {
        Self::with_default_patterns(default_qconfig())
    }
}

/// The backend's fixed pattern order.
///
/// The bridged variant runs before plain relu: a relu behind a bridge op
/// matches both, and only the two-node match quantizes the edge entering
/// the bridge.
pub fn default_annotators(config: &QuantizationConfig) -> Vec<PatternAnnotator> {
    let patterns = vec![
        QuantizationPattern::Addmm,
        QuantizationPattern::Bmm,
        QuantizationPattern::Conv1d,
        QuantizationPattern::Conv2d,
        QuantizationPattern::LayerNorm,
        QuantizationPattern::Linear,
        QuantizationPattern::MatMul,
        QuantizationPattern::bridged_relu_default(),
        QuantizationPattern::Relu,
    ];

    patterns
        .into_iter()
        .map(|pattern| PatternAnnotator::new(pattern, config.clone()))
        .collect()
}
