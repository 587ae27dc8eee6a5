use std::collections::HashMap;
use strum::{Display, EnumString};

/// Opaque handle identifying a node within one [`Graph`].
///
/// Ids are dense and follow trace order, which makes every traversal in this
/// crate deterministic across repeated runs on the same graph.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the graph's trace order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Supported operator kinds.
///
/// The set is closed: the annotation engine dispatches over it with plain
/// `match` expressions instead of open-ended virtual dispatch. Operators the
/// backend does not know about simply never match a pattern and are left in
/// float.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, EnumString, Display)]
pub enum OpKind {
    /// Graph input placeholder.
    Input,
    /// Constant tensor (weights, biases, embedded parameters).
    Constant,
    MatMul,
    /// Batched matrix multiply.
    Bmm,
    Conv1d,
    Conv2d,
    LayerNorm,
    Linear,
    Add,
    Mul,
    Relu,
    Reshape,
    Transpose,
    Softmax,
}

/// Element type of the value a node produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementType {
    #[default]
    Float32,
    Float16,
    Int64,
    Int32,
    Int8,
    Uint8,
    Bool,
}

impl ElementType {
    /// Whether observers can collect statistics over this type.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float16)
    }
}

/// A positional input of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Output of another node in the same graph.
    Node(NodeId),
    /// Scalar attribute embedded in the argument list (e.g. an epsilon).
    Scalar(f64),
    /// Optional input that was not provided.
    None,
}

impl Argument {
    /// The producer node, if this argument references one.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Argument::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// One operation or tensor-producing step of the traced graph.
///
/// Nodes produce a single value; multi-output operations are split by the
/// tracer before they reach this crate.
#[derive(Debug, Clone)]
pub struct Node {
    /// The operator kind.
    pub op: OpKind,
    /// The name of the node, unique within the graph.
    pub name: String,
    /// Ordered positional inputs.
    pub inputs: Vec<Argument>,
    /// Element type of the produced value.
    pub dtype: ElementType,
}

/// Consumers of each node, keyed by producer. Consumer lists follow trace
/// order.
pub type UserMap = HashMap<NodeId, Vec<NodeId>>;

/// A traced computation graph.
///
/// Owned by the external tracer before and after annotation; this crate only
/// reads its structure. Nodes are stored in trace order and never removed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node producing a `Float32` value.
    pub fn add_node(
        &mut self,
        op: OpKind,
        name: impl Into<String>,
        inputs: Vec<Argument>,
    ) -> NodeId {
        self.add_node_with_dtype(op, name, inputs, ElementType::Float32)
    }

    /// Appends a node with an explicit output element type.
    pub fn add_node_with_dtype(
        &mut self,
        op: OpKind,
        name: impl Into<String>,
        inputs: Vec<Argument>,
        dtype: ElementType,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = Node {
            op,
            name: name.into(),
            inputs,
            dtype,
        };
        for input in &node.inputs {
            if let Some(producer) = input.as_node() {
                assert!(
                    producer.index() < self.nodes.len(),
                    "node {} references unknown producer {:?}",
                    node.name,
                    producer
                );
            }
        }
        self.nodes.push(node);
        id
    }

    /// Appends a graph input placeholder.
    pub fn add_input(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(OpKind::Input, name, vec![])
    }

    /// Appends a constant (weight/bias) node.
    pub fn add_constant(&mut self, name: impl Into<String>, dtype: ElementType) -> NodeId {
        self.add_node_with_dtype(OpKind::Constant, name, vec![], dtype)
    }

    /// Looks up a node.
    ///
    /// # Panics
    /// Panics if the id does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes in trace order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Producer feeding input `idx` of `id`, if that input references a node.
    pub fn producer(&self, id: NodeId, idx: usize) -> Option<NodeId> {
        self.node(id).inputs.get(idx).and_then(Argument::as_node)
    }

    /// Builds the consumer map for the current graph.
    ///
    /// Recomputed per pass; the map holds an entry for every node so lookups
    /// never miss.
    pub fn users(&self) -> UserMap {
        let mut users: UserMap = self.nodes().map(|(id, _)| (id, Vec::new())).collect();
        for (id, node) in self.nodes() {
            for input in &node.inputs {
                if let Some(producer) = input.as_node() {
                    users
                        .get_mut(&producer)
                        .expect("producer was validated at insertion")
                        .push(id);
                }
            }
        }
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_order_ids() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let w = graph.add_constant("w", ElementType::Float32);
        let mm = graph.add_node(
            OpKind::MatMul,
            "mm",
            vec![Argument::Node(x), Argument::Node(w)],
        );

        assert_eq!(x.index(), 0);
        assert_eq!(w.index(), 1);
        assert_eq!(mm.index(), 2);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.node(mm).op, OpKind::MatMul);
    }

    #[test]
    fn test_users_follow_trace_order() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let a = graph.add_node(OpKind::Relu, "a", vec![Argument::Node(x)]);
        let b = graph.add_node(OpKind::Softmax, "b", vec![Argument::Node(x)]);

        let users = graph.users();
        assert_eq!(users[&x], vec![a, b]);
        assert!(users[&a].is_empty());
        assert!(users[&b].is_empty());
    }

    #[test]
    fn test_producer_lookup() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let ln = graph.add_node(
            OpKind::LayerNorm,
            "ln",
            vec![Argument::Node(x), Argument::Scalar(1e-5)],
        );

        assert_eq!(graph.producer(ln, 0), Some(x));
        assert_eq!(graph.producer(ln, 1), None);
        assert_eq!(graph.producer(ln, 2), None);
    }

    #[test]
    #[should_panic(expected = "references unknown producer")]
    fn test_foreign_producer_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_input("x");
        let mut other = Graph::new();
        let _ = other.add_input("y");
        let foreign = other.add_node(OpKind::Relu, "r", vec![]);
        let _ = x;
        graph.add_node(OpKind::Relu, "bad", vec![Argument::Node(foreign)]);
    }

    #[test]
    fn test_op_kind_display_round_trip() {
        use std::str::FromStr;
        assert_eq!(OpKind::MatMul.to_string(), "MatMul");
        assert_eq!(OpKind::from_str("LayerNorm").unwrap(), OpKind::LayerNorm);
        assert!(OpKind::from_str("NotAnOp").is_err());
    }
}
