use crate::ir::{Graph, NodeId, OpKind, UserMap};

/// Matches one position of a pattern's operator signature.
#[derive(Debug, Clone, PartialEq)]
pub enum OpMatcher {
    /// Exactly this operator.
    Exact(OpKind),
    /// Any operator from the list. Used for configurable positions such as
    /// the bridged-relu intermediate allow-list.
    AnyOf(Vec<OpKind>),
}

impl OpMatcher {
    /// Whether `op` satisfies this position.
    pub fn matches(&self, op: OpKind) -> bool {
        match self {
            OpMatcher::Exact(kind) => *kind == op,
            OpMatcher::AnyOf(kinds) => kinds.contains(&op),
        }
    }
}

/// A node chain matched one-to-one against a signature sequence.
///
/// Ephemeral: recomputed fresh for every pattern on every pass, never cached
/// across runs. The last node is the partition's designated output.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Partition {
    /// Matched nodes in signature order. Never empty.
    pub nodes: Vec<NodeId>,
}

impl Partition {
    /// First node of the chain.
    pub fn entry(&self) -> NodeId {
        self.nodes[0]
    }

    /// The designated output node.
    pub fn output(&self) -> NodeId {
        *self.nodes.last().expect("partition is never empty")
    }

    /// Whether `id` belongs to the partition.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }
}

/// Finds all node chains matching `signature` in strict producer -> consumer
/// order.
///
/// A length-1 signature yields one partition per matching node. For longer
/// signatures the chain only extends through nodes whose sole consumer is the
/// next element, which guarantees the chain is fusable into one unit; a chain
/// blocked partway yields nothing (matches are all-or-nothing). Partitions
/// come back in trace order, so repeated runs on the same graph produce the
/// same sequence. The graph is not mutated.
pub fn find_sequential_partitions(graph: &Graph, signature: &[OpMatcher]) -> Vec<Partition> {
    assert!(!signature.is_empty(), "signature sequence must be non-empty");

    let users = graph.users();
    let mut partitions = Vec::new();

    'candidates: for (id, node) in graph.nodes() {
        if !signature[0].matches(node.op) {
            continue;
        }

        let mut chain = vec![id];
        for matcher in &signature[1..] {
            let last = *chain.last().unwrap();
            let consumers = &users[&last];
            // A consumer outside the would-be partition blocks fusion.
            if consumers.len() != 1 {
                log::debug!(
                    "chain at {} not fusable: {} consumers",
                    graph.node(last).name,
                    consumers.len()
                );
                continue 'candidates;
            }
            let next = consumers[0];
            if !matcher.matches(graph.node(next).op) {
                continue 'candidates;
            }
            chain.push(next);
        }
        partitions.push(Partition::new(chain));
    }

    partitions
}

/// Whether no strictly internal (non-output) node of the partition is
/// consumed outside of it.
///
/// Quantizing a value that another consumer still reads in float would
/// silently corrupt that consumer's input, so callers skip such partitions.
pub fn no_outside_users(users: &UserMap, partition: &Partition) -> bool {
    let internal = &partition.nodes[..partition.nodes.len() - 1];
    internal
        .iter()
        .all(|id| users[id].iter().all(|user| partition.contains(*user)))
}
