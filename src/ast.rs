//! Abstract Syntax Tree for compiled message templates.
//!
//! Nodes live in a flat arena owned by [`Template`] and refer to each other by
//! [`NodeId`]. Node 0 is always the root [`NodeKind::Sequence`]. The tree is
//! immutable once built; everything resolved while serializing or parsing is kept
//! per pass by the walker, so one `Template` can be shared between threads.

use std::fmt;

/// Index of a node inside its [`Template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node represents on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordered children, rendered back to back. Only used for the root.
    Sequence,
    /// Fixed text.
    Literal(String),
    /// A single named control character, e.g. `<CR>`.
    Symbol { name: String, character: char },
    /// Projection of a record field; `length` is `None` when the field is unbounded.
    Field { name: String, length: Option<usize> },
    /// Children that may be missing as a whole.
    Optional,
    /// Children rendered once per element of the driving sequence fields.
    Repeated { delimiter: String },
    /// Children whose text is checksum input.
    ChecksumScope { reference: String },
    /// One checksum character computed over the scope named `reference`.
    ChecksumPlaceholder { reference: String },
}

impl NodeKind {
    /// Kinds that own children.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            NodeKind::Sequence
                | NodeKind::Optional
                | NodeKind::Repeated { .. }
                | NodeKind::ChecksumScope { .. }
        )
    }

    /// Short label used in diagnostics and dumps.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Sequence => "sequence",
            NodeKind::Literal(_) => "literal",
            NodeKind::Symbol { .. } => "symbol",
            NodeKind::Field { .. } => "field",
            NodeKind::Optional => "optional",
            NodeKind::Repeated { .. } => "repeated",
            NodeKind::ChecksumScope { .. } => "checksum scope",
            NodeKind::ChecksumPlaceholder { .. } => "checksum",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Byte range of the node in the template source.
    pub span: (usize, usize),
    /// Position inside the parent's children.
    pub(crate) slot: usize,
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Default for Template {
    fn default() -> Self {
        Template::new()
    }
}

impl Template {
    /// A template holding only an empty root sequence.
    pub fn new() -> Self {
        Template {
            nodes: vec![Node {
                kind: NodeKind::Sequence,
                parent: None,
                children: Vec::new(),
                span: (0, 0),
                slot: 0,
            }],
        }
    }

    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind, span: (usize, usize)) -> NodeId {
        let id = NodeId(self.nodes.len());
        let slot = self.nodes[parent.0].children.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            span,
            slot,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn set_root_span(&mut self, span: (usize, usize)) {
        self.nodes[0].span = span;
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn span(&self, id: NodeId) -> (usize, usize) {
        self.nodes[id.0].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Siblings before `id`, in order.
    pub fn left_siblings(&self, id: NodeId) -> &[NodeId] {
        let node = &self.nodes[id.0];
        match node.parent {
            Some(p) => &self.nodes[p.0].children[..node.slot],
            None => &[],
        }
    }

    /// Siblings after `id`, in order.
    pub fn right_siblings(&self, id: NodeId) -> &[NodeId] {
        let node = &self.nodes[id.0];
        match node.parent {
            Some(p) => &self.nodes[p.0].children[node.slot + 1..],
            None => &[],
        }
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Nearest enclosing Repeated node.
    pub fn enclosing_repeated(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| matches!(self.kind(a), NodeKind::Repeated { .. }))
    }

    /// Whether an Optional sits between `id` and its ancestor `outer` (both exclusive).
    pub fn optional_between(&self, id: NodeId, outer: NodeId) -> bool {
        self.ancestors(id)
            .take_while(|&a| a != outer)
            .any(|a| matches!(self.kind(a), NodeKind::Optional))
    }

    /// All nodes below `id` in walk order (pre-order, `id` excluded).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Every node in walk order, root first.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = vec![self.root()];
        out.extend(self.descendants(self.root()));
        out
    }

    /// Names of the fields bound below `id`, without duplicates.
    pub fn field_names(&self, id: NodeId) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for n in self.descendants(id) {
            if let NodeKind::Field { name, .. } = self.kind(n) {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fields whose sequence values drive the Repeated node `id`.
    ///
    /// A field counts when `id` is its nearest Repeated ancestor and no Optional
    /// sits between the two.
    pub fn driving_fields(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| matches!(self.kind(n), NodeKind::Field { .. }))
            .filter(|&n| self.enclosing_repeated(n) == Some(id))
            .filter(|&n| !self.optional_between(n, id))
            .collect()
    }

    /// Checksum scopes declared with `reference`.
    pub fn checksum_scopes<'a>(&'a self, reference: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes.iter().enumerate().filter_map(move |(i, n)| match &n.kind {
            NodeKind::ChecksumScope { reference: r } if r == reference => Some(NodeId(i)),
            _ => None,
        })
    }

    /// All checksum placeholders.
    pub fn checksum_placeholders(&self) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::ChecksumPlaceholder { reference } => Some((NodeId(i), reference.as_str())),
            _ => None,
        })
    }
}
