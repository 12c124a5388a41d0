//! Overview tree nodes and the lazy tree builder.

use crate::data::shape::text_size_estimate;
use crate::data::{brief_description, classify, size_descriptor, Path, ShapeKind, Value};
use crate::util::limits::TreeLimits;

/// One row of the overview tree.
///
/// Nodes own no data; `path` resolves back to the value against the root
/// they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Display label: the key, `[i]`, or the root name.
    pub label: String,
    /// Shape kind of the value.
    pub kind: ShapeKind,
    /// Value type name (`dict`, `ndarray`, `float`, ...).
    pub type_name: String,
    /// Size summary (`(3, 4)`, `length: 5`).
    pub size: String,
    /// Short description (dtype, preview, item count).
    pub description: String,
    /// Address of the value.
    pub path: Path,
    /// Built children.
    pub children: Vec<Node>,
    /// Inline error from describing this value.
    pub error: Option<String>,
    /// Set on the trailing "more items" placeholder: how many were left out.
    pub omitted: Option<usize>,
}

impl Node {
    fn describe(label: String, value: &Value, path: Path) -> Self {
        let mut errors = Vec::new();
        let size = size_descriptor(value).unwrap_or_else(|e| {
            errors.push(e.to_string());
            String::new()
        });
        let description = brief_description(value).unwrap_or_else(|e| {
            errors.push(e.to_string());
            String::new()
        });
        errors.dedup();

        Self {
            label,
            kind: classify(value),
            type_name: value.type_name().to_string(),
            size,
            description,
            path,
            children: Vec::new(),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            omitted: None,
        }
    }

    fn more_items(parent: &Path, omitted: usize) -> Self {
        Self {
            label: format!("…({} more items)", omitted),
            kind: ShapeKind::Scalar,
            type_name: String::new(),
            size: String::new(),
            description: String::new(),
            path: parent.clone(),
            children: Vec::new(),
            error: None,
            omitted: Some(omitted),
        }
    }

    /// Whether this is the trailing "more items" placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.omitted.is_some()
    }

    /// Whether the node has built children.
    pub fn is_expandable(&self) -> bool {
        !self.children.is_empty()
    }

    /// Label with the size summary, for tree rows.
    pub fn display_name(&self) -> String {
        if self.size.is_empty() {
            self.label.clone()
        } else {
            format!("{} {}", self.label, self.size)
        }
    }

    /// Copy of this node without its children.
    pub fn shallow(&self) -> Node {
        Node {
            label: self.label.clone(),
            kind: self.kind,
            type_name: self.type_name.clone(),
            size: self.size.clone(),
            description: self.description.clone(),
            path: self.path.clone(),
            children: Vec::new(),
            error: self.error.clone(),
            omitted: self.omitted,
        }
    }

    /// Depth-first walk, including this node.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Node>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }

    /// Find the node built for `path`.
    pub fn find(&self, path: &Path) -> Option<&Node> {
        if &self.path == path && !self.is_placeholder() {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Which width limit a tree is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthTier {
    /// Compact overview.
    Overview,
    /// Interactive table expansion.
    Table,
}

/// Builds depth- and width-bounded node trees.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    limits: TreeLimits,
}

impl TreeBuilder {
    /// Create a builder with the given limits.
    pub fn new(limits: TreeLimits) -> Self {
        Self { limits }
    }

    /// Limits in effect.
    pub fn limits(&self) -> &TreeLimits {
        &self.limits
    }

    /// Sequence width for a tier.
    pub fn width(&self, tier: WidthTier) -> usize {
        match tier {
            WidthTier::Overview => self.limits.overview_width,
            WidthTier::Table => self.limits.table_width,
        }
    }

    /// Build the tree for `value` using a tier's width.
    pub fn build(&self, value: &Value, tier: WidthTier) -> Node {
        self.build_with_width(value, self.width(tier))
    }

    /// Build the tree for `value` with an explicit sequence width.
    pub fn build_with_width(&self, value: &Value, width: usize) -> Node {
        let mut root = Node::describe("root".to_string(), value, Path::root());
        self.expand(&mut root, value, 0, width);
        root
    }

    /// Build a single node with no children.
    pub fn describe(&self, label: impl Into<String>, value: &Value, path: Path) -> Node {
        Node::describe(label.into(), value, path)
    }

    fn expand(&self, node: &mut Node, value: &Value, depth: usize, width: usize) {
        if depth >= self.limits.max_depth {
            return;
        }

        match value {
            Value::Map(map) => {
                for (key, child) in map.iter() {
                    let path = node.path.key(key.as_str());
                    node.children
                        .push(self.child(key.clone(), child, path, depth, width));
                }
            },
            Value::List(items) => {
                for (i, child) in items.iter().take(width).enumerate() {
                    let path = node.path.index(&[i]);
                    node.children
                        .push(self.child(format!("[{}]", i), child, path, depth, width));
                }
                if items.len() > width {
                    node.children
                        .push(Node::more_items(&node.path, items.len() - width));
                }
            },
            Value::Object(obj) => {
                for (name, child) in obj.fields() {
                    let path = node.path.key(name.as_str());
                    node.children
                        .push(self.child(name.clone(), child, path, depth, width));
                }
            },
            _ => {},
        }
    }

    fn child(&self, label: String, value: &Value, path: Path, depth: usize, width: usize) -> Node {
        let mut node = Node::describe(label, value, path);
        let walkable = node.kind.is_collection() || node.kind == ShapeKind::Opaque;
        if walkable
            && text_size_estimate(value, self.limits.size_threshold) < self.limits.size_threshold
        {
            self.expand(&mut node, value, depth + 1, width);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{resolve, Fields, NdArray, Object};

    fn ints(n: usize) -> Value {
        Value::list((0..n as i64).map(Value::Int).collect())
    }

    #[test]
    fn overview_width_truncates_long_sequences() {
        let builder = TreeBuilder::default();
        let root = builder.build(&ints(250), WidthTier::Overview);
        assert_eq!(root.children.len(), 11);
        let last = root.children.last().unwrap();
        assert_eq!(last.label, "…(240 more items)");
        assert_eq!(last.omitted, Some(240));
        assert!(!last.is_expandable());
    }

    #[test]
    fn table_width_truncates_independently() {
        let builder = TreeBuilder::default();
        let root = builder.build(&ints(250), WidthTier::Table);
        assert_eq!(root.children.len(), 101);
        assert_eq!(root.children[100].label, "…(150 more items)");
        assert_eq!(root.children[99].label, "[99]");
    }

    #[test]
    fn widths_are_configurable() {
        let builder = TreeBuilder::new(TreeLimits {
            overview_width: 3,
            ..TreeLimits::default()
        });
        let root = builder.build(&ints(5), WidthTier::Overview);
        assert_eq!(root.children.len(), 4);
        assert_eq!(root.children[3].label, "…(2 more items)");
    }

    #[test]
    fn depth_is_bounded() {
        let mut value = Value::Int(0);
        for _ in 0..10 {
            value = Value::map_from([("inner", value)]);
        }
        let root = TreeBuilder::default().build(&value, WidthTier::Overview);

        let mut depth = 0;
        let mut node = &root;
        while let Some(child) = node.children.first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, TreeLimits::default().max_depth);
    }

    #[test]
    fn large_children_are_not_expanded() {
        let big = Value::list(vec![Value::from("x".repeat(200)); 100]);
        let value = Value::map_from([("big", big), ("small", ints(2))]);
        let root = TreeBuilder::default().build(&value, WidthTier::Overview);
        assert!(root.children[0].children.is_empty());
        assert_eq!(root.children[1].children.len(), 2);
    }

    #[test]
    fn arrays_are_leaves_and_objects_show_fields() {
        let mut fields = Fields::new();
        fields.insert("weights".into(), Value::Array(NdArray::from_f64(&[2], vec![1.0, 2.0]).unwrap()));
        fields.insert("tags".into(), Value::list(vec![Value::from("a")]));
        let value = Value::map_from([("model", Value::Object(Object::new("Model", fields)))]);

        let root = TreeBuilder::default().build(&value, WidthTier::Overview);
        let model = &root.children[0];
        assert_eq!(model.kind, ShapeKind::Opaque);
        assert_eq!(model.children.len(), 2);
        assert!(model.children[0].children.is_empty());
        assert_eq!(model.children[1].children.len(), 1);
    }

    #[test]
    fn node_errors_stay_inline() {
        let value = Value::map_from([
            ("ok", Value::Int(1)),
            ("broken", Value::unavailable("char", "character data is not decoded")),
            ("after", Value::Int(2)),
        ]);
        let root = TreeBuilder::default().build(&value, WidthTier::Overview);
        assert_eq!(root.children.len(), 3);
        assert!(root.children[0].error.is_none());
        assert_eq!(
            root.children[1].error.as_deref(),
            Some("character data is not decoded")
        );
        assert!(root.children[2].error.is_none());
    }

    #[test]
    fn every_node_path_resolves_to_its_kind() {
        let mut config = Fields::new();
        config.insert("name".into(), Value::from("encoder"));
        config.insert("layers".into(), Value::list(vec![Value::Int(64), Value::Int(32)]));
        config.insert(
            "weights".into(),
            Value::Array(NdArray::from_f64(&[3], vec![0.5; 3]).unwrap()),
        );
        let nested = Value::map_from([
            ("grid", Value::Array(NdArray::from_f64(&[2, 2], vec![0.0; 4]).unwrap())),
            ("rows", Value::list(vec![Value::map_from([("id", Value::Int(1))]); 3])),
            ("odd key.name", Value::from("text")),
            ("config", Value::Object(Object::new("Config", config))),
        ]);
        let root = TreeBuilder::default().build(&nested, WidthTier::Table);

        let kinds: Vec<ShapeKind> = root.walk().iter().map(|node| node.kind).collect();
        assert!(kinds.contains(&ShapeKind::Opaque));
        let through_object = Path::root().key("config").key("layers").index(&[1]);
        assert!(root.find(&through_object).is_some());

        for node in root.walk() {
            if node.is_placeholder() {
                continue;
            }
            let resolved = resolve(&nested, &node.path, 64).unwrap();
            assert_eq!(classify(&resolved), node.kind, "path {}", node.path);
        }
    }

    #[test]
    fn find_by_path() {
        let value = Value::map_from([("a", ints(3))]);
        let root = TreeBuilder::default().build(&value, WidthTier::Overview);
        let path = Path::root().key("a").index(&[2]);
        assert_eq!(root.find(&path).unwrap().label, "[2]");
    }
}
