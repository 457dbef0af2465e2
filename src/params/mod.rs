pub mod ops;
pub mod storage;
pub mod store;
pub mod tree;

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Identity of a parameter: its short name as shown by the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamId(pub &'static str);

impl Borrow<str> for ParamId {
    fn borrow(&self) -> &str {
        self.0
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Runtime value of a leaf. The variant always matches the leaf's kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Unsigned(u32),
    Float(f32),
    /// Index into a selection leaf's option list.
    Index(u32),
}

impl Value {
    /// Raw little-endian image as stored in the record.
    pub fn to_le_bytes(self) -> [u8; 4] {
        match self {
            Value::Unsigned(v) | Value::Index(v) => v.to_le_bytes(),
            Value::Float(v) => v.to_le_bytes(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) | Value::Index(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.5}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafKind {
    Unsigned {
        default: u32,
    },
    Float {
        default: f32,
    },
    Selection {
        options: &'static [&'static str],
        default: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Mirrored into the stored record; edits mark the session dirty.
    Persisted,
    /// Live only. Edits are lost on restart.
    Volatile,
}

/// One editable parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf {
    pub caption: &'static str,
    pub name: ParamId,
    pub kind: LeafKind,
    pub persistence: Persistence,
}

impl Leaf {
    pub fn is_persisted(&self) -> bool {
        self.persistence == Persistence::Persisted
    }

    pub fn default_value(&self) -> Value {
        match self.kind {
            LeafKind::Unsigned { default } => Value::Unsigned(default),
            LeafKind::Float { default } => Value::Float(default),
            LeafKind::Selection { default, .. } => Value::Index(default),
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self.kind {
            LeafKind::Selection { options, .. } => options,
            LeafKind::Unsigned { .. } | LeafKind::Float { .. } => &[],
        }
    }

    /// Label of the selected option, for selection leaves holding an index.
    pub fn label(&self, value: Value) -> Option<&'static str> {
        match value {
            Value::Index(i) => self.options().get(i as usize).copied(),
            Value::Unsigned(_) | Value::Float(_) => None,
        }
    }

    /// Interpret four stored bytes according to this leaf's kind.
    pub fn decode(&self, raw: [u8; 4]) -> Value {
        match self.kind {
            LeafKind::Unsigned { .. } => Value::Unsigned(u32::from_le_bytes(raw)),
            LeafKind::Float { .. } => Value::Float(f32::from_le_bytes(raw)),
            LeafKind::Selection { .. } => Value::Index(u32::from_le_bytes(raw)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    Reset,
    List,
    Exit,
}

/// A titled sequence of sibling nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Menu {
    pub caption: &'static str,
    pub nodes: &'static [Node],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Submenu(Menu),
    Action {
        caption: &'static str,
        action: Action,
    },
}

impl Node {
    pub const fn unsigned(caption: &'static str, name: &'static str, default: u32) -> Self {
        Self::leaf(caption, name, LeafKind::Unsigned { default })
    }

    pub const fn float(caption: &'static str, name: &'static str, default: f32) -> Self {
        Self::leaf(caption, name, LeafKind::Float { default })
    }

    pub const fn selection(
        caption: &'static str,
        name: &'static str,
        options: &'static [&'static str],
        default: u32,
    ) -> Self {
        Self::leaf(caption, name, LeafKind::Selection { options, default })
    }

    pub const fn submenu(caption: &'static str, nodes: &'static [Node]) -> Self {
        Node::Submenu(Menu { caption, nodes })
    }

    pub const fn action(caption: &'static str, action: Action) -> Self {
        Node::Action { caption, action }
    }

    /// Keep a leaf out of the stored record. No effect on other nodes.
    pub const fn volatile(self) -> Self {
        match self {
            Node::Leaf(mut leaf) => {
                leaf.persistence = Persistence::Volatile;
                Node::Leaf(leaf)
            }
            other => other,
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            Node::Leaf(leaf) => leaf.caption,
            Node::Submenu(menu) => menu.caption,
            Node::Action { caption, .. } => caption,
        }
    }

    const fn leaf(caption: &'static str, name: &'static str, kind: LeafKind) -> Self {
        Node::Leaf(Leaf {
            caption,
            name: ParamId(name),
            kind,
            persistence: Persistence::Persisted,
        })
    }
}

/// Check the structural rules a tree must follow before a session uses it:
/// unique parameter names, non-empty option lists and in-range selection
/// defaults.
pub fn validate_tree(nodes: &[Node]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for leaf in ops::leaves(nodes) {
        if !seen.insert(leaf.name) {
            anyhow::bail!("duplicate parameter name '{}'", leaf.name);
        }
        if let LeafKind::Selection { options, default } = leaf.kind {
            if options.is_empty() {
                anyhow::bail!("selection '{}' has no options", leaf.name);
            }
            if default as usize >= options.len() {
                anyhow::bail!(
                    "selection '{}' defaults to option {default} of {}",
                    leaf.name,
                    options.len()
                );
            }
        }
    }
    Ok(())
}

/// Live value cells, keyed by parameter identity.
///
/// Implemented by whatever owns the values the control loop consumes. The
/// menu only ever borrows it for the duration of a configuration session.
pub trait Cells {
    fn get(&self, id: ParamId) -> Option<Value>;
    fn set(&mut self, id: ParamId, value: Value);
}

/// Map-backed working view of the live values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Working {
    cells: BTreeMap<ParamId, Value>,
}

impl Working {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Typed reads for the control loop.
#[allow(dead_code)]
impl Working {
    pub fn unsigned(&self, name: &str) -> Option<u32> {
        match self.cells.get(name)? {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.cells.get(name)? {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn index(&self, name: &str) -> Option<u32> {
        match self.cells.get(name)? {
            Value::Index(v) => Some(*v),
            _ => None,
        }
    }
}

impl Cells for Working {
    fn get(&self, id: ParamId) -> Option<Value> {
        self.cells.get(&id).copied()
    }

    fn set(&mut self, id: ParamId, value: Value) {
        self.cells.insert(id, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS: &[&str] = &["red", "green", "blue"];

    #[test]
    fn volatile_only_touches_leaves() {
        let Node::Leaf(leaf) = Node::unsigned("Rate", "rate", 5).volatile() else {
            panic!("expected a leaf");
        };
        assert_eq!(leaf.persistence, Persistence::Volatile);

        let action = Node::action("Save", Action::Save);
        assert_eq!(action.volatile(), action);
    }

    #[test]
    fn leaf_decodes_by_kind() {
        let Node::Leaf(float) = Node::float("Gain", "gain", 0.0) else {
            panic!("expected a leaf");
        };
        assert_eq!(float.decode(1.5f32.to_le_bytes()), Value::Float(1.5));

        let Node::Leaf(sel) = Node::selection("Color", "color", COLORS, 0) else {
            panic!("expected a leaf");
        };
        assert_eq!(sel.decode(2u32.to_le_bytes()), Value::Index(2));
        assert_eq!(sel.label(Value::Index(2)), Some("blue"));
        assert_eq!(sel.label(Value::Index(3)), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        const INNER: &[Node] = &[Node::float("Gain", "gain", 1.0)];
        const ROOT: &[Node] = &[
            Node::float("Gain", "gain", 1.0),
            Node::submenu("Inner", INNER),
        ];
        assert!(validate_tree(ROOT).is_err());
    }

    #[test]
    fn selection_default_out_of_range_is_rejected() {
        const ROOT: &[Node] = &[Node::selection("Color", "color", COLORS, 3)];
        assert!(validate_tree(ROOT).is_err());

        const EMPTY: &[Node] = &[Node::selection("Nothing", "nothing", &[], 0)];
        assert!(validate_tree(EMPTY).is_err());
    }

    #[test]
    fn working_accessors_check_the_tag() {
        let mut working = Working::new();
        working.set(ParamId("gain"), Value::Float(0.25));
        working.set(ParamId("rate"), Value::Unsigned(400));

        assert_eq!(working.float("gain"), Some(0.25));
        assert_eq!(working.unsigned("gain"), None);
        assert_eq!(working.unsigned("rate"), Some(400));
        assert_eq!(working.index("missing"), None);
        assert_eq!(working.len(), 2);
    }
}
