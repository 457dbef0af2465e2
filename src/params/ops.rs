use std::fmt::{self, Write};

use super::store::Record;
use super::{Cells, Leaf, Node, Value};

/// Every leaf of the tree, depth first in declaration order.
pub fn leaves(nodes: &[Node]) -> Vec<Leaf> {
    let mut out = Vec::new();
    collect(nodes, &mut out, &|_| true);
    out
}

/// The persisted leaves in record order.
pub fn persisted_leaves(nodes: &[Node]) -> Vec<Leaf> {
    let mut out = Vec::new();
    collect(nodes, &mut out, &Leaf::is_persisted);
    out
}

fn collect(nodes: &[Node], out: &mut Vec<Leaf>, keep: &dyn Fn(&Leaf) -> bool) {
    for node in nodes {
        match node {
            Node::Leaf(leaf) if keep(leaf) => out.push(*leaf),
            Node::Submenu(menu) => collect(menu.nodes, out, keep),
            Node::Leaf(_) | Node::Action { .. } => {}
        }
    }
}

#[allow(dead_code)]
pub fn find_leaf(nodes: &[Node], name: &str) -> Option<Leaf> {
    nodes.iter().find_map(|node| match node {
        Node::Leaf(leaf) if leaf.name.0 == name => Some(*leaf),
        Node::Submenu(menu) => find_leaf(menu.nodes, name),
        Node::Leaf(_) | Node::Action { .. } => None,
    })
}

/// Copy every persisted value from the record into its live cell.
///
/// Volatile leaves and actions are left alone.
pub fn copy_persisted_to_live(nodes: &[Node], record: &Record, cells: &mut impl Cells) {
    for node in nodes {
        match node {
            Node::Leaf(leaf) if leaf.is_persisted() => {
                if let Some(value) = record.get(leaf.name) {
                    cells.set(leaf.name, value);
                }
            }
            Node::Submenu(menu) => copy_persisted_to_live(menu.nodes, record, cells),
            Node::Leaf(_) | Node::Action { .. } => {}
        }
    }
}

/// Write compiled-in defaults into the record and mirror them live, so both
/// agree afterwards. Volatile leaves only get the live value.
pub fn reset_to_defaults(nodes: &[Node], record: &mut Record, cells: &mut impl Cells) {
    for node in nodes {
        match node {
            Node::Leaf(leaf) => {
                let value = leaf.default_value();
                if leaf.is_persisted() {
                    record.set(leaf.name, value);
                }
                cells.set(leaf.name, value);
            }
            Node::Submenu(menu) => reset_to_defaults(menu.nodes, record, cells),
            Node::Action { .. } => {}
        }
    }
}

/// Give volatile leaves their default live value if they have none yet.
pub fn seed_volatile(nodes: &[Node], cells: &mut impl Cells) {
    for leaf in leaves(nodes) {
        if !leaf.is_persisted() && cells.get(leaf.name).is_none() {
            cells.set(leaf.name, leaf.default_value());
        }
    }
}

/// One `name = value  // caption` line per leaf.
///
/// A menu's caption is printed as a heading when anything below it has
/// leaves, and again when its own leaves resume after a nested submenu.
/// Menus with no leaves anywhere below them print nothing.
pub fn list_all(
    nodes: &[Node],
    heading: &str,
    cells: &impl Cells,
    out: &mut impl Write,
) -> fmt::Result {
    if !has_leaves(nodes) {
        return Ok(());
    }
    write_heading(heading, out)?;
    let mut under_heading = true;
    for node in nodes {
        match node {
            Node::Leaf(leaf) => {
                if !under_heading {
                    write_heading(heading, out)?;
                    under_heading = true;
                }
                list_leaf(leaf, cells.get(leaf.name), out)?;
            }
            Node::Submenu(menu) if has_leaves(menu.nodes) => {
                list_all(menu.nodes, menu.caption, cells, out)?;
                under_heading = false;
            }
            Node::Submenu(_) | Node::Action { .. } => {}
        }
    }
    Ok(())
}

fn has_leaves(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Leaf(_) => true,
        Node::Submenu(menu) => has_leaves(menu.nodes),
        Node::Action { .. } => false,
    })
}

fn write_heading(title: &str, out: &mut impl Write) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

fn list_leaf(leaf: &Leaf, value: Option<Value>, out: &mut impl Write) -> fmt::Result {
    let Some(value) = value else {
        return writeln!(out, "{} = ?  // {}", leaf.name, leaf.caption);
    };
    write!(out, "{} = {value}  // {}", leaf.name, leaf.caption)?;
    if let Some(label) = leaf.label(value) {
        write!(out, " -> {label}")?;
    }
    writeln!(out)
}
