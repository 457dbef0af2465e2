use lineedit::{Entry, LineEditor};

use crate::params::storage::Storage;
use crate::params::store::{Record, Store};
use crate::params::{Action, Cells, Leaf, LeafKind, Menu, Node, Value, ops, validate_tree};
use crate::term::Terminal;

/// One configuration session: the menu tree, the committed record, a borrow
/// of the live cells and the dirty flag.
pub struct Session<'a, S: Storage, C: Cells> {
    root: Menu,
    store: Store<S>,
    /// Record as last loaded or saved, restored when changes are discarded.
    saved: Record,
    cells: &'a mut C,
    dirty: bool,
}

impl<'a, S: Storage, C: Cells> Session<'a, S, C> {
    /// Load the stored record, falling back to defaults (and writing them)
    /// when it is missing or corrupt, then bring the live cells in line.
    pub fn start(root: Menu, store: Store<S>, cells: &'a mut C) -> anyhow::Result<Self> {
        Self::open(root, store, cells, true)
    }

    /// Like [`Session::start`], but a missing or corrupt record is replaced
    /// by defaults in memory only. Storage is never written.
    pub fn preview(root: Menu, store: Store<S>, cells: &'a mut C) -> anyhow::Result<Self> {
        Self::open(root, store, cells, false)
    }

    fn open(root: Menu, mut store: Store<S>, cells: &'a mut C, heal: bool) -> anyhow::Result<Self> {
        validate_tree(root.nodes)?;

        if !store.load()? {
            ops::reset_to_defaults(root.nodes, store.record_mut(), cells);
            if heal {
                log::warn!("No usable configuration stored, writing defaults");
                store.save()?;
            } else {
                log::warn!("No usable configuration stored, showing defaults");
            }
        }
        ops::copy_persisted_to_live(root.nodes, store.record(), cells);
        ops::seed_volatile(root.nodes, cells);

        Ok(Self {
            root,
            saved: store.record().clone(),
            store,
            cells,
            dirty: false,
        })
    }

    #[allow(dead_code)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    #[allow(dead_code)]
    pub fn into_store(self) -> Store<S> {
        self.store
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        self.store.save()?;
        self.saved = self.store.record().clone();
        self.dirty = false;
        Ok(())
    }

    /// Drop unsaved edits: the record and the persisted live values go back
    /// to what was last loaded or saved.
    pub fn discard(&mut self) {
        *self.store.record_mut() = self.saved.clone();
        ops::copy_persisted_to_live(self.root.nodes, &self.saved, self.cells);
        self.dirty = false;
    }

    pub fn reset(&mut self) {
        ops::reset_to_defaults(self.root.nodes, self.store.record_mut(), self.cells);
        self.dirty = true;
        log::info!("Parameters reset to defaults");
    }

    /// Every parameter with its live value, as printed by the List action.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        ops::list_all(self.root.nodes, self.root.caption, &*self.cells, &mut out).ok();
        out
    }

    /// Run the menu until Exit is chosen at the top level.
    pub fn run(&mut self, term: &mut impl Terminal) -> anyhow::Result<()> {
        let mut stack = vec![self.root];

        while let Some(&menu) = stack.last() {
            self.render(term, menu)?;
            term.write_str("> ")?;
            let choice = read_entry(term, LineEditor::unsigned())?;

            let node = match choice.as_unsigned() {
                Ok(Some(n)) => (n as usize)
                    .checked_sub(1)
                    .and_then(|i| menu.nodes.get(i)),
                _ => None,
            };
            let Some(node) = node else {
                if stack.len() > 1 {
                    stack.pop();
                }
                continue;
            };

            match *node {
                Node::Submenu(child) => stack.push(child),
                Node::Leaf(leaf) => self.edit(term, &leaf)?,
                Node::Action { action, .. } => match action {
                    Action::Save => {
                        if ask(term, "Save params to EEPROM?", true)? == Some(true) {
                            self.save()?;
                            term.write_str("Configuration saved to EEPROM.\n")?;
                        }
                    }
                    Action::Reset => {
                        if ask(term, "Reset all params to default values?", false)? == Some(true) {
                            self.reset();
                            term.write_str("Configuration reset to default values.\n")?;
                        }
                    }
                    Action::List => term.write_str(&self.listing())?,
                    Action::Exit => {
                        if self.confirm_exit(term)? {
                            stack.pop();
                        }
                    }
                },
            }
        }
        Ok(())
    }

    fn render(&self, term: &mut impl Terminal, menu: Menu) -> anyhow::Result<()> {
        let mut text = format!(
            "\n{}\n{}\n",
            menu.caption,
            "-".repeat(menu.caption.chars().count())
        );
        for (i, node) in menu.nodes.iter().enumerate() {
            text.push_str(&format!("{} - {}", i + 1, node.caption()));
            if let Node::Leaf(leaf) = node {
                text.push_str(&format!(" ({})", self.shown(leaf)));
            }
            text.push('\n');
        }
        term.write_str(&text)
    }

    /// Current live value as shown next to a caption.
    fn shown(&self, leaf: &Leaf) -> String {
        match self.cells.get(leaf.name) {
            Some(Value::Float(v)) => format!("{v:9.5}"),
            Some(value) => match leaf.label(value) {
                Some(label) => format!("{value}: {label}"),
                None => value.to_string(),
            },
            None => "?".to_string(),
        }
    }

    fn edit(&mut self, term: &mut impl Terminal, leaf: &Leaf) -> anyhow::Result<()> {
        match leaf.kind {
            LeafKind::Unsigned { .. } => {
                term.write_str(&format!("{} ({}): ", leaf.caption, self.shown(leaf)))?;
                match read_entry(term, LineEditor::unsigned())?.as_unsigned() {
                    Ok(Some(v)) => self.apply(leaf, Value::Unsigned(v)),
                    Ok(None) => {}
                    Err(_) => term.write_str("Value out of range.\n")?,
                }
            }
            LeafKind::Float { .. } => {
                term.write_str(&format!("{} ({}): ", leaf.caption, self.shown(leaf)))?;
                match read_entry(term, LineEditor::decimal())?.as_decimal() {
                    Ok(Some(v)) => self.apply(leaf, Value::Float(v)),
                    Ok(None) => {}
                    Err(_) => term.write_str("Not a number.\n")?,
                }
            }
            LeafKind::Selection { options, .. } => {
                let mut text = format!("\n{}\n", leaf.caption);
                for (i, label) in options.iter().enumerate() {
                    text.push_str(&format!("  {i} - {label}\n"));
                }
                let current = match self.cells.get(leaf.name) {
                    Some(value) => value.to_string(),
                    None => "?".to_string(),
                };
                text.push_str(&format!("{} ({current}): ", leaf.caption));
                term.write_str(&text)?;

                match read_entry(term, LineEditor::unsigned())?.as_unsigned() {
                    Ok(Some(i)) if (i as usize) < options.len() => {
                        self.apply(leaf, Value::Index(i));
                    }
                    Ok(None) => {}
                    _ => term.write_str("Invalid selection.\n")?,
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, leaf: &Leaf, value: Value) {
        self.cells.set(leaf.name, value);
        if leaf.is_persisted() {
            self.store.record_mut().set(leaf.name, value);
            self.dirty = true;
            log::debug!("{} = {value}", leaf.name);
        }
    }

    /// Offer to save pending changes before leaving a level. Returns `false`
    /// when the question was escaped, which keeps the menu open.
    fn confirm_exit(&mut self, term: &mut impl Terminal) -> anyhow::Result<bool> {
        if !self.dirty {
            return Ok(true);
        }
        match ask(term, "Params changed. Save them to EEPROM?", true)? {
            Some(true) => {
                self.save()?;
                term.write_str("Configuration saved to EEPROM.\n")?;
                Ok(true)
            }
            Some(false) => {
                log::info!("Discarding changed parameters");
                self.discard();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Feed terminal input to `editor` until it settles, echoing as it goes.
fn read_entry(term: &mut impl Terminal, mut editor: LineEditor) -> anyhow::Result<Entry> {
    let mut echo = String::new();
    loop {
        editor.feed(term.read_char()?, &mut echo);
        if !echo.is_empty() {
            term.write_str(&echo)?;
            echo.clear();
        }
        if let Some(entry) = editor.entry() {
            return Ok(entry);
        }
    }
}

/// Yes/no question. `None` when escaped.
fn ask(term: &mut impl Terminal, question: &str, default: bool) -> anyhow::Result<Option<bool>> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    term.write_str(&format!("{question} {hint} "))?;
    Ok(read_entry(term, LineEditor::yes_no())?.as_answer(default))
}
