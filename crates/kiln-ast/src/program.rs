//! Program arena: statements live in `nodes`, `body` orders them

use std::ops::Range;

use super::*;

/// Index of a statement in the program arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Root AST node - represents a complete source file.
///
/// Replaced statements stay in the arena; only `body` decides what is printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    nodes: Vec<Stmt>,
    body: Vec<NodeId>,
    pub span: Span,
}

impl Program {
    pub fn new(span: Span) -> Self {
        Self {
            nodes: Vec::new(),
            body: Vec::new(),
            span,
        }
    }

    fn alloc(&mut self, stmt: Stmt) -> NodeId {
        self.nodes.push(stmt);
        NodeId(self.nodes.len() - 1)
    }

    /// Appends a statement at the end of the body.
    pub fn push(&mut self, stmt: Stmt) -> NodeId {
        let id = self.alloc(stmt);
        self.body.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Statement at body position `index`.
    pub fn get(&self, index: usize) -> Option<&Stmt> {
        self.body.get(index).map(|id| &self.nodes[id.0])
    }

    pub fn node(&self, id: NodeId) -> &Stmt {
        &self.nodes[id.0]
    }

    /// Replaces the statement at body position `index`.
    pub fn replace(&mut self, index: usize, stmt: Stmt) -> NodeId {
        let id = self.alloc(stmt);
        self.body[index] = id;
        id
    }

    /// Inserts `stmts` starting at body position `index`.
    ///
    /// Returns the body range the new statements occupy.
    pub fn splice(&mut self, index: usize, stmts: Vec<Stmt>) -> Range<usize> {
        let ids: Vec<NodeId> = stmts.into_iter().map(|stmt| self.alloc(stmt)).collect();
        let count = ids.len();
        self.body.splice(index..index, ids);
        index..index + count
    }

    /// Replaces the statement at body position `index` with `stmts` (possibly none).
    ///
    /// Returns the body range the new statements occupy.
    pub fn replace_with(&mut self, index: usize, stmts: Vec<Stmt>) -> Range<usize> {
        let ids: Vec<NodeId> = stmts.into_iter().map(|stmt| self.alloc(stmt)).collect();
        let count = ids.len();
        self.body.splice(index..=index, ids);
        index..index + count
    }

    /// Inserts a single statement at body position `index`.
    pub fn insert(&mut self, index: usize, stmt: Stmt) -> Range<usize> {
        self.splice(index, vec![stmt])
    }

    /// Statements in body order.
    pub fn iter(&self) -> impl Iterator<Item = &Stmt> + '_ {
        self.body.iter().map(move |id| &self.nodes[id.0])
    }

    /// Inserts `text` before source byte `offset` in whichever statement
    /// still carries that byte. Returns false if no statement does.
    pub fn insert_text_at(&mut self, offset: usize, text: &str) -> bool {
        for id in &self.body {
            if let Some(fragment) = self.nodes[id.0].fragment_mut() {
                if fragment.insert_at(offset, text) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_returns_range() {
        let mut program = Program::new(Span::new(0, 0));
        program.push(Stmt::ModuleMarker);
        program.push(Stmt::ExportAllKeys { binding: "b".into() });

        let range = program.splice(
            1,
            vec![
                Stmt::Require { binding: None, source: "x".into() },
                Stmt::Require { binding: None, source: "y".into() },
            ],
        );

        assert_eq!(range, 1..3);
        assert_eq!(program.len(), 4);
        assert!(matches!(program.get(3), Some(Stmt::ExportAllKeys { .. })));
    }

    #[test]
    fn test_replace_detaches_old_node() {
        let mut program = Program::new(Span::new(0, 0));
        let old = program.push(Stmt::ModuleMarker);
        let new = program.replace(0, Stmt::Require { binding: None, source: "a".into() });

        assert_ne!(old, new);
        assert_eq!(program.len(), 1);
        assert_eq!(program.node(old), &Stmt::ModuleMarker);
        assert!(matches!(program.get(0), Some(Stmt::Require { .. })));
    }

    #[test]
    fn test_replace_with_many_and_none() {
        let mut program = Program::new(Span::new(0, 0));
        program.push(Stmt::ModuleMarker);
        program.push(Stmt::ModuleMarker);

        let range = program.replace_with(
            0,
            vec![
                Stmt::ExportAllKeys { binding: "a".into() },
                Stmt::ExportAllKeys { binding: "b".into() },
            ],
        );
        assert_eq!(range, 0..2);
        assert_eq!(program.len(), 3);

        let range = program.replace_with(2, Vec::new());
        assert!(range.is_empty());
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_insert_text_at_finds_owner() {
        let mut program = Program::new(Span::new(0, 20));
        program.push(Stmt::Verbatim(Fragment::from_span(Span::new(0, 10))));
        program.push(Stmt::Declaration {
            kind: DeclKind::Function,
            text: Fragment::from_span(Span::new(10, 20)),
        });

        assert!(program.insert_text_at(12, "x"));
        assert!(!program.insert_text_at(25, "x"));
        match program.get(1) {
            Some(Stmt::Declaration { text, .. }) => assert_eq!(text.pieces.len(), 3),
            other => panic!("unexpected statement: {:?}", other),
        }
    }
}
