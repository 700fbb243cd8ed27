/*
    Derivation trees reported by the recognizers
*/

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::grammar::EPSILON;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Child {
    // Expansion of a nonterminal
    Node(DerivationTree),
    // A consumed token (or ε under an epsilon production)
    Leaf(String),
}

/// A nonterminal together with the ordered symbols it was rewritten into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationTree {
    pub symbol: String,
    pub children: Vec<Child>,
}

impl DerivationTree {
    pub fn new(symbol: impl Into<String>, children: Vec<Child>) -> Self {
        DerivationTree {
            symbol: symbol.into(),
            children,
        }
    }

    /// `symbol → token`
    pub fn terminal(symbol: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(symbol, vec![Child::Leaf(token.into())])
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Tokens at the fringe of the tree, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        let mut pending: Vec<&Child> = self.children.iter().rev().collect();
        while let Some(child) = pending.pop() {
            match child {
                Child::Node(node) => pending.extend(node.children.iter().rev()),
                Child::Leaf(token) if token == EPSILON => {}
                Child::Leaf(token) => leaves.push(token.as_str()),
            }
        }
        leaves
    }

    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut pending = vec![(self, 1)];
        while let Some((node, level)) = pending.pop() {
            for child in &node.children {
                match child {
                    Child::Node(inner) => pending.push((inner, level + 1)),
                    Child::Leaf(_) => {}
                }
                depth = depth.max(level + 1);
            }
        }
        depth
    }

    /// One symbol per line, indented one space per level.
    pub fn to_text(&self) -> String {
        let mut result = format!("{}\n", self.symbol);
        let mut pending: Vec<(usize, &Child)> = self.children.iter().rev().map(|c| (1, c)).collect();
        while let Some((indent, child)) = pending.pop() {
            let pad = " ".repeat(indent);
            match child {
                Child::Leaf(token) => result.push_str(&format!("{}{}\n", pad, token)),
                Child::Node(node) => {
                    result.push_str(&format!("{}{}\n", pad, node.symbol));
                    pending.extend(node.children.iter().rev().map(|c| (indent + 1, c)));
                }
            }
        }
        result
    }

    /// Box-drawing rendering, quoted leaves.
    pub fn to_boxed(&self) -> String {
        let mut result = format!("{}\n", self.symbol);
        let mut pending = branches(&self.children, "");
        while let Some((prefix, child, is_last)) = pending.pop() {
            let connector = if is_last { "└── " } else { "├── " };
            match child {
                Child::Leaf(token) => result.push_str(&format!("{}{}\"{}\"\n", prefix, connector, token)),
                Child::Node(node) => {
                    result.push_str(&format!("{}{}{}\n", prefix, connector, node.symbol));
                    let nested = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
                    pending.extend(branches(&node.children, &nested));
                }
            }
        }
        result
    }
}

// Children with their prefix and last-sibling flag, reversed for popping
fn branches<'t>(children: &'t [Child], prefix: &str) -> Vec<(String, &'t Child, bool)> {
    let last = children.len().saturating_sub(1);
    children
        .iter()
        .enumerate()
        .rev()
        .map(|(i, child)| (prefix.to_string(), child, i == last))
        .collect()
}

// Linear derivations nest one node per token; dropped iteratively so long
// inputs do not exhaust the stack
impl Drop for DerivationTree {
    fn drop(&mut self) {
        let mut pending: Vec<DerivationTree> = Vec::new();
        let mut children = std::mem::take(&mut self.children);
        loop {
            pending.extend(children.drain(..).filter_map(|child| match child {
                Child::Node(node) => Some(node),
                Child::Leaf(_) => None,
            }));
            match pending.pop() {
                Some(mut node) => children = std::mem::take(&mut node.children),
                None => break,
            }
        }
    }
}

impl Display for DerivationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DerivationTree {
        DerivationTree::new(
            "S",
            vec![
                Child::Node(DerivationTree::terminal("A", "a")),
                Child::Node(DerivationTree::new(
                    "B",
                    vec![Child::Leaf("b".to_string()), Child::Node(DerivationTree::terminal("C", EPSILON))],
                )),
            ],
        )
    }

    #[test]
    fn leaf_detection() {
        assert!(DerivationTree::new("a", vec![]).is_leaf());
        assert!(!sample().is_leaf());
    }

    #[test]
    fn leaves_skip_epsilon() {
        assert_eq!(sample().leaves(), vec!["a", "b"]);
        assert_eq!(sample().depth(), 4);
    }

    #[test]
    fn indented_text() {
        assert_eq!(sample().to_text(), "S\n A\n  a\n B\n  b\n  C\n   ε\n");
    }

    #[test]
    fn boxed_text() {
        let expected = "\
S
├── A
│   └── \"a\"
└── B
    ├── \"b\"
    └── C
        └── \"ε\"
";
        assert_eq!(sample().to_boxed(), expected);
    }

    #[test]
    fn deep_trees_are_walked_without_recursion() {
        let mut tree = DerivationTree::terminal("S", "a");
        for _ in 0..200_000 {
            tree = DerivationTree::new("S", vec![Child::Leaf("a".to_string()), Child::Node(tree)]);
        }
        assert_eq!(tree.leaves().len(), 200_001);
        assert_eq!(tree.depth(), 200_002);
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_string(&DerivationTree::terminal("A", "a")).unwrap();
        assert_eq!(json, r#"{"symbol":"A","children":[{"leaf":"a"}]}"#);
    }
}
