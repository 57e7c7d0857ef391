//! Text rendering of a tour's question tree.
//!
//! Answered steps show their answer, the highlighted step gets an arrow,
//! pending steps show only their name. Rendering never touches the tree.

use crate::state::answer_text;
use crate::tree::{NodeId, StepTree};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const GAP: &str = "    ";
const ARROW: &str = "←———";

/// Shorten a step name for display.
fn display_name(name: &str) -> String {
    name.replace(" Step", "")
        .replace("Representation", "Rep.")
        .replace("Root", "Wizard Steps")
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

/// Each live node with its tree-drawing prefix, in pre-order.
fn prefixed_lines(tree: &StepTree) -> Vec<(NodeId, String)> {
    let mut out = Vec::new();
    // (node, prefix for its children)
    let mut stack: Vec<(NodeId, String, String)> =
        vec![(tree.root(), String::new(), String::new())];
    while let Some((id, own_prefix, child_indent)) = stack.pop() {
        out.push((id, own_prefix));
        let children = tree[id].children();
        for (pos, child) in children.iter().enumerate().rev() {
            let last = pos + 1 == children.len();
            let (branch, indent) = if last { (LAST_BRANCH, GAP) } else { (BRANCH, PIPE) };
            stack.push((
                *child,
                format!("{}{}", child_indent, branch),
                format!("{}{}", child_indent, indent),
            ));
        }
    }
    out
}

/// Render the tree as lines, without a frame.
pub fn render_lines(tree: &StepTree, highlight: Option<NodeId>) -> Vec<String> {
    let lines = prefixed_lines(tree);
    let labels: Vec<String> = lines
        .iter()
        .map(|(id, pre)| format!("{}{}", pre, display_name(tree[*id].name())))
        .collect();
    let width = 4 + labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    lines
        .iter()
        .zip(labels)
        .map(|((id, _), label)| {
            let node = &tree[*id];
            if highlight.is_none() {
                return label;
            }
            if highlight == Some(*id) {
                format!("{}{}", pad(&label, width), ARROW)
            } else if let Some(response) = node.response() {
                format!("{}{}", pad(&format!("{}:", label), width), answer_text(response))
            } else {
                label
            }
        })
        .collect()
}

/// Render the tree inside a box.
pub fn render_tree(tree: &StepTree, highlight: Option<NodeId>) -> String {
    let lines = render_lines(tree, highlight);
    let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    out.push_str(&format!("╭{}╮\n", "─".repeat(inner + 2)));
    for line in &lines {
        out.push_str(&format!("│ {} │\n", pad(line, inner)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(inner + 2)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Scope;
    use crate::step::{FnStep, RootStep};

    fn sample() -> (StepTree, NodeId, NodeId, NodeId) {
        let mut tree = StepTree::new(Box::new(RootStep));
        let root = tree.root();
        let email = tree.insert_front(root, Box::new(FnStep::new("Contact Email Step")), Scope::Root);
        let name = tree.insert_front(root, Box::new(FnStep::new("Name Step")), Scope::Root);
        let nested = tree.insert_front(name, Box::new(FnStep::new("Text Representation Step")), Scope::Root);
        (tree, name, nested, email)
    }

    #[test]
    fn draws_branches_like_a_file_tree() {
        let (tree, _, _, _) = sample();
        let lines = render_lines(&tree, None);
        assert_eq!(
            lines,
            [
                "Wizard Steps",
                "├── Name",
                "│   └── Text Rep.",
                "└── Contact Email",
            ]
        );
    }

    #[test]
    fn highlight_and_answers_are_marked() {
        let (mut tree, name, nested, _) = sample();
        tree[name].response = Some(serde_json::json!("myname"));
        let lines = render_lines(&tree, Some(nested));

        assert!(lines[1].starts_with("├── Name:"));
        assert!(lines[1].ends_with("myname"));
        assert!(lines[2].ends_with(ARROW));
        assert_eq!(lines[3], "└── Contact Email");
    }

    #[test]
    fn framed_output_has_equal_width_rows() {
        let (tree, name, _, _) = sample();
        let text = render_tree(&tree, Some(name));
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{}", text);
        assert!(text.contains("Name  "));
    }
}
