//! Clipboard integration.

use crate::error::Result;
use crate::explorer::Node;
use arboard::Clipboard;

/// Copy text to clipboard.
pub fn copy_text(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text)?;
    Ok(())
}

/// Copy tree structure to clipboard.
pub fn copy_tree_structure(node: &Node, file_name: Option<&str>) -> Result<()> {
    copy_text(&tree_text(node, file_name))
}

/// Copy node information to clipboard.
pub fn copy_node_info(node: &Node) -> Result<()> {
    copy_text(&node_info_text(node))
}

/// Box-drawing text of a node tree, headed by the file name.
pub fn tree_text(node: &Node, file_name: Option<&str>) -> String {
    let mut text = String::new();

    if let Some(name) = file_name {
        text.push_str(&format!("Tree Structure: {}\n", name));
    } else {
        text.push_str("Tree Structure\n");
    }

    text.push_str(&"=".repeat(80));
    text.push_str("\n\n");

    format_tree_recursive(node, "", true, &mut text);
    text
}

/// Plain-text summary of one node.
pub fn node_info_text(node: &Node) -> String {
    let mut text = format!("Node: {}\n", node.label);
    text.push_str(&format!("Path: {}\n", node.path));
    text.push_str(&format!("Kind: {}\n", node.kind));
    text.push_str(&format!("Type: {}\n", node.type_name));

    if !node.size.is_empty() {
        text.push_str(&format!("Size: {}\n", node.size));
    }
    if !node.description.is_empty() {
        text.push_str(&format!("Description: {}\n", node.description));
    }
    if let Some(ref error) = node.error {
        text.push_str(&format!("Error: {}\n", error));
    }
    text
}

fn format_tree_recursive(node: &Node, prefix: &str, is_last: bool, out: &mut String) {
    let connector = if is_last { "└── " } else { "├── " };
    let mut line = node.display_name();
    if !node.description.is_empty() {
        line.push_str("  ");
        line.push_str(&node.description);
    }
    out.push_str(&format!("{}{}{}\n", prefix, connector, line));

    let new_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "│" });

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        format_tree_recursive(child, &new_prefix, is_last_child, out);
    }
}
