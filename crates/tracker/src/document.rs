//! Plain-text extraction from rich-text (ADF-style) document trees.

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Root of a rich-text document: a list of top-level block nodes.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Document {
    #[serde(default)]
    pub content: Option<Vec<Option<Node>>>,
}

/// A single node in the document tree.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Node {
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<Option<Node>>>,
}

impl Document {
    /// Flatten the document to plain text. Top-level blocks are joined by
    /// newlines.
    pub fn to_text(&self) -> String {
        children_text(&self.content).join("\n")
    }
}

impl Node {
    pub fn to_text(&self) -> String {
        if self.node_type == "text" {
            return self.text.clone().unwrap_or_default();
        }

        let separator = match self.node_type.as_str() {
            "bulletList" | "orderedList" => "\n",
            // paragraph, heading, listItem and unknown containers
            _ => "",
        };

        children_text(&self.content).join(separator)
    }
}

/// Text of each child; a null child contributes an empty string.
fn children_text(content: &Option<Vec<Option<Node>>>) -> Vec<String> {
    content
        .iter()
        .flatten()
        .map(|child| child.as_ref().map(Node::to_text).unwrap_or_default())
        .collect()
}

/// Extract plain text from an optional document; `None` yields `""`.
pub fn extract_text(document: Option<&Document>) -> String {
    document.map(Document::to_text).unwrap_or_default()
}

/// The shapes an issue description may arrive in, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Document(Document),
    Plain(String),
    Other(IgnoredAny),
}

impl Description {
    pub fn to_text(&self) -> String {
        match self {
            Description::Document(doc) => doc.to_text(),
            Description::Plain(text) => text.clone(),
            Description::Other(_) => String::new(),
        }
    }
}
