//! Depth-first search over parsed markup.
//!
//! The site's markup is loosely structured, so anchors are found by walking
//! the element tree rather than through CSS selectors. Traversal keeps its
//! own stack so that deeply nested pages cannot exhaust the thread stack.

use scraper::ElementRef;

use super::types::{AttrMatch, NodeSignature};

/// An element in a document tree that exposes its tag, attributes and
/// element children.
pub trait TreeNode: Copy {
    fn tag_name(&self) -> &str;

    fn attribute(&self, key: &str) -> Option<&str>;

    /// Element children in document order
    fn element_children(&self) -> Vec<Self>;
}

impl<'a> TreeNode for ElementRef<'a> {
    fn tag_name(&self) -> &str {
        self.value().name()
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.value().attr(key)
    }

    fn element_children(&self) -> Vec<Self> {
        self.children().filter_map(ElementRef::wrap).collect()
    }
}

/// First node in pre-order (document order) satisfying `pred`
pub fn find_first<N, F>(root: N, mut pred: F) -> Option<N>
where
    N: TreeNode,
    F: FnMut(&N) -> bool,
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pred(&node) {
            return Some(node);
        }
        stack.extend(node.element_children().into_iter().rev());
    }
    None
}

/// Every node satisfying `pred`, in document order
pub fn find_all<N, F>(root: N, mut pred: F) -> Vec<N>
where
    N: TreeNode,
    F: FnMut(&N) -> bool,
{
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pred(&node) {
            found.push(node);
        }
        stack.extend(node.element_children().into_iter().rev());
    }
    found
}

/// First node tagged `tag_name` whose `attribute_key` starts with `value_prefix`.
///
/// Returns `None` when nothing matches; that is a normal outcome (e.g. the
/// last page of results), not an error.
pub fn locate<N: TreeNode>(
    root: N,
    tag_name: &str,
    attribute_key: &str,
    value_prefix: &str,
) -> Option<N> {
    find_first(root, |node| {
        node.tag_name() == tag_name
            && node
                .attribute(attribute_key)
                .is_some_and(|value| value.starts_with(value_prefix))
    })
}

pub fn matches<N: TreeNode>(node: &N, signature: &NodeSignature) -> bool {
    node.tag_name() == signature.tag
        && node
            .attribute(&signature.attribute)
            .is_some_and(|value| signature.accepts(value))
}

pub fn locate_signature<N: TreeNode>(root: N, signature: &NodeSignature) -> Option<N> {
    match signature.mode {
        AttrMatch::Prefix => locate(root, &signature.tag, &signature.attribute, &signature.value),
        AttrMatch::Exact => find_first(root, |node| matches(node, signature)),
    }
}

pub fn find_all_signature<N: TreeNode>(root: N, signature: &NodeSignature) -> Vec<N> {
    find_all(root, |node| matches(node, signature))
}
