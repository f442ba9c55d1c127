//! Path assignment and store binding over a node tree.
//!
//! [`apply`] walks a subtree once, giving every node its absolute path and
//! propagating the store binding. Applying the same rule twice yields the
//! same paths. [`clone_node`] copies a subtree and re-applies it with the
//! clone's own path pinned to a concrete address.

use tracing::debug;

use crate::config::Binding;
use crate::error::Result;
use crate::node::Node;
use crate::path::{PathTemplate, SEPARATOR};

/// How [`apply`] assigns the path of the node it is called on.
///
/// Descendants always derive their path from their parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRule<'a> {
    /// Leave paths as they are; only propagate the binding.
    Keep,
    /// Derive the path from the parent's path (`None` or empty for the root).
    FromParent(Option<&'a str>),
    /// Use this exact path.
    Forced(&'a str),
}

/// Compute a node's path from its parent's.
fn child_path(parent_path: Option<&str>, key: &str) -> String {
    match parent_path {
        None | Some("") => key.to_string(),
        Some("/") => format!("{SEPARATOR}{key}"),
        Some(parent) => format!("{parent}{SEPARATOR}{key}"),
    }
}

/// Assign paths below `node` and bind the store.
///
/// The store is rebound only if `binding` carries one; blocking is only ever
/// switched on.
pub fn apply(node: &mut Node, rule: PathRule<'_>, binding: &Binding) {
    match rule {
        PathRule::Keep => {}
        PathRule::FromParent(parent) => node.path = PathTemplate::new(&child_path(parent, &node.key)),
        PathRule::Forced(path) => node.path = PathTemplate::new(path),
    }

    if let Some(store) = &binding.store {
        node.store = Some(store.clone());
    }
    if binding.store_blocked {
        node.store_blocked = true;
    }

    let parent = node.path.as_str().to_string();
    let child_rule = match rule {
        PathRule::Keep => PathRule::Keep,
        _ => PathRule::FromParent(Some(&parent)),
    };
    for child in node.children.nodes_mut() {
        apply(child, child_rule, binding);
    }
}

/// Copy `node` and pin the copy at `node`'s path resolved with `vars`.
///
/// The copy's descendants get paths relative to the pinned path; variable
/// nodes below the copy keep their `$`. With no `vars` the paths are kept
/// and only the binding is applied; so are they when `node`'s path has no
/// `$` left to pin.
pub fn clone_node(node: &Node, vars: &[&str], binding: &Binding) -> Result<Node> {
    let mut copy = node.clone();

    if vars.is_empty() || node.path.is_concrete() {
        apply(&mut copy, PathRule::Keep, binding);
    } else {
        let pinned = node.path_with_vars(vars)?;
        debug!(
            template = node.path(),
            path = %pinned,
            placeholders = node.path.placeholder_count(),
            "pinning clone"
        );
        apply(&mut copy, PathRule::Forced(&pinned), binding);
    }

    Ok(copy)
}
