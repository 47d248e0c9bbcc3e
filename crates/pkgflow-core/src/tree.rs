//! Tree moves over an execution path: descend to the first leaf, and find
//! the next leaf in depth-first, left-to-right order.

use crate::action::ActionDef;
use crate::catalog::ActionPath;
use tracing::debug;

/// Append first steps until the tail is a leaf. Returns whether the path
/// changed.
pub fn descend_to_leaf(path: &mut ActionPath<'_>) -> bool {
    descend_to_leaf_with(path, |_| {})
}

/// Like [`descend_to_leaf`], calling `on_change` once with the new path if at
/// least one descent happened.
pub fn descend_to_leaf_with<'a>(
    path: &mut ActionPath<'a>,
    on_change: impl FnOnce(&[&'a ActionDef]),
) -> bool {
    let mut changed = false;
    while let Some(&tail) = path.last() {
        let Some(first) = tail.steps().first() else {
            break;
        };
        path.push(first);
        changed = true;
    }
    if changed {
        debug!(leaf = path_tail_name(path), "descended to leaf");
        on_change(path);
    }
    changed
}

/// Compute the leaf following the current tail, or `None` once the root's
/// whole tree has been visited.
pub fn next_leaf<'a>(path: &[&'a ActionDef]) -> Option<ActionPath<'a>> {
    let mut path: ActionPath<'a> = path.to_vec();
    loop {
        if path.len() <= 1 {
            return None;
        }
        let last = path[path.len() - 1];
        let parent = path[path.len() - 2];
        let siblings = parent.steps();
        let next = siblings
            .iter()
            .position(|s| std::ptr::eq(s, last))
            .and_then(|i| siblings.get(i + 1));

        match next {
            Some(sibling) => {
                let tail = path.len() - 1;
                path[tail] = sibling;
                descend_to_leaf(&mut path);
                return Some(path);
            }
            None => {
                path.pop();
            }
        }
    }
}

fn path_tail_name<'p>(path: &'p [&ActionDef]) -> &'p str {
    path.last().map(|a| a.name.as_str()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
