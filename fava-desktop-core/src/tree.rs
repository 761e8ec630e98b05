/// A node in a widget-like tree that can enumerate its direct children.
pub trait TreeNode: Sized {
    fn children(&self) -> Vec<Self>;
}

/// Return the first node satisfying `predicate` in a pre-order walk that
/// starts at (and includes) `root`.
pub fn find_first<N, P>(root: &N, predicate: P) -> Option<N>
where
    N: TreeNode + Clone,
    P: Fn(&N) -> bool,
{
    find_first_ref(root, &predicate)
}

fn find_first_ref<N, P>(node: &N, predicate: &P) -> Option<N>
where
    N: TreeNode + Clone,
    P: Fn(&N) -> bool,
{
    if predicate(node) {
        return Some(node.clone());
    }
    for child in node.children() {
        if let Some(found) = find_first_ref(&child, predicate) {
            return Some(found);
        }
    }
    None
}
