use gtk4::prelude::*;

use fava_desktop_core::tree::{self, TreeNode};

/// A GTK widget viewed as a node of the widget tree.
#[derive(Clone)]
pub struct WidgetNode(pub gtk4::Widget);

impl TreeNode for WidgetNode {
    fn children(&self) -> Vec<Self> {
        let mut children = Vec::new();
        let mut child = self.0.first_child();
        while let Some(c) = child {
            child = c.next_sibling();
            children.push(WidgetNode(c));
        }
        children
    }
}

/// First widget of type `W` among `root` and its descendants, in pre-order.
pub fn find_descendant<W>(root: &impl IsA<gtk4::Widget>) -> Option<W>
where
    W: IsA<gtk4::Widget>,
{
    let root = WidgetNode(root.upcast_ref::<gtk4::Widget>().clone());
    tree::find_first(&root, |node| node.0.is::<W>()).and_then(|node| node.0.downcast::<W>().ok())
}
