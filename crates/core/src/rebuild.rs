//! Tree reconstruction from flat, depth-tagged thread items.
//!
//! Single left-to-right pass over an explicit stack of `(index, depth)` pairs.
//! Parent links are recorded as indices first and the tree is assembled
//! afterwards, so no block is ever aliased. `parent_id` is left to the
//! finalizer, which is the only place ids exist.

use crate::model::{ContentBlock, ThreadItem};

/// Nests `flat` by depth and returns the roots in source order.
///
/// Non-thread-item blocks are dropped. Each item becomes a child of the
/// nearest preceding item with a strictly smaller depth.
pub fn rebuild(flat: Vec<ContentBlock>) -> Vec<ContentBlock> {
    let items: Vec<ThreadItem> = flat
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::ThreadItem(item) => Some(item),
            _ => None,
        })
        .collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, u32)> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        while stack.last().is_some_and(|&(_, depth)| depth >= item.depth) {
            stack.pop();
        }

        match stack.last() {
            Some(&(owner, _)) => children_of[owner].push(index),
            None => roots.push(index),
        }
        stack.push((index, item.depth));
    }

    let mut slots: Vec<Option<ThreadItem>> = items.into_iter().map(Some).collect();
    roots.into_iter().filter_map(|index| assemble(index, &mut slots, &children_of)).collect()
}

fn assemble(index: usize, slots: &mut [Option<ThreadItem>], children_of: &[Vec<usize>]) -> Option<ContentBlock> {
    let mut item = slots.get_mut(index)?.take()?;
    for &child in &children_of[index] {
        if let Some(block) = assemble(child, slots, children_of) {
            item.children.push(block);
        }
    }
    Some(ContentBlock::ThreadItem(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(depth: u32, text: &str) -> ContentBlock {
        ThreadItem::new(depth, None, vec![ContentBlock::text(text)]).into()
    }

    fn body(block: &ContentBlock) -> &str {
        block.as_thread_item().and_then(|t| t.content[0].text_value()).unwrap_or_default()
    }

    fn children(block: &ContentBlock) -> &[ContentBlock] {
        &block.as_thread_item().unwrap().children
    }

    #[test]
    fn test_linear_chain() {
        let tree = rebuild(vec![item(0, "a"), item(1, "b"), item(2, "c"), item(3, "d")]);

        assert_eq!(tree.len(), 1);
        let b = &children(&tree[0])[0];
        let c = &children(b)[0];
        let d = &children(c)[0];
        assert_eq!(body(d), "d");
        assert!(children(d).is_empty());
    }

    #[test]
    fn test_siblings_and_new_roots() {
        let tree = rebuild(vec![item(0, "a"), item(1, "a1"), item(1, "a2"), item(0, "b"), item(2, "b-deep")]);

        assert_eq!(tree.len(), 2);
        assert_eq!(children(&tree[0]).len(), 2);
        assert_eq!(body(&children(&tree[0])[1]), "a2");
        assert_eq!(body(&children(&tree[1])[0]), "b-deep");
    }

    #[test]
    fn test_first_item_deeper_than_later_roots() {
        let tree = rebuild(vec![item(2, "orphan"), item(0, "root"), item(1, "reply")]);

        assert_eq!(tree.len(), 2);
        assert_eq!(body(&tree[0]), "orphan");
        assert_eq!(body(&children(&tree[1])[0]), "reply");
    }

    #[test]
    fn test_non_thread_blocks_dropped() {
        let tree = rebuild(vec![ContentBlock::text("stray"), item(0, "a")]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_empty() {
        assert!(rebuild(Vec::new()).is_empty());
    }
}
