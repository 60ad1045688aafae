use std::cmp::min;
use std::rc::Rc;

use bytes::Bytes;

use crate::children::Children;
use crate::prefix::{MAX_PREFIX_LEN, Prefix};

/// Shared handle on a node. Mutation goes through [`Rc::make_mut`], which
/// clones the node (retaining its children) unless the handle is the sole
/// owner.
pub(crate) type NodeRef<V> = Rc<Node<V>>;

/// Runtime tag of a node representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Leaf,
    Node4,
    Node16,
    Node48,
    Node256,
}

pub(crate) enum Node<V> {
    Leaf(Leaf<V>),
    Inner(Inner<V>),
}

impl<V: Clone> Clone for Node<V> {
    fn clone(&self) -> Self {
        match self {
            Node::Leaf(leaf) => Node::Leaf(leaf.clone()),
            Node::Inner(inner) => Node::Inner(inner.clone()),
        }
    }
}

impl<V> Node<V> {
    pub fn leaf(key: Bytes, value: V) -> NodeRef<V> {
        Rc::new(Node::Leaf(Leaf { key, value }))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Inner(inner) => inner.children.kind(),
        }
    }
}

/// A single key-value entry. The full key is stored, never truncated by the
/// depth at which the leaf sits.
pub(crate) struct Leaf<V> {
    pub key: Bytes,
    pub value: V,
}

impl<V: Clone> Clone for Leaf<V> {
    fn clone(&self) -> Self {
        Leaf {
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

impl<V> Leaf<V> {
    pub fn matches_key(&self, key: &[u8]) -> bool {
        self.key.as_ref() == key
    }
}

/// An internal node: compressed path prefix plus one of the four adaptive
/// child containers.
pub(crate) struct Inner<V> {
    pub prefix: Prefix,
    pub children: Children<V>,
}

impl<V: Clone> Clone for Inner<V> {
    fn clone(&self) -> Self {
        Inner {
            prefix: self.prefix.clone(),
            children: self.children.clone(),
        }
    }
}

impl<V> Inner<V> {
    /// The smallest leaf in this subtree. Serves as the authoritative source
    /// for prefix bytes past the stored [`MAX_PREFIX_LEN`].
    pub fn min_leaf(&self) -> &Leaf<V> {
        let mut children = &self.children;
        loop {
            let first = children.first_index().expect("inner node has children");
            match children.child_at(first).as_ref() {
                Node::Leaf(leaf) => return leaf,
                Node::Inner(inner) => children = &inner.children,
            }
        }
    }

    /// Exact position at which `key` diverges from this node's prefix,
    /// capped at the prefix length. Compares the stored bytes first and
    /// falls back to the minimum descendant leaf when the true prefix is
    /// longer than what is stored.
    pub fn prefix_mismatch(&self, key: &[u8], depth: usize) -> usize {
        let stored = self.prefix.stored();
        let rest = &key[depth..];
        let bound = min(stored.len(), rest.len());
        let mut idx = 0;
        while idx < bound && stored[idx] == rest[idx] {
            idx += 1;
        }
        if idx == stored.len() && self.prefix.len() > MAX_PREFIX_LEN {
            let leaf = self.min_leaf();
            idx += common_prefix_len(&leaf.key, key, depth + idx);
        }
        min(idx, self.prefix.len())
    }
}

/// Number of equal bytes in `a` and `b` starting at `depth`.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8], depth: usize) -> usize {
    a[depth..]
        .iter()
        .zip(&b[depth..])
        .take_while(|(x, y)| x == y)
        .count()
}
