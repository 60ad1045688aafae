//! # CowArt
//!
//! A persistent Adaptive Radix Tree (ART) mapping byte-string keys to
//! arbitrary values, with copy-on-write structural sharing between clones.
//!
//! ## Features
//!
//! - **O(k) operations**: `get`, `insert` and `remove` run in O(k) time where
//!   k is the key length
//! - **Adaptive nodes**: inner nodes grow and shrink through four
//!   representations (4, 16, 48 and 256 children) to match their fan-out
//! - **Path compression**: chains of single-child nodes are collapsed into an
//!   8-byte stored prefix, with longer prefixes recovered lazily from leaves
//! - **O(1) clone**: cloning a tree copies one pointer; clones share
//!   structure and diverge copy-on-write as either side is mutated
//! - **Ordered iteration**: entries come out in ascending lexicographic key
//!   order, and the [`keys`] module encodes integers so that byte order
//!   matches numeric order
//!
//! ## Example
//!
//! ```rust
//! use cowart::CowArt;
//!
//! let mut tree = CowArt::new();
//! tree.insert(b"apple", 1);
//! tree.insert(b"banana", 2);
//! assert_eq!(tree.get(b"apple"), Some(&1));
//!
//! // Clones are O(1) and copy-on-write: mutations leave the clone intact.
//! let snapshot = tree.clone();
//! tree.remove(b"apple");
//! assert_eq!(tree.get(b"apple"), None);
//! assert_eq!(snapshot.get(b"apple"), Some(&1));
//! ```
//!
//! ## Key Requirements
//!
//! No stored key may be a strict prefix of another stored key; inserting
//! such a key panics. The fixed-width encodings in [`keys`] are prefix-free
//! by construction. Raw byte keys of mixed lengths must be framed by the
//! caller, for example with a terminator byte that never appears elsewhere.
//! Keys are limited to `u32::MAX` bytes.

mod children;
mod iter;
pub mod keys;
mod node;
mod prefix;

pub use crate::iter::Iter;

use std::fmt;
use std::rc::Rc;

use bytes::Bytes;

use crate::children::Children;
use crate::node::{Inner, Node, NodeKind, NodeRef, common_prefix_len};
use crate::prefix::{MAX_PREFIX_LEN, Prefix};

/// A persistent Adaptive Radix Tree from byte-string keys to values of type
/// `V`.
///
/// The tree is an ordered map: iteration yields entries in ascending
/// lexicographic order of their keys. Cloning a handle is O(1); the clones
/// share nodes and copy them on write, so mutating one handle never affects
/// the other.
///
/// Mutating operations require `V: Clone` because a node shared with another
/// handle has to be copied, value included, before it is written.
///
/// # Example
///
/// ```rust
/// use cowart::CowArt;
/// use cowart::keys::OrderedBytes;
///
/// let mut tree = CowArt::new();
/// for n in [3i32, -7, 0, 12] {
///     tree.insert(&n.encode(), n);
/// }
///
/// let ordered: Vec<i32> = tree.iter().map(|(_, &n)| n).collect();
/// assert_eq!(ordered, [-7, 0, 3, 12]);
/// ```
pub struct CowArt<V> {
    root: Option<NodeRef<V>>,
    len: usize,
}

impl<V> CowArt<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        CowArt { root: None, len: 0 }
    }

    /// Number of entries in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Retrieves the value stored under `key`.
    ///
    /// Runs in O(key length) with no allocation. Prefix bytes beyond the
    /// stored eight per node are skipped optimistically on the way down; the
    /// leaf's full key makes the authoritative comparison.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cowart::CowArt;
    ///
    /// let mut tree = CowArt::new();
    /// tree.insert(b"hello", 7u8);
    ///
    /// assert_eq!(tree.get(b"hello"), Some(&7));
    /// assert_eq!(tree.get(b"missing"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        let mut depth = 0;
        loop {
            match node {
                Node::Leaf(leaf) => return leaf.matches_key(key).then_some(&leaf.value),
                Node::Inner(inner) => {
                    if !inner.prefix.matches(key, depth) {
                        return None;
                    }
                    depth += inner.prefix.len();
                    node = inner.children.child(*key.get(depth)?)?.as_ref();
                    depth += 1;
                }
            }
        }
    }

    /// Returns `true` if `key` has a value in the tree.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// The entry with the lexicographically smallest key.
    pub fn first(&self) -> Option<(&[u8], &V)> {
        let mut node = self.root.as_deref()?;
        loop {
            match node {
                Node::Leaf(leaf) => return Some((leaf.key.as_ref(), &leaf.value)),
                Node::Inner(inner) => {
                    let at = inner.children.first_index().expect("inner node has children");
                    node = inner.children.child_at(at).as_ref();
                }
            }
        }
    }

    /// The entry with the lexicographically largest key.
    pub fn last(&self) -> Option<(&[u8], &V)> {
        let mut node = self.root.as_deref()?;
        loop {
            match node {
                Node::Leaf(leaf) => return Some((leaf.key.as_ref(), &leaf.value)),
                Node::Inner(inner) => {
                    let at = inner.children.last_index().expect("inner node has children");
                    node = inner.children.child_at(at).as_ref();
                }
            }
        }
    }

    /// Iterates over all entries in ascending lexicographic key order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cowart::CowArt;
    ///
    /// let mut tree = CowArt::new();
    /// tree.insert(b"b", 2u8);
    /// tree.insert(b"a", 1);
    /// tree.insert(b"c", 3);
    ///
    /// let keys: Vec<&[u8]> = tree.iter().map(|(key, _)| key).collect();
    /// assert_eq!(keys, [&b"a"[..], &b"b"[..], &b"c"[..]]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.root.as_deref(), self.len)
    }
}

impl<V: Clone> CowArt<V> {
    /// Inserts `value` under `key`, returning `true` when a new entry was
    /// created and `false` when an existing entry's value was replaced.
    ///
    /// # Panics
    ///
    /// Panics if `key` is a strict prefix of a stored key (or the reverse),
    /// or if it is longer than `u32::MAX` bytes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cowart::CowArt;
    ///
    /// let mut tree = CowArt::new();
    /// assert!(tree.insert(b"key", 1));
    /// assert!(!tree.insert(b"key", 2));
    /// assert_eq!(tree.get(b"key"), Some(&2));
    /// ```
    pub fn insert(&mut self, key: &[u8], value: V) -> bool {
        assert!(
            u32::try_from(key.len()).is_ok(),
            "key length exceeds u32::MAX"
        );
        let key = Bytes::copy_from_slice(key);
        let inserted = match self.root.as_mut() {
            None => {
                self.root = Some(Node::leaf(key, value));
                true
            }
            Some(root) => insert_rec(root, key, value, 0),
        };
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Removes the entry under `key` and returns its value. Absent keys are
    /// a no-op: nothing is copied and `None` is returned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cowart::CowArt;
    ///
    /// let mut tree = CowArt::new();
    /// tree.insert(b"key", 1);
    ///
    /// assert_eq!(tree.remove(b"key"), Some(1));
    /// assert_eq!(tree.remove(b"key"), None);
    /// ```
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        self.get(key)?;
        let root_is_leaf = matches!(self.root.as_deref(), Some(Node::Leaf(_)));
        let removed = if root_is_leaf {
            take_leaf_value(self.root.take().expect("tree is non-empty"))
        } else {
            let root = self.root.as_mut().expect("tree is non-empty");
            remove_rec(root, key, 0)
        };
        self.len -= 1;
        Some(removed)
    }
}

impl<V> Default for CowArt<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for CowArt<V> {
    fn clone(&self) -> Self {
        CowArt {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for CowArt<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for CowArt<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for CowArt<V> {}

impl<'a, V> IntoIterator for &'a CowArt<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: AsRef<[u8]>, V: Clone> Extend<(K, V)> for CowArt<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
        for (key, value) in entries {
            self.insert(key.as_ref(), value);
        }
    }
}

impl<K: AsRef<[u8]>, V: Clone> FromIterator<(K, V)> for CowArt<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        let mut tree = CowArt::new();
        tree.extend(entries);
        tree
    }
}

/// Where an insertion lands once the descent reaches a node.
enum InsertAction {
    /// Equal-key leaf: replace its value.
    Replace,
    /// Unequal leaf: split into a Node4 parenting both leaves.
    SplitLeaf { lcp: usize },
    /// Inner node whose prefix diverges from the key before its end.
    SplitInner {
        mismatch: usize,
        /// A leaf key to recover prefix bytes from, when the node's true
        /// prefix is longer than its stored bytes.
        long_leaf_key: Option<Bytes>,
    },
    /// Prefix fully matched: continue below.
    Descend { prefix_len: usize },
}

fn insert_rec<V: Clone>(slot: &mut NodeRef<V>, key: Bytes, value: V, depth: usize) -> bool {
    let action = match slot.as_ref() {
        Node::Leaf(leaf) => {
            if leaf.matches_key(&key) {
                InsertAction::Replace
            } else {
                InsertAction::SplitLeaf {
                    lcp: common_prefix_len(&leaf.key, &key, depth),
                }
            }
        }
        Node::Inner(inner) => {
            let mismatch = inner.prefix_mismatch(&key, depth);
            if mismatch < inner.prefix.len() {
                let long_leaf_key =
                    (inner.prefix.len() > MAX_PREFIX_LEN).then(|| inner.min_leaf().key.clone());
                InsertAction::SplitInner {
                    mismatch,
                    long_leaf_key,
                }
            } else {
                InsertAction::Descend {
                    prefix_len: inner.prefix.len(),
                }
            }
        }
    };

    match action {
        InsertAction::Replace => {
            let Node::Leaf(leaf) = Rc::make_mut(slot) else {
                unreachable!("classified as a leaf")
            };
            leaf.value = value;
            false
        }
        InsertAction::SplitLeaf { lcp } => {
            let split_at = depth + lcp;
            let Node::Leaf(old_leaf) = slot.as_ref() else {
                unreachable!("classified as a leaf")
            };
            let old_byte = branch_byte(&old_leaf.key, split_at);
            let new_byte = branch_byte(&key, split_at);
            let mut inner = Inner {
                prefix: Prefix::new(&key[depth..], lcp),
                children: Children::new4(),
            };
            inner.children.add(old_byte, Rc::clone(slot));
            inner.children.add(new_byte, Node::leaf(key, value));
            *slot = Rc::new(Node::Inner(inner));
            true
        }
        InsertAction::SplitInner {
            mismatch,
            long_leaf_key,
        } => {
            let split_at = depth + mismatch;
            let new_byte = branch_byte(&key, split_at);
            let parent_prefix = Prefix::new(&key[depth..], mismatch);
            // Trim the old node's prefix to what follows the split point.
            // Past the stored bytes the header has nothing to trim from, so
            // the replacement bytes come from a descendant leaf's full key.
            let old_byte = {
                let Node::Inner(old) = Rc::make_mut(slot) else {
                    unreachable!("classified as an inner node")
                };
                match long_leaf_key {
                    None => {
                        let byte = old.prefix.at(mismatch);
                        old.prefix.trim_start(mismatch + 1);
                        byte
                    }
                    Some(leaf_key) => {
                        let remaining = old.prefix.len() - (mismatch + 1);
                        let byte = leaf_key[split_at];
                        old.prefix = Prefix::new(&leaf_key[split_at + 1..], remaining);
                        byte
                    }
                }
            };
            let mut inner = Inner {
                prefix: parent_prefix,
                children: Children::new4(),
            };
            inner.children.add(old_byte, Rc::clone(slot));
            inner.children.add(new_byte, Node::leaf(key, value));
            *slot = Rc::new(Node::Inner(inner));
            true
        }
        InsertAction::Descend { prefix_len } => {
            let depth = depth + prefix_len;
            let byte = branch_byte(&key, depth);
            let Node::Inner(inner) = Rc::make_mut(slot) else {
                unreachable!("classified as an inner node")
            };
            if inner.children.child(byte).is_some() {
                let child = inner.children.child_mut(byte).expect("child just found");
                insert_rec(child, key, value, depth + 1)
            } else {
                inner.children.add(byte, Node::leaf(key, value));
                true
            }
        }
    }
}

/// Removes `key` from the subtree under `slot`. The caller has already
/// established that the key is present, so the descent cannot miss.
fn remove_rec<V: Clone>(slot: &mut NodeRef<V>, key: &[u8], depth: usize) -> V {
    let mut collapse = None;
    let value = {
        let Node::Inner(inner) = Rc::make_mut(slot) else {
            unreachable!("descent only recurses into inner nodes")
        };
        let depth = depth + inner.prefix.len();
        let byte = key[depth];
        let child_is_leaf = matches!(
            inner
                .children
                .child(byte)
                .expect("present key has a child on its path")
                .as_ref(),
            Node::Leaf(_)
        );
        if !child_is_leaf {
            let child = inner.children.child_mut(byte).expect("child just found");
            return remove_rec(child, key, depth + 1);
        }
        let value = take_leaf_value(inner.children.remove(byte));
        if inner.children.kind() == NodeKind::Node4 && inner.children.len() == 1 {
            // Path re-compression: the survivor absorbs this node's prefix
            // and its own discriminating byte.
            let (disc, survivor) = inner.children.take_sole();
            let mut prefix = inner.prefix.clone();
            prefix.push(disc);
            collapse = Some((prefix, survivor));
        } else {
            inner.children.shrink_if_sparse();
        }
        value
    };
    if let Some((mut prefix, mut survivor)) = collapse {
        if matches!(survivor.as_ref(), Node::Inner(_)) {
            let Node::Inner(sub) = Rc::make_mut(&mut survivor) else {
                unreachable!("survivor kind checked above")
            };
            prefix.extend(&sub.prefix);
            sub.prefix = prefix;
        }
        *slot = survivor;
    }
    value
}

fn take_leaf_value<V: Clone>(node: NodeRef<V>) -> V {
    match Rc::try_unwrap(node) {
        Ok(Node::Leaf(leaf)) => leaf.value,
        Err(shared) => match shared.as_ref() {
            Node::Leaf(leaf) => leaf.value.clone(),
            Node::Inner(_) => unreachable!("removed node is a leaf"),
        },
        Ok(Node::Inner(_)) => unreachable!("removed node is a leaf"),
    }
}

fn branch_byte(key: &[u8], at: usize) -> u8 {
    assert!(
        at < key.len(),
        "a stored key must not be a strict prefix of another stored key"
    );
    key[at]
}
