use std::mem;

use arrayvec::ArrayVec;

use crate::node::{NodeKind, NodeRef};

/// Sentinel in a Node48 byte index marking an unmapped key byte.
const NO_SLOT: u8 = 0xFF;

/// Demotion thresholds. Each sits below the smaller variant's capacity so a
/// delete right after a promotion does not immediately bounce back.
pub(crate) const NODE16_SHRINK_AT: usize = 3;
pub(crate) const NODE48_SHRINK_AT: usize = 13;
pub(crate) const NODE256_SHRINK_AT: usize = 40;

/// The adaptive child containers of an inner node. Growth and demotion swap
/// the variant in place; children move over, they are never cloned.
pub(crate) enum Children<V> {
    Node4(Sorted<V, 4>),
    Node16(Sorted<V, 16>),
    Node48(Box<Indexed<V>>),
    Node256(Box<Direct<V>>),
}

impl<V: Clone> Clone for Children<V> {
    fn clone(&self) -> Self {
        match self {
            Children::Node4(n) => Children::Node4(n.clone()),
            Children::Node16(n) => Children::Node16(n.clone()),
            Children::Node48(n) => Children::Node48(n.clone()),
            Children::Node256(n) => Children::Node256(n.clone()),
        }
    }
}

impl<V> Children<V> {
    pub fn new4() -> Self {
        Children::Node4(Sorted::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Children::Node4(_) => NodeKind::Node4,
            Children::Node16(_) => NodeKind::Node16,
            Children::Node48(_) => NodeKind::Node48,
            Children::Node256(_) => NodeKind::Node256,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Children::Node4(n) => n.len(),
            Children::Node16(n) => n.len(),
            Children::Node48(n) => n.len(),
            Children::Node256(n) => n.len(),
        }
    }

    pub fn child(&self, key: u8) -> Option<&NodeRef<V>> {
        match self {
            Children::Node4(n) => n.child(key),
            Children::Node16(n) => n.child(key),
            Children::Node48(n) => n.child(key),
            Children::Node256(n) => n.child(key),
        }
    }

    pub fn child_mut(&mut self, key: u8) -> Option<&mut NodeRef<V>> {
        match self {
            Children::Node4(n) => n.child_mut(key),
            Children::Node16(n) => n.child_mut(key),
            Children::Node48(n) => n.child_mut(key),
            Children::Node256(n) => n.child_mut(key),
        }
    }

    /// Insert a child under `key`, promoting to the next capacity first when
    /// full. `key` must either be absent or map to a slot being replaced.
    pub fn add(&mut self, key: u8, child: NodeRef<V>) {
        if self.is_full() {
            self.grow();
        }
        match self {
            Children::Node4(n) => n.insert(key, child),
            Children::Node16(n) => n.insert(key, child),
            Children::Node48(n) => n.insert(key, child),
            Children::Node256(n) => n.insert(key, child),
        }
    }

    /// Remove and return the child under `key`, which must be present.
    /// Demotion is a separate step, see [`Children::shrink_if_sparse`].
    pub fn remove(&mut self, key: u8) -> NodeRef<V> {
        match self {
            Children::Node4(n) => n.remove(key),
            Children::Node16(n) => n.remove(key),
            Children::Node48(n) => n.remove(key),
            Children::Node256(n) => n.remove(key),
        }
    }

    fn is_full(&self) -> bool {
        match self {
            Children::Node4(n) => n.len() == 4,
            Children::Node16(n) => n.len() == 16,
            Children::Node48(n) => n.len() == 48,
            Children::Node256(_) => false,
        }
    }

    fn grow(&mut self) {
        let old = mem::replace(self, Children::new4());
        *self = match old {
            Children::Node4(n) => Children::Node16(n.resize()),
            Children::Node16(n) => Children::Node48(Box::new(Indexed::from_sorted(n))),
            Children::Node48(n) => Children::Node256(Box::new(Direct::from_indexed(*n))),
            Children::Node256(_) => unreachable!("a Node256 has room for every key byte"),
        };
    }

    /// Demote to the smaller representation when the child count has dropped
    /// to its threshold. The Node4-to-single-child collapse is handled by the
    /// caller because it replaces the whole node.
    pub fn shrink_if_sparse(&mut self) {
        let demote = match self {
            Children::Node4(_) => false,
            Children::Node16(n) => n.len() == NODE16_SHRINK_AT,
            Children::Node48(n) => n.len() == NODE48_SHRINK_AT,
            Children::Node256(n) => n.len() == NODE256_SHRINK_AT,
        };
        if !demote {
            return;
        }
        let old = mem::replace(self, Children::new4());
        *self = match old {
            Children::Node4(_) => unreachable!(),
            Children::Node16(n) => Children::Node4(n.resize()),
            Children::Node48(n) => Children::Node16(n.into_sorted()),
            Children::Node256(n) => Children::Node48(Box::new(n.into_indexed())),
        };
    }

    /// Take the single remaining entry out of a Node4 about to collapse.
    pub fn take_sole(&mut self) -> (u8, NodeRef<V>) {
        let Children::Node4(n) = self else {
            unreachable!("collapse only applies to a Node4")
        };
        debug_assert_eq!(n.len(), 1);
        (n.keys.remove(0), n.children.remove(0))
    }

    /// Position of the smallest key byte, as an opaque traversal index.
    pub fn first_index(&self) -> Option<usize> {
        match self {
            Children::Node4(n) => n.first_index(),
            Children::Node16(n) => n.first_index(),
            Children::Node48(n) => n.next_mapped(0),
            Children::Node256(n) => n.next_occupied(0),
        }
    }

    /// The traversal index following `index`, in ascending key-byte order.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        match self {
            Children::Node4(n) => n.next_index(index),
            Children::Node16(n) => n.next_index(index),
            Children::Node48(n) => n.next_mapped(index + 1),
            Children::Node256(n) => n.next_occupied(index + 1),
        }
    }

    /// Position of the largest key byte.
    pub fn last_index(&self) -> Option<usize> {
        match self {
            Children::Node4(n) => n.len().checked_sub(1),
            Children::Node16(n) => n.len().checked_sub(1),
            Children::Node48(n) => n.prev_mapped(255),
            Children::Node256(n) => n.prev_occupied(255),
        }
    }

    pub fn child_at(&self, index: usize) -> &NodeRef<V> {
        match self {
            Children::Node4(n) => &n.children[index],
            Children::Node16(n) => &n.children[index],
            Children::Node48(n) => n.slot_for(index),
            Children::Node256(n) => n.slots[index].as_ref().expect("occupied slot"),
        }
    }
}

/// Node4 and Node16: parallel arrays ordered by key byte, scanned linearly.
pub(crate) struct Sorted<V, const N: usize> {
    keys: ArrayVec<u8, N>,
    children: ArrayVec<NodeRef<V>, N>,
}

impl<V: Clone, const N: usize> Clone for Sorted<V, N> {
    fn clone(&self) -> Self {
        Sorted {
            keys: self.keys.clone(),
            children: self.children.clone(),
        }
    }
}

impl<V, const N: usize> Sorted<V, N> {
    fn new() -> Self {
        Sorted {
            keys: ArrayVec::new(),
            children: ArrayVec::new(),
        }
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn position(&self, key: u8) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }

    fn child(&self, key: u8) -> Option<&NodeRef<V>> {
        self.position(key).map(|i| &self.children[i])
    }

    fn child_mut(&mut self, key: u8) -> Option<&mut NodeRef<V>> {
        self.position(key).map(|i| &mut self.children[i])
    }

    fn insert(&mut self, key: u8, child: NodeRef<V>) {
        match self.keys.binary_search(&key) {
            Ok(at) => self.children[at] = child,
            Err(at) => {
                self.keys.insert(at, key);
                self.children.insert(at, child);
            }
        }
    }

    fn remove(&mut self, key: u8) -> NodeRef<V> {
        let at = self.position(key).expect("removed key is present");
        self.keys.remove(at);
        self.children.remove(at)
    }

    fn first_index(&self) -> Option<usize> {
        (!self.keys.is_empty()).then_some(0)
    }

    fn next_index(&self, index: usize) -> Option<usize> {
        (index + 1 < self.keys.len()).then_some(index + 1)
    }

    /// Move every entry into a differently sized sorted container.
    fn resize<const M: usize>(self) -> Sorted<V, M> {
        debug_assert!(self.keys.len() <= M);
        let mut out = Sorted::new();
        for (key, child) in self.keys.into_iter().zip(self.children) {
            out.keys.push(key);
            out.children.push(child);
        }
        out
    }
}

/// Node48: a 256-entry byte-to-slot index over a 48-slot child array.
pub(crate) struct Indexed<V> {
    index: [u8; 256],
    slots: [Option<NodeRef<V>>; 48],
    count: u16,
}

impl<V: Clone> Clone for Indexed<V> {
    fn clone(&self) -> Self {
        Indexed {
            index: self.index,
            slots: self.slots.clone(),
            count: self.count,
        }
    }
}

impl<V> Indexed<V> {
    fn new() -> Self {
        Indexed {
            index: [NO_SLOT; 256],
            slots: [const { None }; 48],
            count: 0,
        }
    }

    fn from_sorted(src: Sorted<V, 16>) -> Self {
        let mut out = Indexed::new();
        for (key, child) in src.keys.into_iter().zip(src.children) {
            out.insert(key, child);
        }
        out
    }

    fn into_sorted(self) -> Sorted<V, 16> {
        let mut out = Sorted::new();
        let mut slots = self.slots;
        for (byte, &slot) in self.index.iter().enumerate() {
            if slot != NO_SLOT {
                let child = slots[usize::from(slot)].take().expect("mapped slot occupied");
                out.keys.push(byte as u8);
                out.children.push(child);
            }
        }
        out
    }

    fn len(&self) -> usize {
        usize::from(self.count)
    }

    fn child(&self, key: u8) -> Option<&NodeRef<V>> {
        let slot = self.index[usize::from(key)];
        if slot == NO_SLOT {
            return None;
        }
        self.slots[usize::from(slot)].as_ref()
    }

    fn child_mut(&mut self, key: u8) -> Option<&mut NodeRef<V>> {
        let slot = self.index[usize::from(key)];
        if slot == NO_SLOT {
            return None;
        }
        self.slots[usize::from(slot)].as_mut()
    }

    fn insert(&mut self, key: u8, child: NodeRef<V>) {
        let at = usize::from(key);
        if self.index[at] != NO_SLOT {
            self.slots[usize::from(self.index[at])] = Some(child);
            return;
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .expect("node is full");
        self.index[at] = slot as u8;
        self.slots[slot] = Some(child);
        self.count += 1;
    }

    fn remove(&mut self, key: u8) -> NodeRef<V> {
        let at = usize::from(key);
        let slot = self.index[at];
        debug_assert_ne!(slot, NO_SLOT);
        self.index[at] = NO_SLOT;
        self.count -= 1;
        self.slots[usize::from(slot)]
            .take()
            .expect("removed key is present")
    }

    /// Smallest mapped key byte at or after `from`.
    fn next_mapped(&self, from: usize) -> Option<usize> {
        (from..256).find(|&b| self.index[b] != NO_SLOT)
    }

    /// Largest mapped key byte at or before `until`.
    fn prev_mapped(&self, until: usize) -> Option<usize> {
        (0..=until).rev().find(|&b| self.index[b] != NO_SLOT)
    }

    fn slot_for(&self, key_byte: usize) -> &NodeRef<V> {
        let slot = self.index[key_byte];
        debug_assert_ne!(slot, NO_SLOT);
        self.slots[usize::from(slot)]
            .as_ref()
            .expect("mapped slot occupied")
    }
}

/// Node256: one slot per possible key byte.
pub(crate) struct Direct<V> {
    slots: [Option<NodeRef<V>>; 256],
    count: u16,
}

impl<V: Clone> Clone for Direct<V> {
    fn clone(&self) -> Self {
        Direct {
            slots: self.slots.clone(),
            count: self.count,
        }
    }
}

impl<V> Direct<V> {
    fn from_indexed(src: Indexed<V>) -> Self {
        let mut slots = [const { None }; 256];
        let count = src.count;
        let mut src_slots = src.slots;
        for (byte, &slot) in src.index.iter().enumerate() {
            if slot != NO_SLOT {
                slots[byte] = src_slots[usize::from(slot)].take();
            }
        }
        Direct { slots, count }
    }

    fn into_indexed(self) -> Indexed<V> {
        let mut out = Indexed::new();
        for (byte, slot) in self.slots.into_iter().enumerate() {
            if let Some(child) = slot {
                out.insert(byte as u8, child);
            }
        }
        out
    }

    fn len(&self) -> usize {
        usize::from(self.count)
    }

    fn child(&self, key: u8) -> Option<&NodeRef<V>> {
        self.slots[usize::from(key)].as_ref()
    }

    fn child_mut(&mut self, key: u8) -> Option<&mut NodeRef<V>> {
        self.slots[usize::from(key)].as_mut()
    }

    fn insert(&mut self, key: u8, child: NodeRef<V>) {
        let slot = &mut self.slots[usize::from(key)];
        if slot.is_none() {
            self.count += 1;
        }
        *slot = Some(child);
    }

    fn remove(&mut self, key: u8) -> NodeRef<V> {
        self.count -= 1;
        self.slots[usize::from(key)]
            .take()
            .expect("removed key is present")
    }

    fn next_occupied(&self, from: usize) -> Option<usize> {
        (from..256).find(|&b| self.slots[b].is_some())
    }

    fn prev_occupied(&self, until: usize) -> Option<usize> {
        (0..=until).rev().find(|&b| self.slots[b].is_some())
    }
}
