use std::cmp::min;

/// Number of prefix bytes kept inline in an inner node.
pub(crate) const MAX_PREFIX_LEN: usize = 8;

/// Compressed path prefix of an inner node.
///
/// `len` is the true length of the common prefix shared by every key below
/// the node; only the first `min(len, MAX_PREFIX_LEN)` bytes are kept in
/// `data`. Comparisons past the stored bytes go through a descendant leaf,
/// which always holds its full key.
#[derive(Clone, Debug, Default)]
pub(crate) struct Prefix {
    len: usize,
    data: [u8; MAX_PREFIX_LEN],
}

impl Prefix {
    /// Build a prefix of true length `len`, storing the first bytes of
    /// `bytes`. The slice must cover at least `min(len, MAX_PREFIX_LEN)`
    /// bytes.
    pub fn new(bytes: &[u8], len: usize) -> Self {
        let stored = min(len, MAX_PREFIX_LEN);
        let mut data = [0u8; MAX_PREFIX_LEN];
        data[..stored].copy_from_slice(&bytes[..stored]);
        Self { len, data }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// The bytes actually kept in the node.
    pub fn stored(&self) -> &[u8] {
        &self.data[..min(self.len, MAX_PREFIX_LEN)]
    }

    pub fn at(&self, index: usize) -> u8 {
        self.data[index]
    }

    /// Optimistic check used on the lookup path. The key must be long enough
    /// to cover the whole prefix and must match every stored byte; anything
    /// past the stored bytes is assumed equal. The full-key comparison at
    /// the leaf makes the final call.
    pub fn matches(&self, key: &[u8], depth: usize) -> bool {
        let rest = &key[depth..];
        if rest.len() < self.len {
            return false;
        }
        self.stored().iter().zip(rest).all(|(a, b)| a == b)
    }

    /// Drop the first `count` bytes. Only valid while the true length fits
    /// in storage; longer prefixes are rebuilt from a leaf key instead.
    pub fn trim_start(&mut self, count: usize) {
        debug_assert!(self.len <= MAX_PREFIX_LEN && count <= self.len);
        self.data.copy_within(count.., 0);
        self.len -= count;
    }

    /// Append one byte. Bytes past the stored capacity only grow `len`.
    pub fn push(&mut self, byte: u8) {
        if self.len < MAX_PREFIX_LEN {
            self.data[self.len] = byte;
        }
        self.len += 1;
    }

    /// Append another prefix, keeping whatever still fits in storage.
    pub fn extend(&mut self, other: &Prefix) {
        if self.len < MAX_PREFIX_LEN {
            let take = min(other.stored().len(), MAX_PREFIX_LEN - self.len);
            self.data[self.len..self.len + take].copy_from_slice(&other.stored()[..take]);
        }
        self.len += other.len;
    }
}
