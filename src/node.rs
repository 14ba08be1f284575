use crate::edge::Edge;
use crate::variable::Variable;
use static_assertions::const_assert_eq;

/// The width, in bits, of an index stored inside a packed [`Node`]. `2^40` slots is far
/// beyond the statically configured capacities the engine actually supports (§1 caps the
/// table at the configured capacity, typically `2^25..2^28`), so truncation can never
/// silently lose information for any capacity `init` will accept.
const NODE_INDEX_BITS: u32 = 40;
const NODE_INDEX_MASK: u64 = (1 << NODE_INDEX_BITS) - 1;

const VARIABLE_SHIFT: u32 = NODE_INDEX_BITS;
const HIGH_COMPLEMENT_BIT: u64 = 1 << 63;
const MARK_BIT: u64 = 1 << 62;
const AUX_BIT: u64 = 1 << 61;
/// Reserved for the multi-terminal/leaf node-type tag; the Boolean core never sets it.
const TAG_BIT: u64 = 1 << 60;
/// Bookkeeping bits GC and single-threaded traversals fold into word 1 alongside the
/// high edge. None of them are part of a node's hash-consing identity (I1): `MARK_BIT`
/// in particular stays set on every slot that survived the most recent sweep (only the
/// *next* cycle's `clear_marks` resets it), so a freshly packed `(var, low, high)` triple
/// being re-interned against an already-live, already-marked slot must not compare word 1
/// bit-for-bit, or the stale mark bit makes an equal triple look unequal.
const PAYLOAD_BOOKKEEPING_MASK: u64 = MARK_BIT | AUX_BIT | TAG_BIT;
/// Width of the packed variable field. `Variable::MAX` is one below this field's
/// all-ones pattern, which is reserved to encode `Variable::UNDEFINED` (see
/// [`Node::pack`]/[`Node::get_variable`]) — a plain truncating shift of the 32-bit
/// `UNDEFINED` sentinel would otherwise collide with a legitimate maximal variable.
const VARIABLE_BITS: u32 = 24;
const VARIABLE_MASK: u64 = (1 << VARIABLE_BITS) - 1;
const VARIABLE_UNDEFINED_CODE: u64 = VARIABLE_MASK;

/// A single 16-byte unique-table slot payload: a variable and two child edges.
///
/// Laid out as exactly two `u64` words so that the whole table is one flat, cache-dense
/// array (§3: "Exactly 16 bytes"). Per invariant I4 the low edge is always stored
/// uncomplemented — its complement bit is folded into the returned `Edge` by `makenode`
/// instead — so word 0 needs no complement bit and can dedicate all its spare bits to the
/// variable identifier. Word 1 carries the high edge's complement bit alongside the
/// bookkeeping bits GC and `nodecount`/serialization need.
///
/// Terminal nodes are never allocated by this (Boolean-only) core — see [`Edge::FALSE`]/
/// [`Edge::TRUE`] — but the layout keeps a `tag` bit free for a hypothetical multi-terminal
/// extension to repurpose the payload, matching how the upstream engine's other DD
/// variants share this same node shape.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Node(u64, u64);

const_assert_eq!(std::mem::size_of::<Node>(), 16);

impl Node {
    #[inline]
    pub fn pack(variable: Variable, low: Edge, high: Edge) -> Node {
        debug_assert!(!low.is_complemented(), "low edge must be normalized (I4)");
        debug_assert!(low.index() <= NODE_INDEX_MASK);
        debug_assert!(high.index() <= NODE_INDEX_MASK);

        let variable_code = if variable.is_undefined() { VARIABLE_UNDEFINED_CODE } else { u64::from(variable.raw()) & VARIABLE_MASK };
        let word0 = (variable_code << VARIABLE_SHIFT) | (low.index() & NODE_INDEX_MASK);
        let mut word1 = high.index() & NODE_INDEX_MASK;
        if high.is_complemented() {
            word1 |= HIGH_COMPLEMENT_BIT;
        }
        Node(word0, word1)
    }

    #[inline]
    pub fn get_variable(&self) -> Variable {
        let code = (self.0 >> VARIABLE_SHIFT) & VARIABLE_MASK;
        if code == VARIABLE_UNDEFINED_CODE {
            Variable::UNDEFINED
        } else {
            Variable::from(code as u32)
        }
    }

    #[inline]
    pub fn get_low(&self) -> Edge {
        Edge::from_index(self.0 & NODE_INDEX_MASK)
    }

    #[inline]
    pub fn get_high(&self) -> Edge {
        let index = self.1 & NODE_INDEX_MASK;
        Edge::new(index, self.1 & HIGH_COMPLEMENT_BIT != 0)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.get_variable().is_undefined()
    }

    /// Hash-key bytes for the unique table: variable, low index and high (index,
    /// complement) — exactly the fields that must match for hash-consing (I1), with
    /// `MARK_BIT`/`AUX_BIT`/`TAG_BIT` masked out of word 1 so two slots holding the same
    /// triple still compare equal regardless of either one's current GC mark or aux flag.
    #[inline]
    pub(crate) fn key_bits(&self) -> (u64, u64) {
        (self.0, self.1 & !PAYLOAD_BOOKKEEPING_MASK)
    }

    #[inline]
    pub(crate) fn mark_bit(&self) -> bool {
        self.1 & MARK_BIT != 0
    }

    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Node {
        if mark {
            Node(self.0, self.1 | MARK_BIT)
        } else {
            Node(self.0, self.1 & !MARK_BIT)
        }
    }

    #[inline]
    pub(crate) fn aux_flag(&self) -> bool {
        self.1 & AUX_BIT != 0
    }

    #[inline]
    pub(crate) fn with_aux(&self, set: bool) -> Node {
        if set {
            Node(self.0, self.1 | AUX_BIT)
        } else {
            Node(self.0, self.1 & !AUX_BIT)
        }
    }

    #[inline]
    pub(crate) fn has_tag(&self) -> bool {
        self.1 & TAG_BIT != 0
    }

    /// Raw backing words, used by the unique table to store a node as a pair of
    /// `AtomicU64`s (so the GC mark bit can be flipped with a CAS on word 1 alone).
    #[inline]
    pub(crate) fn to_words(self) -> (u64, u64) {
        (self.0, self.1)
    }

    #[inline]
    pub(crate) fn from_words(word0: u64, word1: u64) -> Node {
        Node(word0, word1)
    }
}

pub(crate) const NODE_MARK_BIT: u64 = MARK_BIT;
/// Auxiliary flag bit, owned by the single thread running `nodecount` or serialization at
/// any given time (§4.6: "single-threaded because it mutates node flags").
pub(crate) const NODE_AUX_BIT: u64 = AUX_BIT;
