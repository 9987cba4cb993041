//! Pass visibility bits
//!
//! Every pass owns one bit of a shared 32-bit mask space. The bits are fixed
//! at compile time and never overlap, so a node can be shown or hidden per
//! pass independently.

use static_assertions::const_assert_eq;
use std::fmt;

/// 32-bit visibility mask shared by cameras and scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct BitMask32(u32);

impl BitMask32 {
    /// No bits set.
    pub const ALL_OFF: Self = Self(0);
    /// Every bit set.
    pub const ALL_ON: Self = Self(u32::MAX);

    /// Mask with a single bit enabled.
    #[inline]
    pub const fn bit(index: u8) -> Self {
        Self(1 << (index as u32 & 31))
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is also set here.
    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// True when the masks share at least one bit.
    #[inline]
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for BitMask32 {
    fn default() -> Self {
        Self::ALL_OFF
    }
}

impl std::ops::BitOr for BitMask32 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for BitMask32 {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::Not for BitMask32 {
    type Output = Self;
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::Display for BitMask32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034b}", self.0)
    }
}

/// Bit of the always-on default (gbuffer) pass.
pub const GBUFFER_MASK: BitMask32 = BitMask32::bit(1);
/// Bit of the shadow depth pass.
pub const SHADOW_MASK: BitMask32 = BitMask32::bit(2);
/// Bit of the scene voxelization pass.
pub const VOXELIZE_MASK: BitMask32 = BitMask32::bit(3);

const_assert_eq!(SHADOW_MASK.bits() & VOXELIZE_MASK.bits(), 0);
const_assert_eq!(SHADOW_MASK.bits() & GBUFFER_MASK.bits(), 0);
const_assert_eq!(VOXELIZE_MASK.bits() & GBUFFER_MASK.bits(), 0);

/// Passes that render the scene with their own state overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Shadow,
    Voxelize,
}

impl PassKind {
    pub const ALL: [PassKind; 2] = [PassKind::Shadow, PassKind::Voxelize];

    /// Reserved visibility bit of this pass.
    pub const fn mask(self) -> BitMask32 {
        match self {
            PassKind::Shadow => SHADOW_MASK,
            PassKind::Voxelize => VOXELIZE_MASK,
        }
    }

    /// Tag name the pass uses unless configured otherwise.
    pub const fn tag_name(self) -> &'static str {
        match self {
            PassKind::Shadow => "Shadows",
            PassKind::Voxelize => "Voxelize",
        }
    }

    /// Whether the pass only produces depth or occupancy data.
    pub const fn is_depth_only(self) -> bool {
        matches!(self, PassKind::Shadow | PassKind::Voxelize)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Shadow => f.write_str("shadow"),
            PassKind::Voxelize => f.write_str("voxelize"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_bits_are_disjoint() {
        for (i, a) in PassKind::ALL.iter().enumerate() {
            assert!(!a.mask().intersects(GBUFFER_MASK));
            for b in &PassKind::ALL[i + 1..] {
                assert!((a.mask() & b.mask()).is_empty(), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn reserved_bits() {
        assert_eq!(GBUFFER_MASK.bits(), 0b0010);
        assert_eq!(SHADOW_MASK.bits(), 0b0100);
        assert_eq!(VOXELIZE_MASK.bits(), 0b1000);
    }

    #[test]
    fn tag_names_are_distinct() {
        assert_eq!(PassKind::Shadow.tag_name(), "Shadows");
        assert_eq!(PassKind::Voxelize.tag_name(), "Voxelize");
    }

    #[test]
    fn union_and_without() {
        let mask = GBUFFER_MASK | SHADOW_MASK;
        assert!(mask.contains(SHADOW_MASK));
        assert!(!mask.contains(VOXELIZE_MASK));
        assert_eq!(mask.without(SHADOW_MASK), GBUFFER_MASK);
        assert_eq!(!BitMask32::ALL_OFF, BitMask32::ALL_ON);
    }

    #[test]
    fn is_pod() {
        let bytes = bytemuck::bytes_of(&SHADOW_MASK);
        assert_eq!(bytes.len(), 4);
        assert_eq!(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 4);
    }
}
