//! Order-preserving key encoding.
//!
//! Strongly-typed keys enter the tree through a binary-comparable byte
//! encoding: `x <= y` exactly when `encode(x)` sorts at or before
//! `encode(y)` in lexicographic byte order. Unsigned integers encode as
//! big-endian fixed-width bytes, signed integers additionally flip the sign
//! bit so the negative range sorts first, and byte arrays pass through
//! unchanged.
//!
//! ```rust
//! use cowart::keys::OrderedBytes;
//!
//! assert_eq!((-1i32).encode(), [0x7F, 0xFF, 0xFF, 0xFF]);
//! assert_eq!(0i32.encode(), [0x80, 0x00, 0x00, 0x00]);
//! assert_eq!(i32::decode(&1i32.encode()), Ok(1));
//! ```

use bytes::Bytes;
use thiserror::Error;

/// Failure to decode a typed key from its byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The slice does not have the fixed width the type encodes to.
    #[error("expected {expected} encoded bytes, got {actual}")]
    WrongLength {
        /// Width of the type's encoding.
        expected: usize,
        /// Length of the slice that was provided.
        actual: usize,
    },
}

/// A key type with an order-preserving byte encoding.
///
/// Implementations guarantee `decode(encode(x)) == Ok(x)` and that
/// lexicographic order of encodings matches the natural order of values.
/// Fixed-width encodings are also prefix-free, which makes them directly
/// usable as tree keys.
pub trait OrderedBytes: Sized {
    /// The encoded form; borrowable as a byte slice.
    type Encoded: AsRef<[u8]>;

    /// Encode into binary-comparable bytes.
    fn encode(&self) -> Self::Encoded;

    /// Decode an encoded key back to its typed form.
    fn decode(encoded: &[u8]) -> Result<Self, DecodeError>;
}

fn fixed_width<const N: usize>(encoded: &[u8]) -> Result<[u8; N], DecodeError> {
    encoded
        .try_into()
        .map_err(|_| DecodeError::WrongLength {
            expected: N,
            actual: encoded.len(),
        })
}

macro_rules! unsigned_ordered_bytes {
    ($($ty:ty),*) => {$(
        impl OrderedBytes for $ty {
            type Encoded = [u8; size_of::<$ty>()];

            fn encode(&self) -> Self::Encoded {
                self.to_be_bytes()
            }

            fn decode(encoded: &[u8]) -> Result<Self, DecodeError> {
                Ok(<$ty>::from_be_bytes(fixed_width(encoded)?))
            }
        }
    )*};
}

unsigned_ordered_bytes!(u8, u16, u32, u64, u128, usize);

macro_rules! signed_ordered_bytes {
    ($($ty:ty => $uty:ty),*) => {$(
        impl OrderedBytes for $ty {
            type Encoded = [u8; size_of::<$ty>()];

            fn encode(&self) -> Self::Encoded {
                const FLIP: $uty = 1 << (<$uty>::BITS - 1);
                ((*self as $uty) ^ FLIP).to_be_bytes()
            }

            fn decode(encoded: &[u8]) -> Result<Self, DecodeError> {
                const FLIP: $uty = 1 << (<$uty>::BITS - 1);
                Ok((<$uty>::from_be_bytes(fixed_width(encoded)?) ^ FLIP) as $ty)
            }
        }
    )*};
}

signed_ordered_bytes!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, i128 => u128, isize => usize);

impl OrderedBytes for Vec<u8> {
    type Encoded = Vec<u8>;

    fn encode(&self) -> Self::Encoded {
        self.clone()
    }

    fn decode(encoded: &[u8]) -> Result<Self, DecodeError> {
        Ok(encoded.to_vec())
    }
}

impl OrderedBytes for Box<[u8]> {
    type Encoded = Box<[u8]>;

    fn encode(&self) -> Self::Encoded {
        self.clone()
    }

    fn decode(encoded: &[u8]) -> Result<Self, DecodeError> {
        Ok(encoded.into())
    }
}

impl OrderedBytes for Bytes {
    type Encoded = Bytes;

    // Zero-copy: `Bytes` handles share their backing buffer.
    fn encode(&self) -> Self::Encoded {
        self.clone()
    }

    fn decode(encoded: &[u8]) -> Result<Self, DecodeError> {
        Ok(Bytes::copy_from_slice(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips<T>(values: &[T])
    where
        T: OrderedBytes + Copy + PartialEq + PartialOrd + std::fmt::Debug,
    {
        for &value in values {
            assert_eq!(T::decode(value.encode().as_ref()), Ok(value));
        }
        for window in values.windows(2) {
            assert!(window[0] < window[1], "test values must be ascending");
            assert!(
                window[0].encode().as_ref() < window[1].encode().as_ref(),
                "{:?} must encode below {:?}",
                window[0],
                window[1],
            );
        }
    }

    #[test]
    fn unsigned_round_trip_and_order() {
        round_trips(&[0u8, 1, 127, 128, 255]);
        round_trips(&[0u16, 255, 256, u16::MAX]);
        round_trips(&[0u32, 1, u32::from(u16::MAX) + 1, u32::MAX]);
        round_trips(&[0u64, u64::from(u32::MAX) + 1, u64::MAX]);
        round_trips(&[0u128, u128::from(u64::MAX) + 1, u128::MAX]);
    }

    #[test]
    fn signed_round_trip_and_order() {
        round_trips(&[i8::MIN, -1, 0, 1, i8::MAX]);
        round_trips(&[i16::MIN, -257, -1, 0, 256, i16::MAX]);
        round_trips(&[i32::MIN, -1, 0, 1, i32::MAX]);
        round_trips(&[i64::MIN, -1, 0, 1, i64::MAX]);
        round_trips(&[i128::MIN, -1, 0, 1, i128::MAX]);
    }

    #[test]
    fn sign_bit_flip_layout() {
        assert_eq!((-1i32).encode(), [0x7F, 0xFF, 0xFF, 0xFF]);
        assert_eq!(0i32.encode(), [0x80, 0x00, 0x00, 0x00]);
        assert_eq!(1i32.encode(), [0x80, 0x00, 0x00, 0x01]);
        assert_eq!(i32::MIN.encode(), [0x00, 0x00, 0x00, 0x00]);
        assert_eq!(i32::MAX.encode(), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn byte_arrays_pass_through() {
        let raw = vec![3u8, 0, 255];
        assert_eq!(raw.encode(), raw);
        assert_eq!(Vec::<u8>::decode(&raw), Ok(raw.clone()));
        let shared = Bytes::from(raw.clone());
        assert_eq!(shared.encode(), shared);
        assert_eq!(Bytes::decode(&raw), Ok(shared));
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert_eq!(
            u32::decode(&[0, 1, 2]),
            Err(DecodeError::WrongLength {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            i16::decode(&[0, 1, 2]),
            Err(DecodeError::WrongLength {
                expected: 2,
                actual: 3
            })
        );
    }
}
