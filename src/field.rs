//! Prime-field element (spec §3.1, component C1).
//!
//! Backed by BN254's scalar field (~254 bits), satisfying the "p >= 250 bits"
//! requirement. The modulus is a compile-time constant of `ark_bn254::Fr`;
//! this module never exposes it as a parameter.

use ark_ff::{BigInteger, Field as ArkField, PrimeField};
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An element of the field, in canonical (reduced) form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement(ark_bn254::Fr);

impl FieldElement {
    pub fn zero() -> Self {
        FieldElement(ark_bn254::Fr::from(0u64))
    }

    pub fn one() -> Self {
        FieldElement(ark_bn254::Fr::from(1u64))
    }

    pub fn from_u64(v: u64) -> Self {
        FieldElement(ark_bn254::Fr::from(v))
    }

    /// Builds a field element from a signed big integer, reducing modulo p.
    pub fn from_bigint(v: &BigInt) -> Self {
        let (sign, mag) = v.clone().into_parts();
        let reduced = ark_bn254::Fr::from_le_bytes_mod_order(&mag.to_bytes_le());
        FieldElement(if sign == Sign::Minus { -reduced } else { reduced })
    }

    /// The canonical representative of this element as a non-negative
    /// big integer in `[0, p)`.
    pub fn to_biguint(self) -> BigUint {
        let repr = self.0.into_bigint();
        BigUint::from_bytes_le(&repr.to_bytes_le())
    }

    pub fn to_bigint(self) -> BigInt {
        BigInt::from_biguint(Sign::Plus, self.to_biguint())
    }

    pub fn add(self, other: Self) -> Self {
        FieldElement(self.0 + other.0)
    }

    pub fn sub(self, other: Self) -> Self {
        FieldElement(self.0 - other.0)
    }

    pub fn mul(self, other: Self) -> Self {
        FieldElement(self.0 * other.0)
    }

    pub fn neg(self) -> Self {
        FieldElement(-self.0)
    }

    /// `self^n`, via the field's fast exponentiation.
    pub fn pow(self, n: u64) -> Self {
        FieldElement(self.0.pow([n]))
    }

    pub fn is_zero(self) -> bool {
        self.0 == ark_bn254::Fr::from(0u64)
    }

    /// Multiplicative inverse, or `None` for zero.
    pub fn inverse(self) -> Option<Self> {
        ArkField::inverse(&self.0).map(FieldElement)
    }

    /// `0 |-> 0`, every nonzero value |-> 1.
    pub fn normalise(self) -> Self {
        if self.is_zero() { Self::zero() } else { Self::one() }
    }

    /// Total order on canonical residues, used by `cmp` (spec §4.C1).
    pub fn cmp_canonical(&self, other: &Self) -> std::cmp::Ordering {
        self.to_biguint().cmp(&other.to_biguint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0.into_bigint().to_bytes_le())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        Ok(FieldElement(ark_bn254::Fr::from_le_bytes_mod_order(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_matches_spec() {
        assert!(FieldElement::zero().normalise().is_zero());
        assert_eq!(FieldElement::from_u64(7).normalise(), FieldElement::one());
        assert_eq!(FieldElement::zero().neg().normalise(), FieldElement::zero());
    }

    #[test]
    fn negative_bigint_reduces_correctly() {
        let neg_one = FieldElement::from_bigint(&BigInt::from(-1));
        assert_eq!(neg_one, FieldElement::zero().sub(FieldElement::one()));
    }

    #[test]
    fn pow_matches_repeated_mul() {
        let x = FieldElement::from_u64(3);
        let mut expected = FieldElement::one();
        for _ in 0..5 {
            expected = expected.mul(x);
        }
        assert_eq!(x.pow(5), expected);
    }

    #[test]
    fn cmp_is_total_order_on_canonical_residues() {
        let a = FieldElement::from_u64(3);
        let b = FieldElement::from_u64(5);
        assert_eq!(a.cmp_canonical(&b), std::cmp::Ordering::Less);
        assert_eq!(a.cmp_canonical(&a), std::cmp::Ordering::Equal);
    }
}
