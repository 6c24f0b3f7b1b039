//! Closed integer intervals over big integers (spec §3.2, component C1).

use num_bigint::BigInt;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// A closed range `[lo, hi]`, `lo <= hi`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: BigInt,
    pub hi: BigInt,
}

impl Interval {
    pub fn new(lo: BigInt, hi: BigInt) -> Self {
        assert!(lo <= hi, "interval lo must not exceed hi");
        Interval { lo, hi }
    }

    pub fn point(v: BigInt) -> Self {
        Interval { lo: v.clone(), hi: v }
    }

    pub fn zero() -> Self {
        Self::point(BigInt::zero())
    }

    /// `[0, 2^w - 1]`, the range of an unsigned `w`-bit value.
    pub fn unsigned(width: u32) -> Self {
        let hi = (BigInt::one() << width) - BigInt::one();
        Interval::new(BigInt::zero(), hi)
    }

    /// `[0, 1]`, the range of a normalised value.
    pub fn boolean() -> Self {
        Interval::new(BigInt::zero(), BigInt::one())
    }

    /// The smallest interval containing both `self` and `other`.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval::new(self.lo.clone().min(other.lo.clone()), self.hi.clone().max(other.hi.clone()))
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval::new(&self.lo + &other.lo, &self.hi + &other.hi)
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        Interval::new(&self.lo - &other.hi, &self.hi - &other.lo)
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        let candidates = [
            &self.lo * &other.lo,
            &self.lo * &other.hi,
            &self.hi * &other.lo,
            &self.hi * &other.hi,
        ];
        let lo = candidates.iter().min().unwrap().clone();
        let hi = candidates.iter().max().unwrap().clone();
        Interval::new(lo, hi)
    }

    /// The exact interval of `x^n` over `self`, using that even powers are
    /// non-negative (spec §4.C1).
    pub fn exp(&self, n: u64) -> Interval {
        if n == 0 {
            return Interval::point(BigInt::one());
        }
        let lo_pow = self.lo.pow(n as u32);
        let hi_pow = self.hi.pow(n as u32);
        if n % 2 == 0 {
            // Even power: the minimum magnitude point in the interval (which
            // may be 0 if the interval straddles zero) gives the true lower
            // bound; the larger of the two endpoint magnitudes gives the hi.
            let min_abs = if self.lo.is_zero() || self.hi.is_zero() || (self.lo.clone() < BigInt::zero()) != (self.hi.clone() < BigInt::zero()) {
                BigInt::zero()
            } else {
                self.lo.clone().abs().min(self.hi.clone().abs())
            };
            let lo = min_abs.pow(n as u32);
            let hi = lo_pow.max(hi_pow);
            Interval::new(lo, hi)
        } else {
            Interval::new(lo_pow, hi_pow)
        }
    }

    /// `self` is entirely contained within `other`.
    pub fn within(&self, other: &Interval) -> bool {
        self.lo >= other.lo && self.hi <= other.hi
    }

    pub fn contains(&self, v: &BigInt) -> bool {
        &self.lo <= v && v <= &self.hi
    }
}
