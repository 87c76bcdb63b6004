//! Modular arithmetic helpers over Z_q and Z_t

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = (a as u128) + (b as u128);
        (sum % (q as u128)) as u64
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Compute base^exp mod m by square-and-multiply
    pub fn pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64 % m;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, m);
            }
            exp >>= 1;
            base = Self::mul(base, base, m);
        }
        result
    }
}
