//! `a * b / c` over a 256-bit intermediate.
//!
//! Share conversions multiply two 18-decimal quantities, which overflows
//! `u128` long before either operand does.

const LOW: u128 = u64::MAX as u128;

/// Full 256-bit product of `a` and `b` as `(high, low)`.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW);
    let (b1, b0) = (b >> 64, b & LOW);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & LOW) + (p10 & LOW);
    let low = (p00 & LOW) | (mid << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// Divide the 256-bit `(high, low)` by `c`. Requires `high < c`.
fn narrowing_div(high: u128, low: u128, c: u128) -> (u128, u128) {
    let mut rem = high;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let spill = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        quotient <<= 1;
        if spill == 1 || rem >= c {
            rem = rem.wrapping_sub(c);
            quotient |= 1;
        }
    }
    (quotient, rem)
}

/// `a * b / c` as `(quotient, remainder)`. `None` if `c` is zero or the
/// quotient does not fit in `u128`.
pub fn mul_div_rem(a: u128, b: u128, c: u128) -> Option<(u128, u128)> {
    if c == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some((product / c, product % c));
    }
    let (high, low) = widening_mul(a, b);
    if high >= c {
        return None;
    }
    Some(narrowing_div(high, low, c))
}

/// `a * b / c`, floored. `None` if `c` is zero or the quotient does not
/// fit in `u128`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    mul_div_rem(a, b, c).map(|(q, _)| q)
}

/// `a * b / c`, rounded up.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Option<u128> {
    let (q, r) = mul_div_rem(a, b, c)?;
    if r == 0 {
        Some(q)
    } else {
        q.checked_add(1)
    }
}
