use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Elapsed simulation time in seconds, as Fixed64.
pub type Seconds = Fixed64;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/FFI, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Truncate a non-negative Fixed64 to whole units.
#[inline]
pub fn whole_units(v: Fixed64) -> u32 {
    v.to_num::<i64>().max(0) as u32
}

/// Tolerance used when testing whether a belt item has reached the end of
/// its segment. Well below any sane `min_spacing`.
#[inline]
pub fn head_epsilon() -> Fixed64 {
    Fixed64::from_num(1) >> 10
}
