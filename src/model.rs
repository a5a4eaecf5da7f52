//! Lossy rounding and the model-update recursion shared by the forward and
//! inverse pre-processors (C6/C7).
//!
//! The legacy bodies for these (`cmp_cal_up_model.h`) are not present in
//! the retrieved source; both are implemented here exactly per the
//! round-trip formulas they must satisfy: `round_inv(round_fwd(x, r), r)`
//! restores `x` with its low `r` bits zeroed, and `cal_up_model` combines a
//! sample and its prior model into the next model with the stated weighted
//! average.

/// Maximum accepted `lossy_par` (right-shift amount).
pub const MAX_LOSSY_ROUND: u8 = 3;

/// Maximum accepted `model_value` weighting parameter.
pub const MAX_MODEL_VALUE: u8 = 16;

/// Shift width of the `model_value` weighted average.
const MODEL_VALUE_SHIFT: u32 = 4;

/// Forward lossy rounding: right-shifts `x` by `round` bits. A no-op when
/// `round == 0`.
pub fn round_fwd(x: u32, round: u8) -> u32 {
    if round == 0 {
        x
    } else {
        x >> round
    }
}

/// Inverse of [`round_fwd`]: left-shifts back by `round` bits. The low
/// `round` bits lost in [`round_fwd`] are not recovered; this is exactly
/// the lossy step.
pub fn round_inv(x: u32, round: u8) -> u32 {
    if round == 0 {
        x
    } else {
        x << round
    }
}

/// Computes the next model value from a decoded/encoded sample `data` and
/// the prior model `model`, weighted by `model_value` (`0..=16`):
///
/// `new_model = (((1 << 4) - model_value) * data + model_value * model) >> 4`
///
/// `model_value == 0` means "ignore the prior model" (new_model == data);
/// `model_value == 16` means "never update" (new_model == model).
pub fn update_model(data: u32, model: u32, model_value: u8) -> u32 {
    debug_assert!(model_value as u32 <= 1u32 << MODEL_VALUE_SHIFT);
    let weight_data = (1u64 << MODEL_VALUE_SHIFT) - model_value as u64;
    let weight_model = model_value as u64;
    let combined = weight_data * data as u64 + weight_model * model as u64;
    (combined >> MODEL_VALUE_SHIFT) as u32
}
