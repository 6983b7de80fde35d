use alloy::primitives::U256;
use thiserror::Error;

/// Decimal places of the native coin (1 ETH = 10^18 wei).
pub const NATIVE_DECIMALS: u8 = 18;

/// Highest decimal count accepted by the converter. 10^77 is the largest
/// power of ten that still fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	#[error("amount is empty")]
	Empty,

	#[error("not a non-negative decimal number")]
	Malformed,

	#[error("too many decimal places: got {got}, max {max}")]
	TooPrecise { got: usize, max: u8 },

	#[error("amount does not fit in 256 bits")]
	Overflow,

	#[error("unsupported decimal count {0}")]
	UnsupportedDecimals(u8),
}

/// Convert a human-readable amount such as `"0.1"` into base units.
///
/// Inputs with more fractional digits than `decimals` are rejected instead
/// of being rounded: `to_base_units("0.0000001", 6)` is an error.
pub fn to_base_units(human: &str, decimals: u8) -> Result<U256, AmountError> {
	if decimals > MAX_DECIMALS {
		return Err(AmountError::UnsupportedDecimals(decimals));
	}

	let human = human.trim();
	if human.is_empty() {
		return Err(AmountError::Empty);
	}

	let (integer, fractional) = match human.split_once('.') {
		Some((i, f)) => (i, f),
		None => (human, ""),
	};

	// "1." and ".5" are accepted, a lone "." is not.
	if integer.is_empty() && fractional.is_empty() {
		return Err(AmountError::Malformed);
	}
	let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
	if !all_digits(integer) || !all_digits(fractional) {
		return Err(AmountError::Malformed);
	}

	// Trailing zeros carry no precision, so "1.500" is fine at 1 decimal.
	let significant = fractional.trim_end_matches('0');
	if significant.len() > decimals as usize {
		return Err(AmountError::TooPrecise {
			got: significant.len(),
			max: decimals,
		});
	}

	let padded = format!("{significant:0<width$}", width = decimals as usize);
	let combined = format!("{integer}{padded}");
	let combined = combined.trim_start_matches('0');
	if combined.is_empty() {
		return Ok(U256::ZERO);
	}

	U256::from_str_radix(combined, 10).map_err(|_| AmountError::Overflow)
}

/// Render a base-unit amount with exactly `decimals` fractional digits.
///
/// `from_base_units(U256::from(1_500_000u64), 6) == "1.500000"`.
pub fn from_base_units(amount: U256, decimals: u8) -> String {
	let digits = amount.to_string();
	let decimals = decimals as usize;
	if decimals == 0 {
		return digits;
	}

	let padded = format!("{digits:0>width$}", width = decimals + 1);
	let (integer, fractional) = padded.split_at(padded.len() - decimals);
	format!("{integer}.{fractional}")
}
