use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
	#[error("expected 0x followed by 40 hex characters")]
	Format,

	#[error("mixed-case address fails its EIP-55 checksum")]
	Checksum,
}

/// Parse a user-supplied `0x` address.
///
/// All-lowercase and all-uppercase hex is accepted as-is. Mixed case is
/// treated as an EIP-55 checksum and must verify, which catches most typos.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
	let input = input.trim();
	let hex_part = input
		.strip_prefix("0x")
		.or_else(|| input.strip_prefix("0X"))
		.ok_or(AddressError::Format)?;

	if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(AddressError::Format);
	}

	let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
	let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
	if has_lower && has_upper {
		return Address::parse_checksummed(format!("0x{hex_part}"), None)
			.map_err(|_| AddressError::Checksum);
	}

	hex_part.parse().map_err(|_| AddressError::Format)
}

/// EIP-55 rendering used everywhere an address is shown to the user.
pub fn checksummed(address: &Address) -> String {
	address.to_checksum(None)
}

#[cfg(test)]
mod tests {
	use super::*;

	const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

	#[test]
	fn accepts_checksummed_and_single_case() {
		let a = parse_address(VITALIK).unwrap();
		assert_eq!(parse_address(&VITALIK.to_lowercase()).unwrap(), a);
		let upper = format!("0x{}", &VITALIK[2..].to_uppercase());
		assert_eq!(parse_address(&upper).unwrap(), a);
		assert_eq!(checksummed(&a), VITALIK);
	}

	#[test]
	fn rejects_bad_checksum() {
		// Flip the case of one letter.
		let typo = VITALIK.replacen("dA", "Da", 1);
		assert_eq!(parse_address(&typo), Err(AddressError::Checksum));
	}

	#[test]
	fn rejects_malformed() {
		for bad in [
			"",
			"d8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
			"0x1234",
			"0xzz8dA6BF26964aF9D7eEd9e03E53415D37aA960",
			"0xd8dA6BF26964aF9D7eEd9e03E53415D37aA9604500",
		] {
			assert_eq!(parse_address(bad), Err(AddressError::Format), "{bad}");
		}
	}
}
