use std::path::{Path, PathBuf};

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::Bytes;
use thiserror::Error;

/// ERC-20 interface shipped with the binary.
pub const ERC20_ABI: &str = include_str!("../abi/erc20.json");

#[derive(Debug, Error)]
pub enum AbiError {
	#[error("malformed contract interface: {0}")]
	MalformedInterface(String),

	#[error("contract interface has no function named `{0}`")]
	UnknownFunction(String),

	#[error("arguments do not match any `{name}` signature: {reason}")]
	ArgumentMismatch { name: String, reason: String },

	#[error("could not decode `{name}` data: {reason}")]
	Decode { name: String, reason: String },
}

/// Where a token contract's interface description comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InterfaceSource {
	/// The ERC-20 ABI compiled into the binary.
	#[default]
	BuiltinErc20,
	/// A JSON ABI file on disk.
	File(PathBuf),
}

impl InterfaceSource {
	pub fn from_path(path: Option<&Path>) -> Self {
		match path {
			Some(p) => Self::File(p.to_path_buf()),
			None => Self::BuiltinErc20,
		}
	}

	/// Read the raw interface bytes.
	pub fn read(&self) -> std::io::Result<Vec<u8>> {
		match self {
			Self::BuiltinErc20 => Ok(ERC20_ABI.as_bytes().to_vec()),
			Self::File(path) => std::fs::read(path),
		}
	}
}

/// A parsed contract interface. Immutable once loaded, so a single
/// instance can be shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ContractInterface {
	abi: JsonAbi,
}

impl ContractInterface {
	/// Parse a JSON ABI document.
	pub fn load(source: &[u8]) -> Result<Self, AbiError> {
		let abi: JsonAbi = serde_json::from_slice(source)
			.map_err(|e| AbiError::MalformedInterface(e.to_string()))?;
		Ok(Self { abi })
	}

	/// Encode a call as `selector || abi-encoded arguments`.
	///
	/// With overloaded functions, the first overload whose parameter
	/// types accept `args` wins.
	pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes, AbiError> {
		let function = self.resolve_overload(name, args)?;
		let data = function
			.abi_encode_input(args)
			.map_err(|e| AbiError::ArgumentMismatch {
				name: name.to_owned(),
				reason: e.to_string(),
			})?;
		Ok(Bytes::from(data))
	}

	/// Decode the return data of a call to `name`.
	pub fn decode_result(&self, name: &str, data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
		let overloads = self.overloads(name)?;

		let mut last_err = None;
		for function in overloads {
			match function.abi_decode_output(data) {
				Ok(values) => return Ok(values),
				Err(e) => last_err = Some(e.to_string()),
			}
		}

		Err(AbiError::Decode {
			name: name.to_owned(),
			reason: last_err.unwrap_or_else(|| "no outputs".into()),
		})
	}

	/// Decode call-data back into the function name and its arguments.
	pub fn decode_call(&self, data: &[u8]) -> Result<(String, Vec<DynSolValue>), AbiError> {
		let decode_err = |reason: String| AbiError::Decode {
			name: "call".into(),
			reason,
		};

		if data.len() < 4 {
			return Err(decode_err(format!(
				"call-data is {} bytes, shorter than a selector",
				data.len()
			)));
		}
		let (selector, body) = data.split_at(4);

		let function = self
			.abi
			.functions()
			.find(|f| f.selector().as_slice() == selector)
			.ok_or_else(|| decode_err(format!("unknown selector 0x{}", hex::encode(selector))))?;

		let values = function.abi_decode_input(body).map_err(|e| AbiError::Decode {
			name: function.name.clone(),
			reason: e.to_string(),
		})?;

		Ok((function.name.clone(), values))
	}

	/// Canonical signature of the first function called `name`,
	/// e.g. `transfer(address,uint256)`.
	pub fn signature(&self, name: &str) -> Result<String, AbiError> {
		Ok(self.overloads(name)?[0].signature())
	}

	fn overloads(&self, name: &str) -> Result<&[Function], AbiError> {
		match self.abi.function(name) {
			Some(list) if !list.is_empty() => Ok(list.as_slice()),
			_ => Err(AbiError::UnknownFunction(name.to_owned())),
		}
	}

	fn resolve_overload(&self, name: &str, args: &[DynSolValue]) -> Result<&Function, AbiError> {
		let overloads = self.overloads(name)?;

		overloads
			.iter()
			.find(|f| accepts(f, args))
			.ok_or_else(|| AbiError::ArgumentMismatch {
				name: name.to_owned(),
				reason: format!(
					"got {} argument(s), expected one of: {}",
					args.len(),
					overloads
						.iter()
						.map(Function::signature)
						.collect::<Vec<_>>()
						.join(", ")
				),
			})
	}
}

/// Whether `args` fits the parameter list of `function` in arity and type.
fn accepts(function: &Function, args: &[DynSolValue]) -> bool {
	function.inputs.len() == args.len()
		&& function.inputs.iter().zip(args).all(|(param, value)| {
			param
				.resolve()
				.map(|ty| ty.matches(value))
				.unwrap_or(false)
		})
}
