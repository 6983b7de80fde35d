use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::tx_builder::GasPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub network: NetworkConfig,
	pub keystore: KeystoreConfig,
	#[serde(default)]
	pub gas: GasPolicy,
	#[serde(default)]
	pub token: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	/// Network name substituted into the URL template (mainnet, sepolia, ...).
	pub name: String,
	/// Endpoint template with `{network}` and `{api_key}` placeholders.
	pub rpc_url_template: String,
	pub api_key: Option<String>,
	/// Full endpoint URL; takes precedence over the template.
	pub rpc_url: Option<String>,
	/// Chain id to sign for. Derived from `name` when unset.
	pub chain_id: Option<u64>,
	pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreConfig {
	pub dir: PathBuf,
	/// Unlock secret. Only ever read from the environment.
	#[serde(skip)]
	pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenConfig {
	/// JSON ABI to use instead of the built-in ERC-20 interface.
	pub abi_path: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			network: NetworkConfig {
				name: "mainnet".into(),
				rpc_url_template: "https://{network}.infura.io/v3/{api_key}".into(),
				api_key: None,
				rpc_url: None,
				chain_id: None,
				timeout_secs: 30,
			},
			keystore: KeystoreConfig {
				dir: Self::dir().unwrap_or_else(|_| PathBuf::from(".eth-manage")).join("keystore"),
				password: None,
			},
			gas: GasPolicy::default(),
			token: TokenConfig::default(),
		}
	}
}

impl Config {
	/// Directory where CLI state is stored (~/.eth-manage/).
	pub fn dir() -> anyhow::Result<PathBuf> {
		dirs::home_dir()
			.map(|home| home.join(".eth-manage"))
			.ok_or_else(|| anyhow!("could not determine home directory"))
	}

	/// Default path to the config file.
	pub fn path() -> anyhow::Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Load config from `path` (or the default location), falling back to
	/// defaults if no file exists, then apply environment overrides.
	pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
		Self::load_with(path, |key| std::env::var(key).ok())
	}

	/// [`Config::load`] with an explicit environment lookup.
	pub fn load_with(
		path: Option<&Path>,
		lookup: impl Fn(&str) -> Option<String>,
	) -> anyhow::Result<Self> {
		let path = match path {
			Some(p) => p.to_path_buf(),
			None => Self::path()?,
		};

		let mut config = if path.exists() {
			let content = std::fs::read_to_string(&path)
				.with_context(|| format!("reading {}", path.display()))?;
			toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
		} else {
			Self::default()
		};

		config.apply_env(lookup)?;
		Ok(config)
	}

	/// Persist the current config to `path`, creating the directory if
	/// needed. The unlock secret is never written.
	pub fn save(&self, path: &Path) -> anyhow::Result<()> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, toml::to_string_pretty(self)?)?;
		Ok(())
	}

	/// Overlay settings from environment variables. A `CHAIN_ID` that is
	/// neither decimal nor `0x` hex is an error.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		if let Some(dir) = get("KEYSTORE_DIR").or_else(|| get("KESTORE_DIR")) {
			self.keystore.dir = PathBuf::from(dir);
		}
		if let Some(key) = get("INFURA_KEY") {
			self.network.api_key = Some(key);
		}
		if let Some(name) = get("NETWORK") {
			self.network.name = name;
		}
		if let Some(url) = get("RPC_URL") {
			self.network.rpc_url = Some(url);
		}
		if let Some(id) = get("CHAIN_ID") {
			let parsed = parse_chain_id(&id).ok_or_else(|| anyhow!("invalid CHAIN_ID {id:?}"))?;
			self.network.chain_id = Some(parsed);
		}
		if let Some(password) = lookup("KEYSTORE_PASSWORD") {
			self.keystore.password = Some(password);
		}
		Ok(())
	}

	/// The node endpoint: explicit URL, or the template filled in.
	pub fn rpc_url(&self) -> anyhow::Result<String> {
		if let Some(url) = &self.network.rpc_url {
			return Ok(url.clone());
		}

		let template = &self.network.rpc_url_template;
		if template.contains("{api_key}") && self.network.api_key.is_none() {
			anyhow::bail!("no RPC endpoint: set INFURA_KEY or RPC_URL");
		}

		Ok(template
			.replace("{network}", &self.network.name)
			.replace("{api_key}", self.network.api_key.as_deref().unwrap_or_default()))
	}

	/// Chain id to sign for.
	pub fn chain_id(&self) -> anyhow::Result<u64> {
		if let Some(id) = self.network.chain_id {
			return Ok(id);
		}
		known_chain_id(&self.network.name).ok_or_else(|| {
			anyhow!(
				"unknown network {:?}: set CHAIN_ID or network.chain_id",
				self.network.name
			)
		})
	}

	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_secs(self.network.timeout_secs)
	}

	/// The unlock secret, required for anything that touches a key.
	pub fn password(&self) -> anyhow::Result<&str> {
		self.keystore
			.password
			.as_deref()
			.ok_or_else(|| anyhow!("KEYSTORE_PASSWORD is not set"))
	}
}

/// Load a `.env` file into the process environment: `path`, or the first
/// `.env` found from the working directory upwards. Variables already set
/// are kept. A missing file is not an error.
pub fn load_dotenv(path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
	let loaded = match path {
		Some(p) => dotenvy::from_path(p).map(|()| p.to_path_buf()),
		None => dotenvy::dotenv(),
	};
	match loaded {
		Ok(found) => {
			tracing::debug!(path = %found.display(), "loaded .env");
			Ok(Some(found))
		}
		Err(e) if e.not_found() => Ok(None),
		Err(e) => Err(anyhow::Error::new(e).context("reading .env")),
	}
}

fn parse_chain_id(text: &str) -> Option<u64> {
	let text = text.trim();
	match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
		Some(hex) => u64::from_str_radix(hex, 16).ok(),
		None => text.parse().ok(),
	}
}

fn known_chain_id(network: &str) -> Option<u64> {
	match network {
		"mainnet" => Some(1),
		"sepolia" => Some(11_155_111),
		"holesky" => Some(17_000),
		_ => None,
	}
}
