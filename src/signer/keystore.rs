use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use rand::RngCore;

use super::{Identity, KeyStore, KeystoreError, UnlockedIdentity};

/// Key store backed by a directory of V3 keystore files (scrypt +
/// AES-128-CTR), the same format geth and most wallets read.
///
/// Files are named `UTC--<timestamp>--<address>`, so sorting by name puts
/// accounts in creation order and keeps indexes stable.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
	dir: PathBuf,
}

impl FileKeyStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}
}

impl KeyStore for FileKeyStore {
	fn list_identities(&self) -> Result<Vec<Identity>, KeystoreError> {
		let mut found = Vec::new();
		if !self.dir.exists() {
			return Ok(found);
		}

		for entry in std::fs::read_dir(&self.dir)? {
			let path = entry?.path();
			if !path.is_file() {
				continue;
			}

			match address_of(&path) {
				Some(address) => found.push(Identity::new(address, path)),
				None => tracing::warn!(path = %path.display(), "skipping unreadable keystore file"),
			}
		}

		found.sort_by(|a, b| a.locator().file_name().cmp(&b.locator().file_name()));
		Ok(found)
	}

	fn create_identity(&self, secret: &str) -> Result<Identity, KeystoreError> {
		std::fs::create_dir_all(&self.dir)?;

		let mut rng = rand::thread_rng();
		let mut key = [0u8; 32];
		rng.fill_bytes(&mut key);
		let signer = PrivateKeySigner::from_slice(&key).map_err(|_| KeystoreError::InvalidKey)?;
		let address = signer.address();

		let name = file_name_for(&address);
		let written = eth_keystore::encrypt_key(&self.dir, &mut rng, key, secret, Some(&name));
		key.fill(0);
		written.map_err(|e| KeystoreError::Crypto(e.to_string()))?;

		let path = self.dir.join(&name);
		restrict_permissions(&path)?;

		tracing::info!(address = %address, "created keystore account");
		Ok(Identity::new(address, path))
	}

	fn unlock(&self, identity: &Identity, secret: &str) -> Result<UnlockedIdentity, KeystoreError> {
		let key = eth_keystore::decrypt_key(identity.locator(), secret).map_err(|e| match e {
			eth_keystore::KeystoreError::MacMismatch => {
				KeystoreError::WrongSecret(identity.address_string())
			}
			other => KeystoreError::Crypto(other.to_string()),
		})?;

		let signer = PrivateKeySigner::from_slice(&key).map_err(|_| KeystoreError::InvalidKey)?;
		UnlockedIdentity::new(identity.clone(), signer)
	}
}

// -- Helpers --

/// `UTC--2024-05-01T09-30-00.000000000Z--<lowercase hex address>`
fn file_name_for(address: &Address) -> String {
	let now = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S%.9fZ");
	format!("UTC--{now}--{}", hex::encode(address))
}

/// Address of a keystore file, from its geth-style name or, failing
/// that, the `address` field inside the JSON.
fn address_of(path: &Path) -> Option<Address> {
	let from_name = path
		.file_name()
		.and_then(|n| n.to_str())
		.and_then(|n| n.rsplit("--").next())
		.and_then(decode_address);
	if from_name.is_some() {
		return from_name;
	}

	let data = std::fs::read_to_string(path).ok()?;
	let json: serde_json::Value = serde_json::from_str(&data).ok()?;
	json.get("address")?.as_str().and_then(decode_address)
}

fn decode_address(text: &str) -> Option<Address> {
	let stripped = text.strip_prefix("0x").unwrap_or(text);
	let bytes = hex::decode(stripped).ok()?;
	(bytes.len() == 20).then(|| Address::from_slice(&bytes))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn create_then_unlock() {
		let dir = TempDir::new().unwrap();
		let store = FileKeyStore::new(dir.path());

		let identity = store.create_identity("hunter2").unwrap();
		assert!(identity.locator().exists());
		assert_ne!(identity.address(), Address::ZERO);

		let unlocked = store.unlock(&identity, "hunter2").unwrap();
		assert_eq!(unlocked.identity(), &identity);
	}

	#[test]
	fn wrong_secret_is_reported_as_such() {
		let dir = TempDir::new().unwrap();
		let store = FileKeyStore::new(dir.path());
		let identity = store.create_identity("correct").unwrap();

		assert!(matches!(
			store.unlock(&identity, "wrong"),
			Err(KeystoreError::WrongSecret(_))
		));
	}

	#[test]
	fn list_is_in_creation_order() {
		let dir = TempDir::new().unwrap();
		let store = FileKeyStore::new(dir.path());

		let first = store.create_identity("pw").unwrap();
		let second = store.create_identity("pw").unwrap();

		let listed = store.list_identities().unwrap();
		assert_eq!(listed, vec![first, second]);
	}

	#[test]
	fn list_skips_foreign_files_and_reads_json_address() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
		std::fs::create_dir(dir.path().join("nested")).unwrap();
		std::fs::write(
			dir.path().join("imported.json"),
			r#"{"address":"1111111111111111111111111111111111111111","crypto":{}}"#,
		)
		.unwrap();

		let listed = FileKeyStore::new(dir.path()).list_identities().unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].address(), Address::repeat_byte(0x11));
	}

	#[test]
	fn missing_directory_lists_nothing() {
		let store = FileKeyStore::new("/tmp/eth-manage-does-not-exist");
		assert!(store.list_identities().unwrap().is_empty());
	}

	#[test]
	fn file_name_embeds_address() {
		let addr = Address::repeat_byte(0xab);
		let name = file_name_for(&addr);
		assert!(name.starts_with("UTC--"));
		assert!(name.ends_with(&"ab".repeat(20)));
		assert_eq!(decode_address(name.rsplit("--").next().unwrap()), Some(addr));
	}

	#[cfg(unix)]
	#[test]
	fn key_files_are_private() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let identity = FileKeyStore::new(dir.path()).create_identity("pw").unwrap();
		let mode = std::fs::metadata(identity.locator()).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
	}
}
