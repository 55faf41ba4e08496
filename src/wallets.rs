use crate::types::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use serde::Deserialize;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// An unlocked keystore account: the password checked out and the address was
/// read from the keystore file. Signing stays with the provider.
#[derive(Clone, Debug)]
pub struct UnlockedWallet {
    pub name: String,
    pub address: Address,
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".ethereum").join("keystore"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let entry = entry.wrap_err("Failed to read wallet entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy()))
}

#[derive(Deserialize)]
struct KeystoreFile {
    address: String,
}

/// Address recorded in the keystore JSON, without decrypting the key.
pub fn keystore_address(path: &Path) -> Result<Address> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read keystore {:?}", path))?;
    let keystore: KeystoreFile =
        serde_json::from_str(&raw).wrap_err("Keystore file is not valid JSON")?;
    Address::from_hex(&keystore.address)
        .map_err(|_| eyre!("Keystore {:?} holds an invalid address", path))
}

/// Prompt for the password and verify it against the keystore before handing
/// the address out as the operator account.
pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<UnlockedWallet> {
    let address = keystore_address(&descriptor.path)?;
    let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read wallet password")?;

    decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;

    Ok(UnlockedWallet {
        name: descriptor.name.clone(),
        address,
    })
}
