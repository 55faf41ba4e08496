use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::fmt;
use thiserror::Error;

pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Amounts are denominated in wei throughout; only display code converts to ether.
pub type Wei = u128;

/// 20-byte account identifier. Comparing parsed addresses makes the comparison
/// case-insensitive with respect to the hex strings they came from.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

#[derive(Debug, Error)]
#[error("invalid address {0:?}")]
pub struct AddressParseError(String);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_hex(raw: &str) -> Result<Self, AddressParseError> {
        let stripped = raw.strip_prefix("0x").unwrap_or(raw);
        let bytes =
            hex::decode(stripped).map_err(|_| AddressParseError(raw.to_owned()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError(raw.to_owned()))?;
        Ok(Address(bytes))
    }

    /// `0x1234...abcd` form for display in tight spaces.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
#[error("invalid ether amount {0:?}")]
pub struct AmountParseError(String);

/// Render a wei amount in ether, trimming trailing zeroes ("0.05", "1", "1.5").
pub fn format_eth(wei: Wei) -> String {
    let whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse an ether-denominated decimal string ("0.01", "2", "1.5") into wei.
pub fn parse_eth(raw: &str) -> Result<Wei, AmountParseError> {
    let err = || AmountParseError(raw.to_owned());
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(err());
    }
    if frac.len() > 18 {
        return Err(err());
    }
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| err())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<18}");
        padded.parse().map_err(|_| err())?
    };
    whole
        .checked_mul(WEI_PER_ETH)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(err)
}

/// Human name for a chain id, matching what wallets display.
pub fn network_name(chain_id: u64) -> String {
    match chain_id {
        1 => String::from("Ethereum Mainnet"),
        5 => String::from("Goerli Testnet"),
        11_155_111 => String::from("Sepolia Testnet"),
        31_337 => String::from("Local Devnet"),
        other => format!("Chain ID: {other}"),
    }
}

/// Push events emitted by the lottery ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PlayerEntered { player: Address, amount: Wei },
    CountdownStarted { seconds_until_draw: u64 },
    RoundStarted,
    RoundEnded { winner: Address, amount: Wei },
}

/// The four mutating actions a client can submit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Start,
    PickWinner,
    Fund,
    Enter,
}

impl RequestKind {
    pub fn progress_message(&self) -> &'static str {
        match self {
            RequestKind::Start => "Starting lottery...",
            RequestKind::PickWinner => "Picking a winner...",
            RequestKind::Fund => "Sending funds to the contract...",
            RequestKind::Enter => "Entering lottery...",
        }
    }

    pub fn failure_prefix(&self) -> &'static str {
        match self {
            RequestKind::Start => "Failed to start lottery",
            RequestKind::PickWinner => "Failed to pick winner",
            RequestKind::Fund => "Failed to fund contract",
            RequestKind::Enter => "Failed to enter lottery",
        }
    }
}
