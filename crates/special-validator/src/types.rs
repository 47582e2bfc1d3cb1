//! Core types: addresses, consensus keys, coins and the special validator record

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Consensus voting power
pub type Power = u64;

/// Token amount (base units)
pub type Amount = u128;

/// Length of every address kind in bytes
pub const ADDRESS_LEN: usize = 20;

/// Bech32 prefix of account addresses
pub const BECH32_PREFIX_ACC_ADDR: &str = "xpla";

/// Bech32 prefix of validator operator addresses
pub const BECH32_PREFIX_VAL_ADDR: &str = "xplavaloper";

/// Bech32 prefix of consensus node addresses
pub const BECH32_PREFIX_CONS_ADDR: &str = "xplavalcons";

/// Address decoding errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid bech32: {0}")]
    InvalidBech32(String),

    #[error("invalid bech32 prefix: expected {expected}, got {got}")]
    WrongPrefix { expected: &'static str, got: String },

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

fn address_bytes(bytes: &[u8]) -> Result<[u8; ADDRESS_LEN], AddressError> {
    bytes.try_into().map_err(|_| AddressError::InvalidLength {
        expected: ADDRESS_LEN,
        got: bytes.len(),
    })
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $hrp:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name([u8; ADDRESS_LEN]);

        impl $name {
            /// Bech32 human-readable part
            pub const HRP: &'static str = $hrp;

            pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
                &self.0
            }

            /// Parse from hex, with or without a `0x` prefix
            pub fn from_hex(s: &str) -> Result<Self, AddressError> {
                let s = s.trim();
                let s = s.strip_prefix("0x").unwrap_or(s);
                if s.is_empty() {
                    return Err(AddressError::Empty);
                }

                let bytes = hex::decode(s)?;
                Ok(Self(address_bytes(&bytes)?))
            }

            /// Parse a bech32 string carrying this address kind's prefix
            pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(AddressError::Empty);
                }

                let (hrp, bytes) =
                    bech32::decode(s).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;
                let got = hrp.to_string();
                if !got.eq_ignore_ascii_case(Self::HRP) {
                    return Err(AddressError::WrongPrefix {
                        expected: Self::HRP,
                        got,
                    });
                }
                Ok(Self(address_bytes(&bytes)?))
            }

            pub fn to_bech32(&self) -> String {
                self.to_string()
            }
        }

        /// Bech32 by default; `0x`-prefixed hex is also accepted
        impl FromStr for $name {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim_start().starts_with("0x") {
                    Self::from_hex(s)
                } else {
                    Self::from_bech32(s)
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = AddressError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(addr: $name) -> String {
                addr.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let hrp = bech32::Hrp::parse_unchecked(Self::HRP);
                bech32::encode_lower_to_fmt::<bech32::Bech32, _>(f, hrp, &self.0)
                    .map_err(|_| fmt::Error)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

address_type!(
    /// Validator operator address
    ValAddress,
    BECH32_PREFIX_VAL_ADDR
);

address_type!(
    /// Account address (delegators, community pool funders)
    AccAddress,
    BECH32_PREFIX_ACC_ADDR
);

address_type!(
    /// Consensus address, derived from the consensus public key
    ConsAddress,
    BECH32_PREFIX_CONS_ADDR
);

impl From<ValAddress> for AccAddress {
    fn from(addr: ValAddress) -> Self {
        AccAddress(addr.0)
    }
}

impl From<AccAddress> for ValAddress {
    fn from(addr: AccAddress) -> Self {
        ValAddress(addr.0)
    }
}

/// Signature scheme of a validator's consensus key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1,
    Sr25519,
}

/// Consensus public key as stored by staking (algorithm tag + raw bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    pub algorithm: KeyAlgorithm,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl PublicKey {
    pub fn ed25519(bytes: [u8; 32]) -> Self {
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            bytes: bytes.to_vec(),
        }
    }

    /// Consensus address: first 20 bytes of sha256(pubkey)
    pub fn address(&self) -> ConsAddress {
        let digest = Sha256::digest(&self.bytes);
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&digest[..ADDRESS_LEN]);
        ConsAddress(addr)
    }

    /// Convert into the key form the consensus engine accepts
    pub fn to_consensus_key(&self) -> Result<ConsensusKey, KeyError> {
        ConsensusKey::try_from(self)
    }
}

/// Consensus key conversion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key algorithm {0:?} not supported by consensus")]
    UnsupportedAlgorithm(KeyAlgorithm),

    #[error("invalid {algorithm:?} key length: expected {expected}, got {got}")]
    InvalidLength {
        algorithm: KeyAlgorithm,
        expected: usize,
        got: usize,
    },
}

/// Public key carried by validator-set update messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsensusKey {
    Ed25519([u8; 32]),
    Secp256k1([u8; 33]),
}

impl TryFrom<&PublicKey> for ConsensusKey {
    type Error = KeyError;

    fn try_from(pk: &PublicKey) -> Result<Self, Self::Error> {
        let invalid = |expected| KeyError::InvalidLength {
            algorithm: pk.algorithm,
            expected,
            got: pk.bytes.len(),
        };

        match pk.algorithm {
            KeyAlgorithm::Ed25519 => pk
                .bytes
                .as_slice()
                .try_into()
                .map(ConsensusKey::Ed25519)
                .map_err(|_| invalid(32)),
            KeyAlgorithm::Secp256k1 => pk
                .bytes
                .as_slice()
                .try_into()
                .map(ConsensusKey::Secp256k1)
                .map_err(|_| invalid(33)),
            other => Err(KeyError::UnsupportedAlgorithm(other)),
        }
    }
}

impl fmt::Display for ConsensusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusKey::Ed25519(k) => write!(f, "ed25519:{}", hex::encode(k)),
            ConsensusKey::Secp256k1(k) => write!(f, "secp256k1:{}", hex::encode(k)),
        }
    }
}

/// Validator-set update message handed to the consensus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorUpdate {
    pub pub_key: ConsensusKey,
    pub power: Power,
}

impl fmt::Display for ValidatorUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} power={}", self.pub_key, self.power)
    }
}

/// Single-denomination token amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Denominations are 3-128 chars, start with a letter, then `[a-zA-Z0-9/:._-]`
    pub fn is_valid(&self) -> bool {
        let len = self.denom.len();
        let mut chars = self.denom.chars();
        (3..=128).contains(&len)
            && chars.next().map_or(false, |c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Multi-denomination amount, one entry per denom
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| c.amount == 0)
    }

    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map_or(0, |c| c.amount)
    }

    pub fn add(&mut self, coin: Coin) {
        match self.0.iter_mut().find(|c| c.denom == coin.denom) {
            Some(existing) => existing.amount = existing.amount.saturating_add(coin.amount),
            None => {
                self.0.push(coin);
                self.0.sort_by(|a, b| a.denom.cmp(&b.denom));
            }
        }
    }

    pub fn merge(&mut self, other: Coins) {
        for coin in other.0 {
            self.add(coin);
        }
    }

    /// `self - other`, or `None` if any denom would go negative
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut result = self.clone();
        for coin in &other.0 {
            let entry = result.0.iter_mut().find(|c| c.denom == coin.denom);
            match entry {
                Some(c) if c.amount >= coin.amount => c.amount -= coin.amount,
                _ if coin.amount == 0 => {}
                _ => return None,
            }
        }
        result.0.retain(|c| c.amount > 0);
        Some(result)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        let mut coins = Coins::new();
        coins.add(coin);
        coins
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// A governance-admitted validator and the power this module last reported for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialValidator {
    /// Operator address (store key)
    pub address: ValAddress,

    /// Power the consensus engine holds for this validator via this module (0 = none)
    pub power: Power,

    /// Unregistration requested; remove once live power reaches zero
    pub is_deleting: bool,
}

impl SpecialValidator {
    /// Freshly admitted record
    pub fn new(address: ValAddress) -> Self {
        Self {
            address,
            power: 0,
            is_deleting: false,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
