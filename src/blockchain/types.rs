//! Chain-specific types and error definitions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// attoFIL per FIL.
pub const ATTO_PER_FIL: u128 = 1_000_000_000_000_000_000;

const FIL_DECIMALS: usize = 18;

/// Lowercase RFC 4648 base32 alphabet used by address payloads.
const BASE32_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz234567";

/// Errors parsing chain values from user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("invalid address '{input}': {reason}")]
    Address { input: String, reason: &'static str },

    #[error("invalid FIL value '{input}': {reason}")]
    Amount { input: String, reason: &'static str },
}

/// Network an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    fn prefix(self) -> char {
        match self {
            Network::Mainnet => 'f',
            Network::Testnet => 't',
        }
    }
}

/// Address protocol, the digit after the network prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressProtocol {
    Id,
    Secp256k1,
    Actor,
    Bls,
    Delegated,
}

impl AddressProtocol {
    fn from_digit(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Id),
            '1' => Some(Self::Secp256k1),
            '2' => Some(Self::Actor),
            '3' => Some(Self::Bls),
            '4' => Some(Self::Delegated),
            _ => None,
        }
    }

    fn digit(self) -> char {
        match self {
            Self::Id => '0',
            Self::Secp256k1 => '1',
            Self::Actor => '2',
            Self::Bls => '3',
            Self::Delegated => '4',
        }
    }

    /// Base32 length of payload plus checksum, where fixed.
    fn encoded_len(self) -> Option<usize> {
        match self {
            // 20-byte hash + 4-byte checksum
            Self::Secp256k1 | Self::Actor => Some(39),
            // 48-byte public key + 4-byte checksum
            Self::Bls => Some(84),
            Self::Id | Self::Delegated => None,
        }
    }
}

/// A Filecoin address in its string form.
///
/// Shape is validated (network, protocol, payload alphabet and length);
/// the checksum is left to the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    protocol: AddressProtocol,
    payload: String,
}

impl Address {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn protocol(&self) -> AddressProtocol {
        self.protocol
    }
}

fn is_base32(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| BASE32_ALPHABET.contains(c))
}

impl FromStr for Address {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ValueError::Address {
            input: s.to_string(),
            reason,
        };

        let mut chars = s.chars();
        let network = match chars.next() {
            Some('f') => Network::Mainnet,
            Some('t') => Network::Testnet,
            Some(_) => return Err(invalid("unknown network prefix")),
            None => return Err(invalid("empty address")),
        };
        let protocol = chars
            .next()
            .and_then(AddressProtocol::from_digit)
            .ok_or_else(|| invalid("unknown protocol"))?;
        let payload = chars.as_str();

        match protocol {
            AddressProtocol::Id => {
                if payload.is_empty() || !payload.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("id payload must be decimal"));
                }
                payload.parse::<u64>().map_err(|_| invalid("id out of range"))?;
            }
            AddressProtocol::Delegated => {
                let (namespace, sub) = payload.split_once('f').ok_or_else(|| invalid("missing namespace separator"))?;
                if namespace.is_empty() || !namespace.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("namespace must be decimal"));
                }
                if !is_base32(sub) {
                    return Err(invalid("payload must be base32"));
                }
            }
            other => {
                if !is_base32(payload) {
                    return Err(invalid("payload must be base32"));
                }
                if Some(payload.len()) != other.encoded_len() {
                    return Err(invalid("payload has wrong length"));
                }
            }
        }

        Ok(Self {
            network,
            protocol,
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.network.prefix(), self.protocol.digit(), self.payload)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Token amount in attoFIL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub fn from_atto(atto: u128) -> Self {
        Self(atto)
    }

    pub fn atto(&self) -> u128 {
        self.0
    }

    /// Parse a human FIL value: `"1.5"`, `"2 FIL"`, `"30 attofil"`.
    pub fn parse_fil(input: &str) -> Result<Self, ValueError> {
        let invalid = |reason| ValueError::Amount {
            input: input.to_string(),
            reason,
        };

        let lowered = input.trim().to_ascii_lowercase();
        let (number, atto) = if let Some(n) = lowered.strip_suffix("attofil") {
            (n.trim(), true)
        } else if let Some(n) = lowered.strip_suffix("fil") {
            (n.trim(), false)
        } else {
            (lowered.as_str(), false)
        };

        if number.is_empty() {
            return Err(invalid("empty value"));
        }
        if number.starts_with('-') {
            return Err(invalid("negative value"));
        }

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }

        let frac_digits = frac.trim_end_matches('0');
        if atto {
            if !frac_digits.is_empty() {
                return Err(invalid("attofil value must be an integer"));
            }
            let whole = if whole.is_empty() { "0" } else { whole };
            return whole.parse::<u128>().map(Self).map_err(|_| invalid("value too large"));
        }
        if frac_digits.len() > FIL_DECIMALS {
            return Err(invalid("more than 18 decimal places"));
        }

        let whole_atto = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .ok()
                .and_then(|w| w.checked_mul(ATTO_PER_FIL))
                .ok_or_else(|| invalid("value too large"))?
        };
        let frac_atto = if frac_digits.is_empty() {
            0
        } else {
            let scaled = format!("{:0<width$}", frac_digits, width = FIL_DECIMALS);
            scaled.parse::<u128>().map_err(|_| invalid("not a decimal number"))?
        };

        whole_atto
            .checked_add(frac_atto)
            .map(Self)
            .ok_or_else(|| invalid("value too large"))
    }

    /// Parse a plain attoFIL integer, as used for gas values.
    pub fn parse_atto(input: &str) -> Option<Self> {
        input.trim().parse::<u128>().ok().map(Self)
    }

    /// Render as FIL, e.g. `"1.5 FIL"`.
    pub fn to_fil_string(&self) -> String {
        let whole = self.0 / ATTO_PER_FIL;
        let frac = self.0 % ATTO_PER_FIL;
        if frac == 0 {
            return format!("{} FIL", whole);
        }
        let frac = format!("{:018}", frac);
        format!("{}.{} FIL", whole, frac.trim_end_matches('0'))
    }
}

/// Decimal attoFIL, the node's big-integer wire form.
impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenAmount::parse_atto(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid big integer '{}'", s)))
    }
}

/// Actor method selector. 0 is a plain value transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodNum(pub u64);

impl MethodNum {
    pub const SEND: MethodNum = MethodNum(0);
    pub const WITHDRAW_BALANCE: MethodNum = MethodNum(16);
}

impl From<u64> for MethodNum {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for MethodNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content identifier, `{"/": "<cid>"}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cid {
    #[serde(rename = "/")]
    root: String,
}

impl Cid {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.root
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)
    }
}

/// Method parameters in their encoded form, base64 on the wire.
///
/// Produced by the node and passed back to it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedParams(String);

impl EncodedParams {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
