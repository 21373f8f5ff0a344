//! # Core Identities
//!
//! - **Peers**: `PeerId` names a ledger-hosting node (`peer0.org1.example.com`).
//! - **Organizations**: `MspId` names the membership service provider a peer
//!   or client belongs to.
//! - **Transactions**: `TransactionId` is the id a client submitted.
//! - **Validation**: `ValidationCode` is the verdict a peer reports for a
//!   committed transaction.

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, rejecting empty or blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(TypeError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identity of a peer node, unique within a channel.
    PeerId,
    "peer"
);

string_id!(
    /// Membership service provider id (one per organization).
    MspId,
    "msp"
);

string_id!(
    /// Id of a submitted transaction.
    TransactionId,
    "transaction"
);

string_id!(
    /// Name of a ledger channel.
    ChannelName,
    "channel"
);

/// Validation verdict reported by a peer for a committed transaction.
///
/// Peers emit the code as text. Only `VALID` means the transaction was
/// committed with effect; every other code is a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ValidationCode {
    Valid,
    EndorsementPolicyFailure,
    MvccReadConflict,
    PhantomReadConflict,
    BadPayload,
    DuplicateTxId,
    InvalidEndorserTransaction,
    /// Any code this crate does not name explicitly. Codes built through
    /// `From<&str>` never land here with a named wire value.
    Other(String),
}

impl ValidationCode {
    /// Whether the peer committed the transaction as valid.
    ///
    /// Decided on the wire name, so a hand-built `Other("VALID")` agrees
    /// with `Valid`.
    pub fn is_valid(&self) -> bool {
        self.as_str() == "VALID"
    }

    /// Re-map an `Other` carrying a named wire value onto its variant.
    pub fn normalized(self) -> Self {
        match self {
            ValidationCode::Other(code) => ValidationCode::from(code.as_str()),
            named => named,
        }
    }

    /// Wire name of the code.
    pub fn as_str(&self) -> &str {
        match self {
            ValidationCode::Valid => "VALID",
            ValidationCode::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            ValidationCode::MvccReadConflict => "MVCC_READ_CONFLICT",
            ValidationCode::PhantomReadConflict => "PHANTOM_READ_CONFLICT",
            ValidationCode::BadPayload => "BAD_PAYLOAD",
            ValidationCode::DuplicateTxId => "DUPLICATE_TXID",
            ValidationCode::InvalidEndorserTransaction => "INVALID_ENDORSER_TRANSACTION",
            ValidationCode::Other(code) => code,
        }
    }
}

impl From<&str> for ValidationCode {
    fn from(code: &str) -> Self {
        match code {
            "VALID" => ValidationCode::Valid,
            "ENDORSEMENT_POLICY_FAILURE" => ValidationCode::EndorsementPolicyFailure,
            "MVCC_READ_CONFLICT" => ValidationCode::MvccReadConflict,
            "PHANTOM_READ_CONFLICT" => ValidationCode::PhantomReadConflict,
            "BAD_PAYLOAD" => ValidationCode::BadPayload,
            "DUPLICATE_TXID" => ValidationCode::DuplicateTxId,
            "INVALID_ENDORSER_TRANSACTION" => ValidationCode::InvalidEndorserTransaction,
            other => ValidationCode::Other(other.to_string()),
        }
    }
}

impl From<String> for ValidationCode {
    fn from(code: String) -> Self {
        ValidationCode::from(code.as_str())
    }
}

impl From<ValidationCode> for String {
    fn from(code: ValidationCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
