//! Addresses, declaration locations, and storage paths.

use std::fmt::{Display, Formatter, Result};

/// An 8-byte account address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub const ZERO: Address = Address([0; 8]);

    pub fn from_u64(value: u64) -> Self {
        Address(value.to_be_bytes())
    }

    pub fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Where a declaration lives: an on-chain contract, a transient program, or
/// the predefined standard library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// A contract deployed at an account address.
    Address { address: Address, name: String },
    /// A transient script or transaction, keyed by an opaque identifier.
    Script(String),
    /// A named transient location (e.g. the `Test` contract).
    Identifier(String),
    /// Predeclared standard-library declarations.
    Stdlib,
}

impl Location {
    /// The stable prefix used in type identifier strings.
    pub fn id(&self) -> String {
        match self {
            Location::Address { address, name } => {
                let mut hex = String::with_capacity(16);
                for byte in address.0 {
                    hex.push_str(&format!("{byte:02x}"));
                }
                format!("A.{hex}.{name}")
            }
            Location::Script(identifier) => format!("s.{identifier}"),
            Location::Identifier(identifier) => format!("I.{identifier}"),
            Location::Stdlib => "flow".to_string(),
        }
    }

    /// The full type identifier of a declaration qualified under this
    /// location.
    pub fn type_id(&self, qualified_identifier: &str) -> String {
        format!("{}.{}", self.id(), qualified_identifier)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.id())
    }
}

/// User-visible storage path domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathDomain {
    Storage,
    Public,
    Private,
}

impl PathDomain {
    pub fn identifier(self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Public => "public",
            PathDomain::Private => "private",
        }
    }
}

impl Display for PathDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.identifier())
    }
}

/// An address-relative storage key, `/domain/identifier`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    pub domain: PathDomain,
    pub identifier: String,
}

impl Path {
    pub fn new(domain: PathDomain, identifier: impl Into<String>) -> Self {
        Self {
            domain,
            identifier: identifier.into(),
        }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "/{}/{}", self.domain, self.identifier)
    }
}

/// A path together with the account it refers into. Used as the lookup key
/// of the capability migration side tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressPath {
    pub address: Address,
    pub path: Path,
}

impl AddressPath {
    pub fn new(address: Address, path: Path) -> Self {
        Self { address, path }
    }
}

impl Display for AddressPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{}", self.address, self.path)
    }
}
