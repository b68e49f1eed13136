//! Strongly typed identifiers enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 256;
const SESSION_ID_LEN: usize = 32;

/// Tenant domain used when a username carries no `@domain` suffix.
pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, username, session, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant, username, session, provider).
		kind: &'static str,
	},
	/// The identifier contains a character outside its permitted alphabet.
	#[error("{kind} identifier contains disallowed character {character:?}.")]
	DisallowedCharacter {
		/// Kind of identifier (tenant, username, session, provider).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant, username, session, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { TenantId, "Tenant domain that scopes derived client credentials.", "Tenant", validate_view }
def_id! {
	Username,
	"End-user login name, optionally suffixed with `@tenant-domain`; any non-empty string.",
	"Username",
	validate_present
}
def_id! {
	SessionId,
	"Opaque identifier of one end-user session, restricted to `[A-Za-z0-9._-]`.",
	"Session",
	validate_session
}
def_id! { ProviderId, "Identifier for an authorization server descriptor.", "Provider", validate_view }

impl Username {
	/// Resolves the tenant domain encoded in the username.
	///
	/// `alice@acme.com` belongs to `acme.com`; a bare `alice` belongs to
	/// [`SUPER_TENANT_DOMAIN`]. The last `@` wins so e-mail style usernames keep working.
	pub fn tenant(&self) -> TenantId {
		match self.0.rsplit_once('@') {
			Some((_, domain)) if !domain.is_empty() => TenantId(domain.to_owned()),
			_ => TenantId(SUPER_TENANT_DOMAIN.to_owned()),
		}
	}
}

impl SessionId {
	/// Mints a random alphanumeric session identifier.
	pub fn random() -> Self {
		Self(rand::rng().sample_iter(Alphanumeric).take(SESSION_ID_LEN).map(char::from).collect())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

fn validate_present(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() { Err(IdentifierError::Empty { kind }) } else { Ok(()) }
}

// Session ids become file names: no separators, no dot-only names.
fn validate_session(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	if let Some(character) =
		view.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
	{
		return Err(IdentifierError::DisallowedCharacter { kind, character });
	}
	if view.chars().all(|c| c == '.') {
		return Err(IdentifierError::DisallowedCharacter { kind, character: '.' });
	}

	Ok(())
}
