//! Auth contexts and scoped tokens

mod lookup;
mod token;

pub use lookup::{AuthContext, AuthKey, AuthLookup, StaticAuthLookup};
pub use token::{bearer, resolve_token, TokenScope};
