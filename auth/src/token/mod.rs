pub mod claims;
pub mod errors;
pub mod issuer;

pub use claims::Role;
pub use claims::TokenClaims;
pub use claims::TokenType;
pub use errors::TokenError;
pub use issuer::TokenIssuer;
pub use issuer::TokenPair;
