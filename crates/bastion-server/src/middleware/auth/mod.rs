//! Authentication gate: bearer token to [`Identity`].

pub mod extractor;
pub mod jwt;
pub mod layer;
pub mod types;

pub use extractor::CurrentIdentity;
pub use jwt::{decode_token, encode_token, TokenDecoder};
pub use layer::{verify_token, AuthLayer, AuthMiddleware};
pub use types::{AuthRejection, Claims, Identity, TokenType};
