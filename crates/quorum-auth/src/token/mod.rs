//! Token issuing and verification.

pub mod jwt;

pub use jwt::{
    HmacAlgorithm, JwtError, JwtService, SigningKey, TokenClaims, TokenClaimsBuilder,
    TokenDecoder, TokenPair, TokenType,
};
