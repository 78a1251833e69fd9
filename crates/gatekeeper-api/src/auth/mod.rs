//! Authentication and authorization
//!
//! - `jwt`: token issuance and validation
//! - `password`: Argon2id credential hashing
//! - `service`: login, registration and lookup
//! - `middleware`: token gate, role gate and the `Identity` extractor

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{token_ttl_secs, Claims, TokenCodec, TokenError};
pub use middleware::{extract_bearer_token, require_auth, require_roles, Identity};
pub use password::{Argon2Hasher, CredentialHasher, PasswordConfig, PasswordError};
pub use service::{AuthError, AuthService, LoginRequest, RegisterRequest, UpdateUserRequest};
