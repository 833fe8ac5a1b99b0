//! User accounts and access tokens.
//!
//! - [`CredentialStore`]: signup and password login against stored argon2 hashes
//! - [`TokenService`]: stateless signed bearer tokens naming a username

mod credentials;
mod token;

pub use credentials::CredentialError;
pub use credentials::CredentialStore;
pub use credentials::User;
pub use credentials::UserId;
pub use token::TokenError;
pub use token::TokenService;
