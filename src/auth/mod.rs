//! Authentication module for request signing
//!
//! This module provides:
//! - Credential discovery (environment variables, shared credentials file)
//! - Signature Version 4 request signing

mod credentials;
pub mod sigv4;

pub use credentials::{
    AwsCredentials, CredentialChain, EnvironmentProvider, ProfileProvider, ProvideCredentials,
    StaticProvider,
};
pub use sigv4::{SignedHeaders, Signer};
