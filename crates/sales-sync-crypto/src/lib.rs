pub mod secret;

pub use secret::{AeadSecretProvider, PlaintextSecretProvider, SecretProvider};
