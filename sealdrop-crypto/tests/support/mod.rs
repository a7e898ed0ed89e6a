//! Shared fixtures for integration tests.
//!
//! RSA generation dominates test time, so identities are generated once per
//! test binary at the 2048-bit floor and handed out in sealed form.
#![allow(dead_code)]

use sealdrop_crypto::keypair::MIN_MODULUS_BITS;
use sealdrop_crypto::vault;
use sealdrop_crypto::{
    IdentityKeypair, IdentityPrivateKey, IdentityPublicKey, OsProvider, SealAlgorithm,
    SealedPrivateKey,
};
use std::sync::OnceLock;

pub const PASSPHRASE: &str = "correct-horse-battery-staple-quantum-cipher";

pub struct Fixture {
    pub public: IdentityPublicKey,
    pub sealed: SealedPrivateKey,
}

impl Fixture {
    /// Unseals a fresh private key handle for this identity.
    pub fn private(&self) -> IdentityPrivateKey {
        vault::unseal(&OsProvider, &self.sealed, PASSPHRASE).expect("fixture must unseal")
    }
}

fn generate() -> Fixture {
    let (public, private) = IdentityKeypair::generate(&OsProvider, MIN_MODULUS_BITS)
        .expect("keygen must succeed")
        .into_parts();
    let sealed = vault::seal(&OsProvider, private, PASSPHRASE, SealAlgorithm::default())
        .expect("seal must succeed");
    Fixture { public, sealed }
}

/// Identity "alice" (the owner in sharing tests).
pub fn alice() -> &'static Fixture {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    CELL.get_or_init(generate)
}

/// Identity "bob".
pub fn bob() -> &'static Fixture {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    CELL.get_or_init(generate)
}

/// Identity "carol".
pub fn carol() -> &'static Fixture {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    CELL.get_or_init(generate)
}
