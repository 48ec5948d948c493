//! Keygen command - Prints a WireGuard key pair.
//!
//! Useful when bringing up a new gateway whose public key has to be
//! registered through the admin API.

use crate::cli::args::KeygenArgs;
use crate::domain::TunnelKeyPair;
use crate::errors::AppResult;

/// Execute the keygen command
pub async fn execute(args: KeygenArgs) -> AppResult<()> {
    let pair = match args.private_key {
        Some(encoded) => TunnelKeyPair::from_private_key(&encoded)?,
        None => TunnelKeyPair::generate(),
    };
    println!("PrivateKey = {}", pair.private_key());
    println!("PublicKey = {}", pair.public_key());
    Ok(())
}
