//! Example: Inspect a trust anchor and optionally verify an artifact
//!
//! Run with:
//!   cargo run --example inspect_anchor -- <fingerprint> <key.asc> [artifact]
//!
//! The detached signature is read from `<artifact>.asc`.

use std::path::PathBuf;

use artifact_verify::{
    ExpectedFingerprint, KeyInfo, KeySource, TrustAnchor, Verifier, parse_key_ring,
    signature_path, validate_subkeys,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> artifact_verify::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(fingerprint), Some(key_path)) = (args.next(), args.next()) else {
        eprintln!("usage: inspect_anchor <fingerprint> <key.asc> [artifact]");
        std::process::exit(2);
    };
    let artifact_path = args.next().map(PathBuf::from);

    let expected = ExpectedFingerprint::parse(&fingerprint)?;
    let key_block = tokio::fs::read(&key_path).await?;

    let ring = parse_key_ring(&key_block, &expected)?;
    let validated = validate_subkeys(&ring)?;

    println!("Anchor {} ({} validated keys)\n", expected, validated.len());
    for key in ring.keys() {
        println!("{}", format_key_output(&key));
    }

    let Some(artifact_path) = artifact_path else {
        return Ok(());
    };

    let artifact = tokio::fs::read(&artifact_path).await?;
    let signature = tokio::fs::read(signature_path(&artifact_path)).await?;

    let anchor = TrustAnchor::new(&fingerprint, KeySource::bytes(key_block))?;
    let outcome = Verifier::new([anchor])?.verify(artifact, signature).await;

    println!("\n{}: {}", artifact_path.display(), outcome);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn format_key_output(key: &KeyInfo) -> String {
    let marker = if key.is_master { "[M]" } else { "[S]" };
    let created = key
        .created
        .map(|d| format!(" created {}", d))
        .unwrap_or_default();

    format!(
        "{} {} {}{}\n    {}",
        marker, &key.fingerprint, key.algorithm, created, key.user_id
    )
}
