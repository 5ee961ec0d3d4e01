//! Key material generated at test time.

use sequoia_openpgp as openpgp;

use openpgp::armor;
use openpgp::cert::{Cert, CertBuilder};
use openpgp::crypto::KeyPair;
use openpgp::packet::Signature;
use openpgp::packet::signature::SignatureBuilder;
use openpgp::parse::Parse;
use openpgp::serialize::{Serialize, SerializeInto};
use openpgp::types::SignatureType;
use openpgp::{Packet, PacketPile};

use crate::fingerprint::ExpectedFingerprint;

pub(crate) const ARTIFACT: &[u8] = b"hello-binary";

/// A certificate with a master key and one signing subkey.
pub(crate) fn generate(uid: &str) -> Cert {
    let (cert, _revocation) = CertBuilder::new()
        .add_userid(uid)
        .add_signing_subkey()
        .generate()
        .expect("generate certificate");
    cert
}

pub(crate) fn expected(cert: &Cert) -> ExpectedFingerprint {
    ExpectedFingerprint::parse(&cert.fingerprint().to_hex()).expect("valid fingerprint")
}

pub(crate) fn armored_public(cert: &Cert) -> Vec<u8> {
    cert.armored().to_vec().expect("serialize armored certificate")
}

pub(crate) fn binary_public(cert: &Cert) -> Vec<u8> {
    cert.to_vec().expect("serialize certificate")
}

/// Public packets of `cert` in serialization order.
pub(crate) fn public_packets(cert: &Cert) -> Vec<Packet> {
    PacketPile::from_bytes(&binary_public(cert))
        .expect("parse certificate packets")
        .into_children()
        .collect()
}

pub(crate) fn packet_block(packets: Vec<Packet>) -> Vec<u8> {
    let mut buf = Vec::new();
    for packet in packets {
        packet.serialize(&mut buf).expect("serialize packet");
    }
    buf
}

pub(crate) fn master_signer(cert: &Cert) -> KeyPair {
    cert.primary_key()
        .key()
        .clone()
        .parts_into_secret()
        .expect("secret master key")
        .into_keypair()
        .expect("master keypair")
}

pub(crate) fn subkey_signer(cert: &Cert) -> KeyPair {
    cert.keys()
        .subkeys()
        .secret()
        .next()
        .expect("secret subkey")
        .key()
        .clone()
        .into_keypair()
        .expect("subkey keypair")
}

pub(crate) fn sign(signer: &mut KeyPair, data: &[u8]) -> Signature {
    SignatureBuilder::new(SignatureType::Binary)
        .sign_message(signer, data)
        .expect("sign message")
}

pub(crate) fn armor_signatures(signatures: Vec<Signature>) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer =
        armor::Writer::new(&mut buf, armor::Kind::Signature).expect("armor writer");
    for sig in signatures {
        Packet::from(sig)
            .serialize(&mut writer)
            .expect("serialize signature");
    }
    writer.finalize().expect("finalize armor");
    buf
}

pub(crate) fn detached(signer: &mut KeyPair, data: &[u8]) -> Vec<u8> {
    armor_signatures(vec![sign(signer, data)])
}

/// `host`'s public packets followed by the subkey of `foreign` and the
/// binding signature `foreign`'s master key made for it.
pub(crate) fn block_with_foreign_subkey(host: &Cert, foreign: &Cert) -> Vec<u8> {
    let mut packets = public_packets(host);
    let mut foreign_packets = public_packets(foreign).into_iter();
    let subkey = foreign_packets
        .by_ref()
        .find(|p| matches!(p, Packet::PublicSubkey(_)))
        .expect("foreign subkey");
    packets.push(subkey);
    packets.extend(foreign_packets.take_while(|p| matches!(p, Packet::Signature(_))));
    packet_block(packets)
}

/// The first key signature of `cert` (a direct-key or user ID certification).
pub(crate) fn key_signature(cert: &Cert) -> Signature {
    public_packets(cert)
        .into_iter()
        .find_map(|p| match p {
            Packet::Signature(sig) => Some(sig),
            _ => None,
        })
        .expect("key signature")
}
