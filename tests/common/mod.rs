#![allow(dead_code)]

use sequoia_openpgp as openpgp;

use openpgp::armor;
use openpgp::cert::{Cert, CertBuilder};
use openpgp::crypto::KeyPair;
use openpgp::packet::signature::SignatureBuilder;
use openpgp::serialize::{Serialize, SerializeInto};
use openpgp::types::SignatureType;
use openpgp::Packet;

use artifact_verify::{KeySource, TrustAnchor};

pub const ARTIFACT: &[u8] = b"hello-binary";

/// A release identity: master key plus one signing subkey.
pub struct Release {
    pub cert: Cert,
}

impl Release {
    pub fn generate(uid: &str) -> Self {
        let (cert, _) = CertBuilder::new()
            .add_userid(uid)
            .add_signing_subkey()
            .generate()
            .expect("generate certificate");
        Self { cert }
    }

    pub fn fingerprint(&self) -> String {
        self.cert.fingerprint().to_spaced_hex()
    }

    pub fn public_key_block(&self) -> Vec<u8> {
        self.cert.armored().to_vec().expect("armor certificate")
    }

    pub fn anchor(&self, label: &str) -> TrustAnchor {
        TrustAnchor::new(&self.fingerprint(), KeySource::bytes(self.public_key_block()))
            .expect("valid anchor")
            .with_label(label)
    }

    fn signing_subkey(&self) -> KeyPair {
        self.cert
            .keys()
            .subkeys()
            .secret()
            .next()
            .expect("signing subkey")
            .key()
            .clone()
            .into_keypair()
            .expect("subkey keypair")
    }

    /// An armored detached signature over `data` made by the signing subkey.
    pub fn sign_detached(&self, data: &[u8]) -> Vec<u8> {
        let mut signer = self.signing_subkey();
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .sign_message(&mut signer, data)
            .expect("sign");

        let mut buf = Vec::new();
        let mut writer =
            armor::Writer::new(&mut buf, armor::Kind::Signature).expect("armor writer");
        Packet::from(sig).serialize(&mut writer).expect("serialize");
        writer.finalize().expect("finalize");
        buf
    }
}

pub fn flip_bit(data: &[u8], bit: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    out[bit / 8] ^= 1 << (bit % 8);
    out
}
