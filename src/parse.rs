use sequoia_openpgp as openpgp;

use openpgp::Packet;
use openpgp::packet::{Signature, Tag};
use openpgp::parse::{PacketParser, PacketParserResult, Parse};
use openpgp::types::SignatureType;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fingerprint::{ExpectedFingerprint, normalize_fingerprint};
use crate::types::{DetachedSignature, KeyRing, MasterKey, Subkey, SubordinateKey};

/// Decodes a public key block and pins its master key.
///
/// The block may be ASCII-armored or binary. Every key packet in the block
/// is enumerated; exactly one master key may be present and its fingerprint
/// must equal `expected`. Nothing is returned unless all of that holds.
pub fn parse_key_ring(key_block: &[u8], expected: &ExpectedFingerprint) -> Result<KeyRing> {
    if key_block.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MalformedKeyBlock("key block is empty".to_string()));
    }

    let packets = read_packets(key_block).map_err(Error::MalformedKeyBlock)?;

    let mut ring: Option<RingBuilder> = None;

    for packet in packets {
        match packet {
            Packet::PublicKey(master) => open_ring(&mut ring, master)?,
            Packet::SecretKey(master) => open_ring(&mut ring, master.parts_into_public())?,
            Packet::PublicSubkey(subkey) => current_ring(&mut ring)?.add_subkey(subkey),
            Packet::SecretSubkey(subkey) => {
                current_ring(&mut ring)?.add_subkey(subkey.parts_into_public())
            }
            Packet::UserID(uid) => match ring.as_mut() {
                Some(builder) => {
                    builder.add_user_id(String::from_utf8_lossy(uid.value()).into_owned())
                }
                None => debug!("skipping user ID before any master key"),
            },
            Packet::Signature(sig) => match ring.as_mut() {
                Some(builder) => builder.attach_signature(sig),
                None => debug!("skipping signature before any master key"),
            },
            Packet::Unknown(unknown) if is_key_material(unknown.tag()) => {
                return Err(Error::MalformedKeyBlock(format!(
                    "unsupported {} packet: {}",
                    unknown.tag(),
                    unknown.error()
                )));
            }
            other => {
                debug!(tag = %other.tag(), "skipping packet not used for key certification");
            }
        }
    }

    let ring = ring.ok_or(Error::NoMasterKey)?.build();

    let actual = normalize_fingerprint(&ring.master_fingerprint());
    if !expected.matches(&actual) {
        return Err(Error::FingerprintMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    debug!(
        fingerprint = %actual,
        subkeys = ring.subkeys.len(),
        "parsed key ring"
    );

    Ok(ring)
}

/// Decodes a detached signature file into its document signatures.
///
/// Only binary and text signatures count; key signatures are skipped. A file
/// carrying key material, one that fails to decode, or one left without any
/// document signature is fatal.
pub fn parse_detached_signature(signature: &[u8]) -> Result<DetachedSignature> {
    let packets = read_packets(signature).map_err(Error::MalformedSignature)?;

    let mut signatures = Vec::new();
    for packet in packets {
        match packet {
            Packet::Signature(sig) if is_document_signature(sig.typ()) => signatures.push(sig),
            Packet::Signature(sig) => {
                debug!(sig_type = %sig.typ(), "skipping key signature in signature file");
            }
            Packet::Unknown(unknown) if unknown.tag() == Tag::Signature => {
                return Err(Error::MalformedSignature(format!(
                    "unsupported signature packet: {}",
                    unknown.error()
                )));
            }
            packet if is_key_material(packet.tag()) => {
                return Err(Error::MalformedSignature(format!(
                    "signature file contains a {} packet",
                    packet.tag()
                )));
            }
            other => {
                debug!(tag = %other.tag(), "skipping non-signature packet in signature file");
            }
        }
    }

    if signatures.is_empty() {
        return Err(Error::MalformedSignature(
            "signature file contains no document signatures".to_string(),
        ));
    }

    Ok(DetachedSignature { signatures })
}

const ARMOR_BEGIN: &[u8] = b"-----BEGIN PGP ";
const ARMOR_END: &[u8] = b"-----END PGP ";

/// Decodes every packet of `data`.
///
/// The input may hold several armored blocks and binary runs back to back;
/// each is decoded in turn so nothing after the first armor footer is lost.
fn read_packets(data: &[u8]) -> std::result::Result<Vec<Packet>, String> {
    let mut packets = Vec::new();

    for segment in segments(data) {
        let mut ppr = PacketParser::from_bytes(segment).map_err(|e| e.to_string())?;
        while let PacketParserResult::Some(pp) = ppr {
            let (packet, next) = pp.next().map_err(|e| e.to_string())?;
            packets.push(packet);
            ppr = next;
        }
    }

    Ok(packets)
}

/// Splits `data` into armored blocks (header through footer line) and the
/// binary runs between them. Whitespace between segments is dropped.
fn segments(data: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut rest = data;

    loop {
        let start = rest
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(rest.len());
        rest = &rest[start..];
        if rest.is_empty() {
            return out;
        }

        let end = if rest.starts_with(ARMOR_BEGIN) {
            find(rest, ARMOR_END, ARMOR_BEGIN.len())
                .map(|footer| {
                    rest[footer..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(rest.len(), |eol| footer + eol + 1)
                })
                .unwrap_or(rest.len())
        } else {
            find(rest, ARMOR_BEGIN, 0).unwrap_or(rest.len())
        };

        out.push(&rest[..end]);
        rest = &rest[end..];
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn is_document_signature(typ: SignatureType) -> bool {
    matches!(typ, SignatureType::Binary | SignatureType::Text)
}

fn is_key_material(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::PublicKey | Tag::PublicSubkey | Tag::SecretKey | Tag::SecretSubkey
    )
}

fn open_ring(ring: &mut Option<RingBuilder>, master: MasterKey) -> Result<()> {
    if let Some(existing) = ring {
        return Err(Error::MultipleMasterKeys {
            first: format!("{:x}", existing.master.fingerprint()),
            second: format!("{:x}", master.fingerprint()),
        });
    }
    *ring = Some(RingBuilder::new(master));
    Ok(())
}

fn current_ring(ring: &mut Option<RingBuilder>) -> Result<&mut RingBuilder> {
    ring.as_mut()
        .ok_or_else(|| Error::MalformedKeyBlock("subkey precedes any master key".to_string()))
}

/// Where the next signature packet belongs.
enum Target {
    Master,
    Subkey(usize),
}

struct RingBuilder {
    master: MasterKey,
    master_signatures: Vec<Signature>,
    user_ids: Vec<String>,
    subkeys: Vec<Subkey>,
    target: Target,
}

impl RingBuilder {
    fn new(master: MasterKey) -> Self {
        Self {
            master,
            master_signatures: Vec::new(),
            user_ids: Vec::new(),
            subkeys: Vec::new(),
            target: Target::Master,
        }
    }

    fn add_user_id(&mut self, uid: String) {
        self.user_ids.push(uid);
        self.target = Target::Master;
    }

    fn add_subkey(&mut self, key: SubordinateKey) {
        self.subkeys.push(Subkey {
            key,
            signatures: Vec::new(),
        });
        self.target = Target::Subkey(self.subkeys.len() - 1);
    }

    fn attach_signature(&mut self, sig: Signature) {
        match self.target {
            Target::Master => self.master_signatures.push(sig),
            Target::Subkey(i) => self.subkeys[i].signatures.push(sig),
        }
    }

    fn build(self) -> KeyRing {
        KeyRing {
            master: self.master,
            master_signatures: self.master_signatures,
            user_ids: self.user_ids,
            subkeys: self.subkeys,
        }
    }
}
