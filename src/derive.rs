//! Per-tag key diversification (C3).
//!
//! Two independent regimes are supported side by side: the "new" scheme
//! (HMAC-SHA256 + AES-CMAC, in effect since 2023-01-24) and a legacy
//! PBKDF2-HMAC-SHA512 scheme kept around for backward compatibility with
//! tags personalized under the old algorithm. Both collapse to the all-zero
//! demo key whenever the master key is all zero, which is what lets the
//! published AN12196 test vectors be checked without a real deployment key.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};

use crate::block::cmac;

const DEMO_MASTER_KEY: [u8; 16] = [0u8; 16];

const DIV_CONST1: &[u8] = b"PICCDataKey";
const DIV_CONST2: &[u8] = b"SlotMasterKey";
const DIV_CONST3: &[u8] = b"DivBaseKey";

const LEGACY_PBKDF2_ROUNDS: u32 = 5000;

/// Which derivation regime a [`crate::KeyMaterial`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// HMAC-SHA256 + AES-CMAC scheme in effect since 2023-01-24 (default).
    New,
    /// PBKDF2-HMAC-SHA512 scheme, kept for tags personalized under the old
    /// algorithm (compatible with the legacy NFC Developer App).
    Legacy,
}

impl Default for DeriveMode {
    fn default() -> Self {
        DeriveMode::New
    }
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

fn pbkdf2_sha512_16(key: &[u8], label: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    pbkdf2_hmac::<Sha512>(key, label, LEGACY_PBKDF2_ROUNDS, &mut out);
    out
}

/// Derive a key which is not UID-diversified (K_SDMMetaReadKey, `key_no == 1`).
///
/// Only `key_no == 1` is meaningful for the new scheme; any other value fails
/// rather than deriving a meaningless key.
pub fn derive_undiversified_key(master_key: &[u8; 16], key_no: u8) -> crate::error::Result<[u8; 16]> {
    if key_no != 1 {
        return Err(crate::error::SdmError::BadRequest(
            "only key #1 can be derived in undiversified mode",
        ));
    }

    Ok(undiversified_key_one(master_key))
}

/// The actual computation behind [`derive_undiversified_key`], for the one
/// `key_no` the new scheme supports. Kept separate and private so internal
/// callers that already know they want key #1 (namely [`KeyMaterial::meta_key`])
/// don't have to thread a `Result` for a precondition their own call site
/// already guarantees.
fn undiversified_key_one(master_key: &[u8; 16]) -> [u8; 16] {
    if *master_key == DEMO_MASTER_KEY {
        return DEMO_MASTER_KEY;
    }

    let full = hmac_sha256(master_key, DIV_CONST1);
    let mut out = [0u8; 16];
    out.copy_from_slice(&full[..16]);
    out
}

/// Derive a key which is UID-diversified (K_SDMFileReadKey).
pub fn derive_tag_key(master_key: &[u8; 16], uid: &[u8], key_no: u8) -> [u8; 16] {
    if *master_key == DEMO_MASTER_KEY {
        return DEMO_MASTER_KEY;
    }

    let inner = hmac_sha256(master_key, DIV_CONST3);
    let ikm_full = hmac_sha256(&inner, uid);
    let mut ikm = [0u8; 16];
    ikm.copy_from_slice(&ikm_full[..16]);

    let mut sub_key_label = Vec::with_capacity(DIV_CONST2.len() + 1);
    sub_key_label.extend_from_slice(DIV_CONST2);
    sub_key_label.push(key_no);
    let sub_key_full = hmac_sha256(master_key, &sub_key_label);
    let mut sub_key = [0u8; 16];
    sub_key.copy_from_slice(&sub_key_full[..16]);

    let mut cmac_input = Vec::with_capacity(1 + ikm.len());
    cmac_input.push(0x01);
    cmac_input.extend_from_slice(&ikm);

    cmac(&sub_key, &cmac_input)
}

/// Legacy (pre-2023-01-24) undiversified key derivation, PBKDF2-HMAC-SHA512.
///
/// Unlike [`derive_undiversified_key`], the legacy scheme never validated
/// `key_no` against any particular value — callers could (and in the wild,
/// did) pass any slot number. That asymmetry is preserved here rather than
/// "fixed", since fixing it would reject configurations that legitimately
/// worked against the legacy backend.
pub fn legacy_derive_undiversified_key(master_key: &[u8; 16], key_no: u8) -> [u8; 16] {
    if *master_key == DEMO_MASTER_KEY {
        return DEMO_MASTER_KEY;
    }

    let mut label = Vec::with_capacity(b"key_no_uid".len() + 1);
    label.extend_from_slice(b"key_no_uid");
    label.push(key_no);
    pbkdf2_sha512_16(master_key, &label)
}

/// Legacy (pre-2023-01-24) UID-diversified key derivation, PBKDF2-HMAC-SHA512.
pub fn legacy_derive_tag_key(master_key: &[u8; 16], uid: &[u8], key_no: u8) -> [u8; 16] {
    if *master_key == DEMO_MASTER_KEY {
        return DEMO_MASTER_KEY;
    }

    let mut label = Vec::with_capacity(3 + uid.len() + 1);
    label.extend_from_slice(b"key");
    label.extend_from_slice(uid);
    label.push(key_no);
    pbkdf2_sha512_16(master_key, &label)
}

/// Bundles a master key with its derivation regime so callers don't have to
/// thread both through every derivation call site.
///
/// Grounded on the donor's `NfcCard` struct, which keeps `k1_decrypt_key` and
/// `k2_cmac_key` next to the UID they were diversified from — generalized
/// here to the two-scheme, UID-parametric case this crate needs instead of a
/// single fixed pair of precomputed keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyMaterial {
    master_key: [u8; 16],
    derive_mode: DeriveMode,
}

impl KeyMaterial {
    pub fn new(master_key: [u8; 16], derive_mode: DeriveMode) -> Self {
        KeyMaterial { master_key, derive_mode }
    }

    /// K_SDMMetaReadKey: the undiversified key used to decrypt PICCData.
    pub fn meta_key(&self) -> [u8; 16] {
        match self.derive_mode {
            DeriveMode::New => undiversified_key_one(&self.master_key),
            DeriveMode::Legacy => legacy_derive_undiversified_key(&self.master_key, 1),
        }
    }

    /// K_SDMFileReadKey: the UID-diversified key used for MAC and file payload.
    pub fn tag_key(&self, uid: &[u8], key_no: u8) -> [u8; 16] {
        match self.derive_mode {
            DeriveMode::New => derive_tag_key(&self.master_key, uid, key_no),
            DeriveMode::Legacy => legacy_derive_tag_key(&self.master_key, uid, key_no),
        }
    }
}
