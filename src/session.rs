//! SDM session-key construction (C4): the "SV" (session vector) scheme that
//! binds PICCData to a single-use key for MAC computation or file
//! decryption, in both AES and LRP modes.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::block::{cmac as aes_cmac, encrypt_block};
use crate::error::{Result, SdmError};
use crate::lrp::LrpEngine;
use crate::types::{EncMode, ParamMode};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

const SV2_AES_PREFIX: [u8; 6] = [0x3C, 0xC3, 0x00, 0x01, 0x00, 0x80];
const SV1_AES_PREFIX: [u8; 6] = [0xC3, 0x3C, 0x00, 0x01, 0x00, 0x80];
const LRP_SV_PREFIX: [u8; 4] = [0x00, 0x01, 0x00, 0x80];
const LRP_SV_SUFFIX: [u8; 2] = [0x1E, 0xE1];

fn zero_pad_to_block(mut buf: Vec<u8>) -> Vec<u8> {
    while buf.len() % 16 != 0 {
        buf.push(0);
    }
    buf
}

/// Build the AES SV2 (for MAC) or SV1 (for file decryption) session vector.
fn aes_sv(prefix: [u8; 6], picc_data: &[u8]) -> Vec<u8> {
    let mut sv = Vec::with_capacity(prefix.len() + picc_data.len() + 16);
    sv.extend_from_slice(&prefix);
    sv.extend_from_slice(picc_data);
    zero_pad_to_block(sv)
}

/// Build the LRP session vector: `00 01 00 80 || PICCData || zero-pad || 1E E1`,
/// with zero-padding chosen so that `(length + 2)` lands on a block boundary
/// (the trailing `1E E1` counts toward alignment).
fn lrp_sv(picc_data: &[u8]) -> Vec<u8> {
    let mut sv = Vec::with_capacity(LRP_SV_PREFIX.len() + picc_data.len() + 16);
    sv.extend_from_slice(&LRP_SV_PREFIX);
    sv.extend_from_slice(picc_data);
    while (sv.len() + LRP_SV_SUFFIX.len()) % 16 != 0 {
        sv.push(0);
    }
    sv.extend_from_slice(&LRP_SV_SUFFIX);
    sv
}

/// Derive the LRP master session key shared by the MAC and file-decryption
/// constructions: `LRP(tag_key, u=0).cmac(sv)`.
fn lrp_master_key(tag_key: &[u8; 16], picc_data: &[u8]) -> [u8; 16] {
    let engine = LrpEngine::new(tag_key, 0);
    engine.cmac(&lrp_sv(picc_data))
}

/// Truncate a 16-octet CMAC to the 8-octet "short tag" NTAG 424 puts on the
/// wire: the odd-indexed bytes (1, 3, 5, 7, 9, 11, 13, 15).
pub fn truncate_mac(full: &[u8; 16]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = full[2 * i + 1];
    }
    out
}

/// Compute the 8-octet SDMMAC.
///
/// `picc_data` is `UID || SDMReadCtr` (the parsed header fields, not the
/// encrypted block). `sdmmac_param` is the configured query-parameter name
/// (e.g. `"cmac"`); pass `""` when none is configured.
pub fn calculate_sdmmac(
    param_mode: ParamMode,
    tag_key: &[u8; 16],
    picc_data: &[u8],
    enc_file_data: Option<&[u8]>,
    mode: EncMode,
    sdmmac_param: &str,
) -> [u8; 8] {
    let mut mac_input = Vec::new();
    if let Some(enc) = enc_file_data.filter(|e| !e.is_empty()) {
        mac_input.extend_from_slice(hex::encode_upper(enc).as_bytes());
        if !sdmmac_param.is_empty() && param_mode == ParamMode::Separated {
            mac_input.push(b'&');
            mac_input.extend_from_slice(sdmmac_param.as_bytes());
            mac_input.push(b'=');
        }
    }

    let full = match mode {
        EncMode::Aes => {
            let sv2_key = aes_cmac(tag_key, &aes_sv(SV2_AES_PREFIX, picc_data));
            aes_cmac(&sv2_key, &mac_input)
        }
        EncMode::Lrp => {
            let master_key = lrp_master_key(tag_key, picc_data);
            LrpEngine::new(&master_key, 0).cmac(&mac_input)
        }
    };

    truncate_mac(&full)
}

/// Decrypt `SDMEncFileData` for a successfully authenticated message.
pub fn decrypt_file_data(
    tag_key: &[u8; 16],
    picc_data: &[u8],
    read_ctr: &[u8; 3],
    enc_file_data: &[u8],
    mode: EncMode,
) -> Result<Vec<u8>> {
    match mode {
        EncMode::Aes => {
            let k_ses_enc = aes_cmac(tag_key, &aes_sv(SV1_AES_PREFIX, picc_data));

            let mut ive_input = [0u8; 16];
            ive_input[..3].copy_from_slice(read_ctr);
            let ive = encrypt_block(&k_ses_enc, &ive_input);

            let mut buf = enc_file_data.to_vec();
            Aes128CbcDec::new(k_ses_enc.as_slice().into(), &ive.into())
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| SdmError::InvalidMessage("file payload decryption failed"))?;
            Ok(buf)
        }
        EncMode::Lrp => {
            let master_key = lrp_master_key(tag_key, picc_data);
            let mut r = read_ctr.to_vec();
            r.extend_from_slice(&[0u8; 3]);
            let mut engine = LrpEngine::with_counter(&master_key, 1, r, false);
            engine.decrypt(enc_file_data)
        }
    }
}

/// Re-encrypt a file payload (the inverse of [`decrypt_file_data`]). Not
/// needed by the reader-side SUN pipeline, but kept alongside it because the
/// AES path shares the same session key and IV derivation — exposed for
/// callers building fixtures or test vectors, not used by [`crate::sun`].
#[cfg(test)]
pub fn encrypt_file_data_aes_for_tests(
    tag_key: &[u8; 16],
    picc_data: &[u8],
    read_ctr: &[u8; 3],
    file_data: &[u8],
) -> Vec<u8> {
    let k_ses_enc = aes_cmac(tag_key, &aes_sv(SV1_AES_PREFIX, picc_data));
    let mut ive_input = [0u8; 16];
    ive_input[..3].copy_from_slice(read_ctr);
    let ive = encrypt_block(&k_ses_enc, &ive_input);

    let mut buf = file_data.to_vec();
    Aes128CbcEnc::new(k_ses_enc.as_slice().into(), &ive.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, file_data.len())
        .unwrap()
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_mac_picks_odd_bytes() {
        let full: [u8; 16] = (0u8..16).collect::<Vec<_>>().try_into().unwrap();
        assert_eq!(truncate_mac(&full), [1, 3, 5, 7, 9, 11, 13, 15]);
    }

    #[test]
    fn lrp_sv_is_block_aligned_including_suffix() {
        let picc_data = vec![0u8; 10];
        let sv = lrp_sv(&picc_data);
        assert_eq!(sv.len() % 16, 0);
        assert_eq!(&sv[sv.len() - 2..], &LRP_SV_SUFFIX);
    }

    #[test]
    fn aes_file_round_trips_through_session_keys() {
        let tag_key = [0x11u8; 16];
        let picc_data = hex::decode("04DE5F1EACC040003D").unwrap(); // uid || ctr
        let read_ctr = [0x00u8, 0x3D, 0x00];
        let plaintext = b"hello sdm world!"; // 16 bytes, block aligned

        let ct = encrypt_file_data_aes_for_tests(&tag_key, &picc_data, &read_ctr, plaintext);
        let pt = decrypt_file_data(&tag_key, &picc_data, &read_ctr, &ct, EncMode::Aes).unwrap();
        assert_eq!(pt, plaintext);
    }
}
