//! SUN decoder (C5): mode detection, PICCData parsing, MAC verification, and
//! optional file decryption. Orchestrates C1–C4.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use subtle::ConstantTimeEq;

use crate::error::{Result, SdmError};
use crate::lrp::LrpEngine;
use crate::session;
use crate::types::{EncMode, ParamMode, SunResult};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Infer the encryption mode from the ciphertext length of `PICCData`: 16
/// octets for AES, 24 (8-octet random prefix + 16-octet ciphertext) for LRP.
pub fn get_encryption_mode(picc_data: &[u8]) -> Result<EncMode> {
    match picc_data.len() {
        16 => Ok(EncMode::Aes),
        24 => Ok(EncMode::Lrp),
        _ => Err(SdmError::InvalidMessage("unsupported PICCData length")),
    }
}

fn decrypt_picc_data(meta_key: &[u8; 16], picc_data: &[u8], mode: EncMode) -> Result<Vec<u8>> {
    match mode {
        EncMode::Aes => {
            let mut buf = picc_data.to_vec();
            Aes128CbcDec::new(meta_key.into(), &[0u8; 16].into())
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| SdmError::InvalidMessage("PICCData decryption failed"))?;
            Ok(buf)
        }
        EncMode::Lrp => {
            let rand = picc_data[..8].to_vec();
            let ct = &picc_data[8..];
            let mut engine = LrpEngine::with_counter(meta_key, 0, rand, false);
            engine.decrypt(ct)
        }
    }
}

/// Compute and discard a MAC over a fixed-size zero buffer, mirroring the
/// exact branch (`mode`, `enc_file_data`, `sdmmac_param`) the real
/// verification below would have taken, using the file key for an all-zero
/// UID the way the real path derives one for the actual UID. Called before
/// failing on an unsupported UID length so the rejected path costs the same
/// as a successful one — an AES dummy next to a malformed LRP message would
/// leave the length check timing-distinguishable from the outside.
fn dummy_mac_for_equal_work(
    param_mode: ParamMode,
    file_key_fn: &impl Fn(&[u8]) -> [u8; 16],
    enc_file_data: Option<&[u8]>,
    mode: EncMode,
    sdmmac_param: &str,
) {
    let dummy_key = file_key_fn(&[0u8; 7]);
    let _ = session::calculate_sdmmac(
        param_mode,
        &dummy_key,
        &[0u8; 10],
        enc_file_data,
        mode,
        sdmmac_param,
    );
}

struct ParsedHeader {
    flag: u8,
    uid: Option<Vec<u8>>,
    read_ctr: Option<[u8; 3]>,
}

fn parse_header(
    plaintext: &[u8],
    param_mode: ParamMode,
    mode: EncMode,
    enc_file_data: Option<&[u8]>,
    sdmmac_param: &str,
    file_key_fn: &impl Fn(&[u8]) -> [u8; 16],
) -> Result<ParsedHeader> {
    if plaintext.is_empty() {
        return Err(SdmError::InvalidMessage("empty PICCData plaintext"));
    }

    let flag = plaintext[0];
    let uid_mirror = flag & 0x80 != 0;
    let ctr_mirror = flag & 0x40 != 0;
    let uid_len = (flag & 0x0F) as usize;

    if uid_len != 7 {
        dummy_mac_for_equal_work(param_mode, file_key_fn, enc_file_data, mode, sdmmac_param);
        return Err(SdmError::InvalidMessage("unsupported UID length"));
    }

    let mut offset = 1;
    let uid = if uid_mirror {
        if plaintext.len() < offset + 7 {
            return Err(SdmError::InvalidMessage("truncated PICCData"));
        }
        let uid = plaintext[offset..offset + 7].to_vec();
        offset += 7;
        Some(uid)
    } else {
        None
    };

    let read_ctr = if ctr_mirror {
        if plaintext.len() < offset + 3 {
            return Err(SdmError::InvalidMessage("truncated PICCData"));
        }
        let mut ctr = [0u8; 3];
        ctr.copy_from_slice(&plaintext[offset..offset + 3]);
        Some(ctr)
    } else {
        None
    };

    Ok(ParsedHeader { flag, uid, read_ctr })
}

fn read_ctr_to_u32_le(read_ctr: Option<&[u8; 3]>) -> u32 {
    match read_ctr {
        Some(ctr) => u32::from_le_bytes([ctr[0], ctr[1], ctr[2], 0x00]),
        None => 0,
    }
}

/// Decode and verify a full SUN message: detect the encryption mode,
/// decrypt `PICCData`, recompute the MAC with the key supplied by
/// `file_key_fn`, and (if present) decrypt the attached file payload.
pub fn decrypt_sun_message(
    param_mode: ParamMode,
    meta_key: &[u8; 16],
    file_key_fn: impl Fn(&[u8]) -> [u8; 16],
    picc_enc: &[u8],
    received_mac: &[u8; 8],
    enc_file_data: Option<&[u8]>,
    sdmmac_param: &str,
) -> Result<SunResult> {
    let mode = get_encryption_mode(picc_enc)?;
    let plaintext = decrypt_picc_data(meta_key, picc_enc, mode)?;
    let header = parse_header(&plaintext, param_mode, mode, enc_file_data, sdmmac_param, &file_key_fn)?;

    let uid = header
        .uid
        .ok_or(SdmError::InvalidMessage("PICCData does not mirror a UID"))?;

    let mut mac_picc_data = uid.clone();
    if let Some(ctr) = &header.read_ctr {
        mac_picc_data.extend_from_slice(ctr);
    }

    let tag_key = file_key_fn(&uid);
    let expected_mac = session::calculate_sdmmac(
        param_mode,
        &tag_key,
        &mac_picc_data,
        enc_file_data,
        mode,
        sdmmac_param,
    );

    if expected_mac.ct_eq(received_mac).unwrap_u8() != 1 {
        return Err(SdmError::InvalidMessage("invalid MAC"));
    }

    let file_data = match enc_file_data {
        Some(enc) => {
            let read_ctr = header
                .read_ctr
                .ok_or(SdmError::InvalidMessage("file data present without a read counter"))?;
            Some(session::decrypt_file_data(&tag_key, &mac_picc_data, &read_ctr, enc, mode)?)
        }
        None => None,
    };

    Ok(SunResult {
        picc_data_tag: header.flag,
        uid,
        read_ctr: read_ctr_to_u32_le(header.read_ctr.as_ref()),
        file_data,
        encryption_mode: mode,
    })
}

/// Verify a "plain SUN" message: the tag's UID and counter are carried
/// unencrypted, and only the MAC authenticates them.
///
/// The counter is reversed before being folded into the MAC input, and the
/// integer form is parsed big-endian — both the opposite of the full-SUN
/// path. This asymmetry is a property of the endpoint's wire format, not an
/// inconsistency to reconcile.
pub fn validate_plain_sun(
    uid: &[u8],
    counter: &[u8; 3],
    received_mac: &[u8; 8],
    tag_key: &[u8; 16],
    mode: EncMode,
) -> Result<crate::types::PlainSunResult> {
    let mut mac_picc_data = uid.to_vec();
    mac_picc_data.extend(counter.iter().rev());

    let expected_mac =
        session::calculate_sdmmac(ParamMode::Separated, tag_key, &mac_picc_data, None, mode, "");

    if expected_mac.ct_eq(received_mac).unwrap_u8() != 1 {
        return Err(SdmError::InvalidMessage("invalid MAC"));
    }

    let read_ctr = u32::from_be_bytes([0x00, counter[0], counter[1], counter[2]]);

    Ok(crate::types::PlainSunResult {
        uid: uid.to_vec(),
        read_ctr,
        encryption_mode: mode,
    })
}
