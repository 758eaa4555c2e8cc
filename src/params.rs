//! URL / argument parsing (C6): turn the two query-parameter shapes a SUN
//! URL can arrive in — `BULK` (one packed `e=` blob) or `SEPARATED`
//! (`picc_data`, `enc`, `cmac` as distinct parameters) — into the decoded
//! octet strings [`crate::sun::decrypt_sun_message`] expects.
//!
//! Everything here runs before any cryptography does; failures are always
//! [`SdmError::BadRequest`], never [`SdmError::InvalidMessage`], and never
//! carry partial results.

use crate::error::{Result, SdmError};
use crate::types::ParamMode;

/// A parsed SUN message, still in raw octet form: PICCData ciphertext,
/// optional file ciphertext, and the received 8-octet MAC.
pub struct ParsedSun {
    pub param_mode: ParamMode,
    pub picc_data: Vec<u8>,
    pub enc_file_data: Option<Vec<u8>>,
    pub mac: [u8; 8],
}

fn decode_hex(hex_str: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str).map_err(|_| SdmError::BadRequest("failed to decode parameters"))
}

/// Split a single hex blob `e` into `PICCData || file? || MAC`.
///
/// The length class is discriminated by `(|E| - 8) mod 16`: `0` means a
/// 16-octet AES PICCData, `8` means a 24-octet LRP PICCData (8-octet random
/// prefix + 16-octet ciphertext). Any other remainder, or a blob too short
/// to hold even an empty-file message of its class, is rejected.
pub fn parse_bulk(e_hex: &str) -> Result<ParsedSun> {
    let e = decode_hex(e_hex)?;
    if e.len() < 8 {
        return Err(SdmError::BadRequest("incorrect length"));
    }
    let n = e.len();
    let rem = n - 8;

    let picc_len = match rem % 16 {
        0 if rem >= 16 => 16,
        8 if rem >= 24 => 24,
        _ => return Err(SdmError::BadRequest("incorrect length")),
    };

    let mac: [u8; 8] = e[n - 8..].try_into().expect("n >= 8 checked above");
    let picc_data = e[..picc_len].to_vec();
    let enc_file_data = if n - 8 > picc_len {
        Some(e[picc_len..n - 8].to_vec())
    } else {
        None
    };

    Ok(ParsedSun {
        param_mode: ParamMode::Bulk,
        picc_data,
        enc_file_data,
        mac,
    })
}

/// Parse the `picc_data` (required), `cmac` (required), and `enc` (optional)
/// hex parameters of the SEPARATED encoding.
pub fn parse_separated(picc_data_hex: &str, enc_hex: Option<&str>, cmac_hex: &str) -> Result<ParsedSun> {
    let picc_data = decode_hex(picc_data_hex)?;
    let mac_vec = decode_hex(cmac_hex)?;
    let mac: [u8; 8] = mac_vec
        .try_into()
        .map_err(|_| SdmError::BadRequest("failed to decode parameters"))?;
    let enc_file_data = enc_hex.map(decode_hex).transpose()?;

    Ok(ParsedSun {
        param_mode: ParamMode::Separated,
        picc_data,
        enc_file_data,
        mac,
    })
}
