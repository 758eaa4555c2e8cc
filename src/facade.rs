//! Verifier façade (C7): the crate's public entry points.
//!
//! This is the only layer that sees both [`SdmError`] variants and the only
//! one permitted to apply the `require_lrp` policy — C5 (`crate::sun`)
//! itself has no notion of "this result's encryption mode is unacceptable",
//! it only ever reports what the tag actually sent.

use crate::config::SdmConfig;
use crate::derive::KeyMaterial;
use crate::error::{Result, SdmError};
use crate::params::{self, ParsedSun};
use crate::sun;
use crate::types::{EncMode, PlainSunResult, SunResult};

fn enforce_require_lrp(config: &SdmConfig, mode: EncMode) -> Result<()> {
    if config.require_lrp && mode == EncMode::Aes {
        return Err(SdmError::InvalidMessage("invalid encryption mode, expected LRP"));
    }
    Ok(())
}

/// Decode and verify an already-parsed SUN message (C6 output), deriving
/// both the metadata key and the per-UID file key from `key_material`.
///
/// This is the shape described in spec §4.7: callers who already have
/// `picc_data`/`mac`/`enc_file_data` as decoded octets (e.g. because they ran
/// [`crate::params::parse_bulk`] or [`crate::params::parse_separated`]
/// themselves) call this directly.
pub fn decrypt_sun_message(config: &SdmConfig, key_material: &KeyMaterial, parsed: &ParsedSun) -> Result<SunResult> {
    let meta_key = key_material.meta_key();
    let file_key_no = config.file_key_no;

    let outcome = sun::decrypt_sun_message(
        parsed.param_mode,
        &meta_key,
        |uid| key_material.tag_key(uid, file_key_no),
        &parsed.picc_data,
        &parsed.mac,
        parsed.enc_file_data.as_deref(),
        config.sdmmac_param,
    );

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            tracing::debug!(detail = err.detail(), "sun verification failed");
            return Err(err);
        }
    };

    if let Err(err) = enforce_require_lrp(config, result.encryption_mode) {
        tracing::debug!(mode = ?result.encryption_mode, "require_lrp rejected successful verification");
        return Err(err);
    }

    tracing::debug!(mode = ?result.encryption_mode, verified = true, "sun message verified");
    Ok(result)
}

/// Parse the `e=` BULK hex blob and verify it in one call.
pub fn decrypt_sun_message_bulk(config: &SdmConfig, key_material: &KeyMaterial, e_hex: &str) -> Result<SunResult> {
    let parsed = params::parse_bulk(e_hex)?;
    decrypt_sun_message(config, key_material, &parsed)
}

/// Parse the SEPARATED `picc_data`/`enc`/`cmac` hex parameters and verify
/// them in one call.
pub fn decrypt_sun_message_separated(
    config: &SdmConfig,
    key_material: &KeyMaterial,
    picc_data_hex: &str,
    enc_hex: Option<&str>,
    cmac_hex: &str,
) -> Result<SunResult> {
    let parsed = params::parse_separated(picc_data_hex, enc_hex, cmac_hex)?;
    decrypt_sun_message(config, key_material, &parsed)
}

/// Verify a "plain SUN" message (UID and counter carried unencrypted,
/// authenticated only by the MAC).
pub fn validate_plain_sun(
    config: &SdmConfig,
    key_material: &KeyMaterial,
    uid: &[u8],
    counter: &[u8; 3],
    mac: &[u8; 8],
    mode: EncMode,
) -> Result<PlainSunResult> {
    let tag_key = key_material.tag_key(uid, config.file_key_no);
    let result = match sun::validate_plain_sun(uid, counter, mac, &tag_key, mode) {
        Ok(result) => result,
        Err(err) => {
            tracing::debug!(detail = err.detail(), "plain sun verification failed");
            return Err(err);
        }
    };

    if let Err(err) = enforce_require_lrp(config, result.encryption_mode) {
        tracing::debug!(mode = ?result.encryption_mode, "require_lrp rejected successful plain verification");
        return Err(err);
    }

    tracing::debug!(mode = ?result.encryption_mode, verified = true, "plain sun message verified");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::DeriveMode;

    fn demo_config() -> SdmConfig {
        SdmConfig {
            derive_mode: DeriveMode::New,
            require_lrp: false,
            sdmmac_param: "",
            file_key_no: 2,
        }
    }

    fn demo_keys() -> KeyMaterial {
        KeyMaterial::new([0u8; 16], DeriveMode::New)
    }

    #[test]
    fn bulk_round_trip_aes_without_file() {
        let e = "EF963FF7828658A599F3041510671E8894EED9EE65337086";
        let result = decrypt_sun_message_bulk(&demo_config(), &demo_keys(), e).unwrap();
        assert_eq!(hex::encode_upper(&result.uid), "04DE5F1EACC040");
        assert_eq!(result.read_ctr, 61);
        assert_eq!(result.encryption_mode, EncMode::Aes);
    }

    #[test]
    fn separated_round_trip_lrp_without_file() {
        let picc = "1FCBE61B3E4CAD980CBFDD333E7A4AC4A579569BAFD22C5F";
        let mac = "4231608BA7B02BA9";
        let result =
            decrypt_sun_message_separated(&demo_config(), &demo_keys(), picc, None, mac).unwrap();
        assert_eq!(hex::encode_upper(&result.uid), "04940E2A2F7080");
        assert_eq!(result.encryption_mode, EncMode::Lrp);
    }

    #[test]
    fn require_lrp_rejects_aes_results() {
        let mut config = demo_config();
        config.require_lrp = true;

        let e = "EF963FF7828658A599F3041510671E8894EED9EE65337086";
        let result = decrypt_sun_message_bulk(&config, &demo_keys(), e);
        assert!(matches!(result, Err(SdmError::InvalidMessage(_))));
    }

    #[test]
    fn require_lrp_accepts_lrp_results() {
        let mut config = demo_config();
        config.require_lrp = true;

        let picc = "1FCBE61B3E4CAD980CBFDD333E7A4AC4A579569BAFD22C5F";
        let mac = "4231608BA7B02BA9";
        let result = decrypt_sun_message_separated(&config, &demo_keys(), picc, None, mac);
        assert!(result.is_ok());
    }

    #[test]
    fn plain_sun_facade_round_trip() {
        let uid = hex::decode("041E3C8A2D6B80").unwrap();
        let counter: [u8; 3] = hex::decode("000006").unwrap().try_into().unwrap();
        let mac: [u8; 8] = hex::decode("4B00064004B0B3D3").unwrap().try_into().unwrap();

        let result = validate_plain_sun(&demo_config(), &demo_keys(), &uid, &counter, &mac, EncMode::Aes).unwrap();
        assert_eq!(result.uid, uid);
        assert_eq!(result.read_ctr, 6);
    }

    #[test]
    fn bad_request_never_reaches_crypto() {
        let result = decrypt_sun_message_bulk(&demo_config(), &demo_keys(), "not-hex");
        assert!(matches!(result, Err(SdmError::BadRequest(_))));
    }
}
