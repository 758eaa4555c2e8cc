//! AES-128 single-block primitives and full (untruncated) AES-CMAC.
//!
//! Everything here operates on whole 16-octet blocks. Truncation to the
//! 8-octet "short tag" NTAG 424 actually puts on the wire is a session-key
//! concern (see [`crate::session`]), not a primitive.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use cmac::{Cmac, Mac};

pub const BLOCK_SIZE: usize = 16;

/// AES-128-ECB single-block encrypt: `e(k, v)`.
pub fn encrypt_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = aes::Aes128::new(GenericArray::from_slice(key));
    let mut buf = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut buf);
    buf.into()
}

/// AES-128-ECB single-block decrypt: `d(k, v)`.
pub fn decrypt_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = aes::Aes128::new(GenericArray::from_slice(key));
    let mut buf = GenericArray::clone_from_slice(block);
    cipher.decrypt_block(&mut buf);
    buf.into()
}

/// Full 16-octet AES-CMAC over `message` with a 16-octet key.
///
/// Subkey generation (doubling in GF(2^128)) and the 0x80 bit-pad on a
/// partial final block are handled by the `cmac` crate; this is a thin,
/// infallible wrapper since NTAG 424 keys are always exactly 16 octets.
pub fn cmac(key: &[u8; 16], message: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<aes::Aes128> as Mac>::new_from_slice(key).expect("16-byte key is valid");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecb_round_trips() {
        let key = [0x2bu8, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c];
        let pt = [0x32u8, 0x43, 0xf6, 0xa8, 0x88, 0x5a, 0x30, 0x8d, 0x31, 0x31, 0x98, 0xa2, 0xe0, 0x37, 0x07, 0x34];
        let ct = encrypt_block(&key, &pt);
        assert_eq!(decrypt_block(&key, &ct), pt);
    }

    #[test]
    fn cmac_is_deterministic_and_key_sensitive() {
        let k1 = [0u8; 16];
        let mut k2 = [0u8; 16];
        k2[0] = 1;
        let msg = b"a message to authenticate";

        assert_eq!(cmac(&k1, msg), cmac(&k1, msg));
        assert_ne!(cmac(&k1, msg), cmac(&k2, msg));
    }
}
