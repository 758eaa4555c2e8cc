//! Leakage Resilient Primitive engine (AN12304), component C2.
//!
//! This is a reader-side (PCD) implementation only. It is explicitly not
//! suitable for use on the card (PICC) side or for porting to tamper-exposed
//! hardware such as JavaCards — outside of the constant-time MAC comparison
//! at the façade, nothing here defends against side-channel leakage.

use crate::block::{decrypt_block, encrypt_block, BLOCK_SIZE};
use crate::error::SdmError;

const M: usize = 4;
const NUM_PLAINTEXTS: usize = 1 << M; // 16
const NUM_UPDATED_KEYS: usize = 4;

/// The 16 precomputed plaintexts `p[0..15]` used to evaluate the LRP for one nibble.
pub type Plaintexts = [[u8; BLOCK_SIZE]; NUM_PLAINTEXTS];
/// The 4 precomputed updated keys `ku[0..3]`, selected by the session's update index `u`.
pub type UpdatedKeys = [[u8; BLOCK_SIZE]; NUM_UPDATED_KEYS];

/// Algorithm 1 of AN12304: derive the 16 plaintexts from the raw key.
pub fn generate_plaintexts(key: &[u8; 16]) -> Plaintexts {
    let mut h = encrypt_block(key, &[0x55; BLOCK_SIZE]);
    let mut p = [[0u8; BLOCK_SIZE]; NUM_PLAINTEXTS];
    for slot in p.iter_mut() {
        *slot = encrypt_block(&h, &[0xAA; BLOCK_SIZE]);
        h = encrypt_block(&h, &[0x55; BLOCK_SIZE]);
    }
    p
}

/// Algorithm 2 of AN12304: derive the 4 updated keys from the raw key.
pub fn generate_updated_keys(key: &[u8; 16]) -> UpdatedKeys {
    let mut h = encrypt_block(key, &[0xAA; BLOCK_SIZE]);
    let mut uk = [[0u8; BLOCK_SIZE]; NUM_UPDATED_KEYS];
    for slot in uk.iter_mut() {
        *slot = encrypt_block(&h, &[0xAA; BLOCK_SIZE]);
        h = encrypt_block(&h, &[0x55; BLOCK_SIZE]);
    }
    uk
}

/// High nibble first, one nibble per returned item.
pub fn nibbles(x: &[u8]) -> impl Iterator<Item = u8> + '_ {
    x.iter().flat_map(|b| [b >> 4, b & 0x0F])
}

/// Algorithm 3 of AN12304, with `m = 4`.
pub fn eval_lrp(p: &Plaintexts, kp: &[u8; 16], x: &[u8], final_step: bool) -> [u8; 16] {
    let mut y = *kp;
    for nibble in nibbles(x) {
        y = encrypt_block(&y, &p[nibble as usize]);
    }
    if final_step {
        y = encrypt_block(&y, &[0u8; BLOCK_SIZE]);
    }
    y
}

/// Big-endian increment of a counter of arbitrary byte length; wraps to all-zero on overflow.
pub fn incr_counter(r: &[u8]) -> Vec<u8> {
    let mut out = r.to_vec();
    for byte in out.iter_mut().rev() {
        if *byte == 0xFF {
            *byte = 0x00;
        } else {
            *byte += 1;
            return out;
        }
    }
    // every byte wrapped past 0xFF: reset to zero, not one.
    out
}

fn xor_block(a: &[u8; 16], b: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Double a 128-bit value in GF(2^128) with reducing polynomial
/// x^128 + x^7 + x^2 + x + 1 (the standard CMAC subkey-generation doubling).
fn dbl(block: [u8; 16]) -> [u8; 16] {
    let msb_set = block[0] & 0x80 != 0;
    let mut out = [0u8; 16];
    let mut carry = 0u8;
    for i in (0..16).rev() {
        let b = block[i];
        out[i] = (b << 1) | carry;
        carry = b >> 7;
    }
    if msb_set {
        out[15] ^= 0x87;
    }
    out
}

/// Strip the `0x80` + zero-fill bit-padding trailer used when `pad = true`.
fn remove_pad(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut pad_len = 0usize;
    for &b in data.iter().rev() {
        pad_len += 1;
        if b == 0x80 {
            return Ok(data[..data.len() - pad_len].to_vec());
        }
        if b != 0x00 {
            return Err(SdmError::InvalidMessage("invalid LRP padding"));
        }
    }
    Err(SdmError::InvalidMessage("invalid LRP padding"))
}

/// One LRP session: a fixed key (via its precomputed plaintexts/updated-key
/// tables), an updated-key index `u`, a mutable counter/IV `r`, and whether
/// LRICB operations bit-pad their input.
///
/// Cheap to construct (16+4 AES-ECB calls). Always build a fresh instance
/// per operation — the counter is mutated in place by `encrypt`/`decrypt`,
/// so sharing one across unrelated requests would make results depend on
/// call order.
pub struct LrpEngine {
    p: Plaintexts,
    kp: [u8; 16],
    r: Vec<u8>,
    pad: bool,
}

impl LrpEngine {
    /// New engine with counter `r = 0` (16 zero bytes) and `pad = true`.
    pub fn new(key: &[u8; 16], u: usize) -> Self {
        Self::with_counter(key, u, vec![0u8; BLOCK_SIZE], true)
    }

    /// New engine with an explicit counter/IV and padding mode. `r` may be
    /// any length the caller's protocol step calls for (8 bytes for the
    /// PICCData IV, 6 bytes for the file-decryption counter, and so on) —
    /// only the block-sized LRICB inputs need to be 16 bytes, not `r` itself.
    pub fn with_counter(key: &[u8; 16], u: usize, r: Vec<u8>, pad: bool) -> Self {
        let p = generate_plaintexts(key);
        let ku = generate_updated_keys(key);
        LrpEngine { p, kp: ku[u], r, pad }
    }

    /// LRICB encrypt (`LRICBEnc`). Mutates the internal counter, one
    /// increment per 16-octet block processed.
    pub fn encrypt(&mut self, data: &[u8]) -> crate::error::Result<Vec<u8>> {
        let mut pt = data.to_vec();
        if self.pad {
            pt.push(0x80);
            while pt.len() % BLOCK_SIZE != 0 {
                pt.push(0x00);
            }
        } else if pt.is_empty() || pt.len() % BLOCK_SIZE != 0 {
            return Err(SdmError::InvalidMessage(
                "LRICB input must be a non-empty multiple of the block size",
            ));
        }

        let mut ct = Vec::with_capacity(pt.len());
        for block in pt.chunks_exact(BLOCK_SIZE) {
            let block: [u8; 16] = block.try_into().expect("chunks_exact(16)");
            let y = eval_lrp(&self.p, &self.kp, &self.r, true);
            ct.extend_from_slice(&encrypt_block(&y, &block));
            self.r = incr_counter(&self.r);
        }
        Ok(ct)
    }

    /// LRICB decrypt (`LRICBDec`). Mutates the internal counter the same way
    /// `encrypt` does.
    pub fn decrypt(&mut self, data: &[u8]) -> crate::error::Result<Vec<u8>> {
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(SdmError::InvalidMessage(
                "LRICB input must be a non-empty multiple of the block size",
            ));
        }

        let mut pt = Vec::with_capacity(data.len());
        for block in data.chunks_exact(BLOCK_SIZE) {
            let block: [u8; 16] = block.try_into().expect("chunks_exact(16)");
            let y = eval_lrp(&self.p, &self.kp, &self.r, true);
            pt.extend_from_slice(&decrypt_block(&y, &block));
            self.r = incr_counter(&self.r);
        }

        if self.pad {
            remove_pad(&pt)
        } else {
            Ok(pt)
        }
    }

    /// LRP-CMAC. Depends only on the key and `data`, never on the engine's
    /// counter state — two engines built with different `r` produce the same
    /// `cmac` output for the same key and message.
    pub fn cmac(&self, data: &[u8]) -> [u8; 16] {
        let k0 = eval_lrp(&self.p, &self.kp, &[0u8; BLOCK_SIZE], true);
        let k1 = dbl(k0);
        let k2 = dbl(k1);

        let mut y = [0u8; BLOCK_SIZE];
        let mut offset = 0;
        while data.len() - offset > BLOCK_SIZE {
            let block: [u8; 16] = data[offset..offset + BLOCK_SIZE].try_into().unwrap();
            y = xor_block(&y, &block);
            y = eval_lrp(&self.p, &self.kp, &y, true);
            offset += BLOCK_SIZE;
        }

        let last = &data[offset..];
        let (last_block, subkey) = if last.len() == BLOCK_SIZE {
            let block: [u8; 16] = last.try_into().unwrap();
            (block, k1)
        } else {
            let mut padded = [0u8; BLOCK_SIZE];
            padded[..last.len()].copy_from_slice(last);
            padded[last.len()] = 0x80;
            (padded, k2)
        };

        y = xor_block(&last_block, &y);
        y = xor_block(&y, &subkey);
        eval_lrp(&self.p, &self.kp, &y, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex16(s: &str) -> [u8; 16] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn incr_counter_wraps_to_zero() {
        assert_eq!(incr_counter(&[0x00]), vec![0x01]);
        assert_eq!(incr_counter(&[0x01]), vec![0x02]);
        assert_eq!(incr_counter(&[0xFF]), vec![0x00]);
        assert_eq!(incr_counter(&hex::decode("1211").unwrap()), hex::decode("1212").unwrap());
        assert_eq!(incr_counter(&hex::decode("FFFF").unwrap()), hex::decode("0000").unwrap());
        assert_eq!(incr_counter(&hex::decode("0000").unwrap()), hex::decode("0001").unwrap());
        assert_eq!(incr_counter(&hex::decode("0001").unwrap()), hex::decode("0002").unwrap());
        assert_eq!(
            incr_counter(&hex::decode("FFFFFFFF").unwrap()),
            hex::decode("00000000").unwrap()
        );
    }

    #[test]
    fn generate_plaintexts_vector() {
        let k = hex16("567826B8DA8E768432A9548DBE4AA3A0");
        let p = generate_plaintexts(&k);
        assert_eq!(hex::encode_upper(p[0]), "AC20D39F5341FE98DFCA21DA86BA7914");
        assert_eq!(hex::encode_upper(p[15]), "71B444AF257A93215311D758DD333247");
    }

    #[test]
    fn generate_updated_keys_vector() {
        let k = hex16("567826B8DA8E768432A9548DBE4AA3A0");
        let uk = generate_updated_keys(&k);
        assert_eq!(hex::encode_upper(uk[0]), "163D14ED24ED935373568EC521E96CF4");
        assert_eq!(hex::encode_upper(uk[2]), "FE30AB50467E61783BFE6B5E0560160E");
    }

    #[test]
    fn nibbles_vector() {
        assert_eq!(nibbles(&[0x13, 0x59]).collect::<Vec<_>>(), vec![1, 3, 5, 9]);
        let x = hex::decode("4B073B247CD48F7E0A").unwrap();
        assert_eq!(
            nibbles(&x).collect::<Vec<_>>(),
            vec![4, 0xB, 0, 7, 3, 0xB, 2, 4, 7, 0xC, 0xD, 4, 8, 0xF, 7, 0xE, 0, 0xA]
        );
    }

    #[test]
    fn eval_lrp_vectors() {
        let k = hex16("567826B8DA8E768432A9548DBE4AA3A0");
        let p = generate_plaintexts(&k);
        let uk = generate_updated_keys(&k);
        assert_eq!(
            hex::encode_upper(eval_lrp(&p, &uk[2], &[0x13, 0x59], true)),
            "1BA2C0C578996BC497DD181C6885A9DD"
        );

        let k = hex16("88B95581002057A93E421EFE4076338B");
        let p = generate_plaintexts(&k);
        let uk = generate_updated_keys(&k);
        assert_eq!(
            hex::encode_upper(eval_lrp(&p, &uk[2], &[0x77, 0x29, 0x9D], true)),
            "E9C04556A214AC3297B83E4BDF46F142"
        );

        let k = hex16("9AFF3EF56FFEC3153B1CADB48B445409");
        let p = generate_plaintexts(&k);
        let uk = generate_updated_keys(&k);
        let x = hex::decode("4B073B247CD48F7E0A").unwrap();
        assert_eq!(
            hex::encode_upper(eval_lrp(&p, &uk[3], &x, false)),
            "909415E5C8BE77563050F2227E17C0E4"
        );
    }

    #[test]
    fn lricb_round_trip_vector() {
        let key = hex16("E0C4935FF0C254CD2CEF8FDDC32460CF");
        let pt = hex::decode("012D7F1653CAF6503C6AB0C1010E8CB0").unwrap();

        let mut enc = LrpEngine::with_counter(&key, 0, hex::decode("C3315DBF").unwrap(), true);
        let ct = enc.encrypt(&pt).unwrap();
        assert_eq!(
            hex::encode_upper(&ct),
            "FCBBACAA4F29182464F99DE41085266F480E863E487BAAF687B43ED1ECE0D623"
        );

        let mut dec = LrpEngine::with_counter(&key, 0, hex::decode("C3315DBF").unwrap(), true);
        let back = dec.decrypt(&ct).unwrap();
        assert_eq!(hex::encode_upper(&back), "012D7F1653CAF6503C6AB0C1010E8CB0");
    }

    #[test]
    fn lricb_decrypt_rejects_bad_padding() {
        let key = hex16("E0C4935FF0C254CD2CEF8FDDC32460CF");
        let mut junk = vec![0x41u8; BLOCK_SIZE];
        junk[0] = 0x01; // arbitrary ciphertext, decrypts to something without a 0x80 trailer
        let mut eng = LrpEngine::with_counter(&key, 0, hex::decode("C3315DBF").unwrap(), true);
        assert!(eng.decrypt(&junk).is_err());
    }

    #[test]
    fn cmac_vectors() {
        let k = hex16("8195088CE6C393708EBBE6C7914ECB0B");
        let eng = LrpEngine::new(&k, 0);
        assert_eq!(
            hex::encode_upper(eng.cmac(&hex::decode("BBD5B85772C7").unwrap())),
            "AD8595E0B49C5C0DB18E77355F5AAFF6"
        );

        let k = hex16("E2F84A0B0AF40EFEB3EEA215A436605C");
        let eng = LrpEngine::new(&k, 0);
        assert_eq!(
            hex::encode_upper(eng.cmac(&hex::decode("8BF1DDA9FE445560A4F4EB9CE0").unwrap())),
            "D04382DF71BC293FEC4BB10BDB13805F"
        );

        let k = hex16("5AA9F6C6DE5138113DF5D6B6C77D5D52");
        let eng = LrpEngine::new(&k, 0);
        assert_eq!(
            hex::encode_upper(eng.cmac(&hex::decode("A4434D740C2CB665FE5396959189383F").unwrap())),
            "8B43ADF767E46B692E8F24E837CB5EFC"
        );
    }

    #[test]
    fn cmac_independent_of_counter_state() {
        let k = hex16("8195088CE6C393708EBBE6C7914ECB0B");
        let msg = hex::decode("BBD5B85772C7").unwrap();

        let fresh = LrpEngine::new(&k, 0);
        let mut advanced = LrpEngine::new(&k, 0);
        let _ = advanced.encrypt(&[0u8; BLOCK_SIZE]).unwrap();
        let _ = advanced.encrypt(&[1u8; BLOCK_SIZE]).unwrap();

        assert_eq!(fresh.cmac(&msg), advanced.cmac(&msg));
    }
}
