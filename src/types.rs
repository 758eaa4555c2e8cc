//! Small tagged-variant types shared across the SDM pipeline.

/// Which cryptographic scheme a PICCData block was produced with, inferred
/// from its ciphertext length (16 octets ⇒ AES, 24 octets ⇒ LRP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncMode {
    Aes,
    Lrp,
}

/// How the caller's query parameters were laid out.
///
/// `Bulk` packs `PICCData ‖ file? ‖ MAC` into a single hex blob (`e=`);
/// `Separated` passes them as distinct named parameters. This affects
/// whether the MAC input gets an `"&<param>="` suffix appended (see
/// [`crate::session::calculate_sdmmac`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Separated,
    Bulk,
}

/// Outcome of a successful full-SUN decode ([`crate::decrypt_sun_message`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SunResult {
    /// The raw PICCData flag byte (bit 7 = UID mirrored, bit 6 = counter mirrored, low nibble = UID length).
    pub picc_data_tag: u8,
    pub uid: Vec<u8>,
    /// 0 if the tag did not mirror a read counter.
    pub read_ctr: u32,
    pub file_data: Option<Vec<u8>>,
    pub encryption_mode: EncMode,
}

/// Outcome of a successful plain-SUN verification ([`crate::validate_plain_sun`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainSunResult {
    pub uid: Vec<u8>,
    pub read_ctr: u32,
    pub encryption_mode: EncMode,
}
