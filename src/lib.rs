//! SUN (Secure Unique NFC Message) decoding and verification for NXP NTAG
//! 424 DNA tags: recovers a tag's UID and monotonic read counter from a
//! dynamic authentication URL, verifies its MAC, and optionally decrypts an
//! attached file payload — in both the original AES scheme and the newer
//! Leakage Resilient Primitive (LRP) scheme.
//!
//! This crate is the cryptographic core only. It does not parse HTTP
//! requests, read environment variables, or render responses; a caller
//! embeds it by constructing an [`SdmConfig`] and [`KeyMaterial`] once and
//! calling [`decrypt_sun_message_bulk`]/[`decrypt_sun_message_separated`]/
//! [`validate_plain_sun`] per request.
//!
//! ```
//! use ntag424_sdm::{decrypt_sun_message_bulk, DeriveMode, KeyMaterial, SdmConfig};
//!
//! let config = SdmConfig::default();
//! let keys = KeyMaterial::new([0u8; 16], DeriveMode::New); // demo key
//! let result = decrypt_sun_message_bulk(
//!     &config,
//!     &keys,
//!     "EF963FF7828658A599F3041510671E8894EED9EE65337086",
//! ).unwrap();
//! assert_eq!(hex::encode_upper(&result.uid), "04DE5F1EACC040");
//! ```

pub mod block;
pub mod config;
pub mod derive;
pub mod error;
pub mod facade;
pub mod lrp;
pub mod params;
pub mod session;
pub mod sun;
pub mod types;

pub use config::SdmConfig;
pub use derive::{DeriveMode, KeyMaterial};
pub use error::{Result, SdmError};
pub use facade::{decrypt_sun_message, decrypt_sun_message_bulk, decrypt_sun_message_separated, validate_plain_sun};
pub use params::ParsedSun;
pub use types::{EncMode, ParamMode, PlainSunResult, SunResult};
