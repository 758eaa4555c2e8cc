//! Process-wide configuration, reified as a value instead of globals (C7 support).
//!
//! The donor service reads these from environment variables at startup
//! (`SDMMAC_PARAM`, `REQUIRE_LRP`, `DERIVE_MODE`) via its `clap`-derived
//! `Config`; parsing env vars and CLI flags is explicitly out of scope here
//! (see spec §1, §9), so this crate only defines the value type the caller
//! populates and passes in. No `clap::Parser` impl, no `env` attributes.

use crate::derive::DeriveMode;

/// Immutable, value-typed configuration for the SUN verifier façade.
///
/// Cheap to copy and pass by value; tests that need a different
/// configuration just construct a second `SdmConfig` rather than mutating
/// process state.
#[derive(Debug, Clone, Copy)]
pub struct SdmConfig {
    /// Which key-derivation regime [`crate::KeyMaterial`] should use.
    pub derive_mode: DeriveMode,
    /// If true, [`crate::decrypt_sun_message`] rejects AES-mode results at
    /// the façade boundary rather than accepting the weaker scheme.
    pub require_lrp: bool,
    /// The query-parameter name the caller's `enc` MAC input suffix is keyed
    /// on (e.g. `"cmac"`), or `""` if the caller never appends one. Only
    /// consulted in [`crate::types::ParamMode::Separated`] mode.
    pub sdmmac_param: &'static str,
    /// Which key slot [`crate::KeyMaterial::tag_key`] derives for MAC/file
    /// operations. NTAG 424 SDM configurations commonly dedicate key #2 to
    /// this role, leaving #1 for the undiversified meta-read key.
    pub file_key_no: u8,
}

impl Default for SdmConfig {
    fn default() -> Self {
        SdmConfig {
            derive_mode: DeriveMode::New,
            require_lrp: false,
            sdmmac_param: "cmac",
            file_key_no: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let cfg = SdmConfig::default();
        assert_eq!(cfg.derive_mode, DeriveMode::New);
        assert!(!cfg.require_lrp);
        assert_eq!(cfg.sdmmac_param, "cmac");
    }
}
