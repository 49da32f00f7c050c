// Demangler adapters.

use crate::ports::NameDemangler;

/// Demangles Rust symbol names (legacy and v0 manglings). Anything else is
/// left to the raw-name fallback.
pub struct RustcDemangler;

impl NameDemangler for RustcDemangler {
    fn demangle(&self, raw: &str) -> Option<String> {
        rustc_demangle::try_demangle(raw)
            .ok()
            .map(|sym| format!("{:#}", sym))
    }
}

/// For hosts whose names are already readable.
pub struct PassthroughDemangler;

impl NameDemangler for PassthroughDemangler {
    fn demangle(&self, _raw: &str) -> Option<String> {
        None
    }
}
