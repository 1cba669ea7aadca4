use serde::Deserialize;

/// Spatial reference system identifier.
///
/// Any value that is not positive means "unknown". Stores disagree on the
/// spelling of unknown (`-1` in old catalogs, `0` in newer ones), so both are
/// normalized to [`Srid::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "i32")]
pub struct Srid(i32);

impl Srid {
    pub const UNKNOWN: Srid = Srid(-1);

    pub const WGS84: Srid = Srid(4326);

    pub fn new(code: i32) -> Srid {
        if code > 0 {
            Srid(code)
        } else {
            Srid::UNKNOWN
        }
    }

    pub fn is_known(self) -> bool {
        self.0 > 0
    }

    /// The numeric code, `-1` when unknown.
    pub fn code(self) -> i32 {
        self.0
    }

    /// The numeric code if known.
    pub fn known(self) -> Option<i32> {
        self.is_known().then_some(self.0)
    }

    /// Returns `self` if known, otherwise `other`.
    pub fn or(self, other: Srid) -> Srid {
        if self.is_known() {
            self
        } else {
            other
        }
    }
}

impl Default for Srid {
    fn default() -> Self {
        Srid::UNKNOWN
    }
}

impl From<i32> for Srid {
    fn from(code: i32) -> Self {
        Srid::new(code)
    }
}

impl core::fmt::Display for Srid {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
