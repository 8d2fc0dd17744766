//! Recognition results and scan option masks.
//!
//! A `ScanResult` is what an engine hands back for a frame: a kind tag plus
//! a byte payload whose interpretation depends on the tag:
//! - `Ean8` / `Ean13`: decoded barcode digits (ASCII)
//! - `QrCode` / `DataMatrix`: raw, unparsed payload bytes
//! - `Image`: opaque identifier of the matched reference image
//! - `None`: the "no match" outcome of an online search
//!
//! `ScanOptions` is the bitmask of kinds a session is willing to recognize.
//! Bit values are stable and part of the public contract, so masks can be
//! persisted in config files or passed across process boundaries.

use std::fmt;

/// Kind tag of a scan result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// No match (only produced by online searches).
    None,
    /// EAN8 linear barcode.
    Ean8,
    /// EAN13 linear barcode.
    Ean13,
    /// QR Code 2D barcode.
    QrCode,
    /// Datamatrix 2D barcode.
    DataMatrix,
    /// Image match against a reference database.
    Image,
}

impl ResultKind {
    /// Bit of this kind inside a `ScanOptions` mask. `None` has no bit.
    pub fn mask_bit(self) -> u32 {
        match self {
            ResultKind::None => 0,
            ResultKind::Ean8 => 1 << 0,
            ResultKind::Ean13 => 1 << 1,
            ResultKind::QrCode => 1 << 2,
            ResultKind::DataMatrix => 1 << 3,
            ResultKind::Image => 1 << 31,
        }
    }

    /// Stable lowercase label, used by config files and structured logs.
    pub fn label(self) -> &'static str {
        match self {
            ResultKind::None => "none",
            ResultKind::Ean8 => "ean8",
            ResultKind::Ean13 => "ean13",
            ResultKind::QrCode => "qrcode",
            ResultKind::DataMatrix => "datamatrix",
            ResultKind::Image => "image",
        }
    }

    /// Parse a label produced by `label()`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "none" => Some(ResultKind::None),
            "ean8" => Some(ResultKind::Ean8),
            "ean13" => Some(ResultKind::Ean13),
            "qrcode" => Some(ResultKind::QrCode),
            "datamatrix" => Some(ResultKind::DataMatrix),
            "image" => Some(ResultKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ----------------------------------------------------------------------------
// ScanOptions: bitmask of recognizable kinds
// ----------------------------------------------------------------------------

/// Bitmask of result kinds a session is willing to recognize.
///
/// Combine with `|`. An empty mask admits nothing; `ScanOptions::ALL` admits
/// every supported kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions(u32);

impl ScanOptions {
    pub const NONE: ScanOptions = ScanOptions(0);
    pub const EAN8: ScanOptions = ScanOptions(1 << 0);
    pub const EAN13: ScanOptions = ScanOptions(1 << 1);
    pub const QRCODE: ScanOptions = ScanOptions(1 << 2);
    pub const DATAMATRIX: ScanOptions = ScanOptions(1 << 3);
    pub const IMAGE: ScanOptions = ScanOptions(1 << 31);
    pub const ALL: ScanOptions = ScanOptions(1 | 1 << 1 | 1 << 2 | 1 << 3 | 1 << 31);

    pub fn from_bits(bits: u32) -> Self {
        ScanOptions(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether results of `kind` are admitted by this mask.
    pub fn admits(self, kind: ResultKind) -> bool {
        let bit = kind.mask_bit();
        bit != 0 && self.0 & bit != 0
    }

    /// Parse a mask from kind labels, e.g. `["qrcode", "ean13"]`.
    ///
    /// Unknown labels are rejected so config typos fail loudly.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> anyhow::Result<Self> {
        let mut mask = ScanOptions::NONE;
        for label in labels {
            let label = label.as_ref();
            let kind = ResultKind::from_label(label)
                .ok_or_else(|| anyhow::anyhow!("unknown scan option '{}'", label))?;
            if kind == ResultKind::None {
                return Err(anyhow::anyhow!("'none' is not a valid scan option"));
            }
            mask = mask | ScanOptions(kind.mask_bit());
        }
        Ok(mask)
    }

    /// Labels of the kinds admitted by this mask, in bit order.
    pub fn labels(self) -> Vec<&'static str> {
        [
            ResultKind::Ean8,
            ResultKind::Ean13,
            ResultKind::QrCode,
            ResultKind::DataMatrix,
            ResultKind::Image,
        ]
        .into_iter()
        .filter(|kind| self.admits(*kind))
        .map(|kind| kind.label())
        .collect()
    }
}

impl std::ops::BitOr for ScanOptions {
    type Output = ScanOptions;

    fn bitor(self, rhs: ScanOptions) -> ScanOptions {
        ScanOptions(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ScanOptions {
    fn bitor_assign(&mut self, rhs: ScanOptions) {
        self.0 |= rhs.0;
    }
}

// ----------------------------------------------------------------------------
// ScanResult
// ----------------------------------------------------------------------------

/// A recognition outcome. Immutable once constructed; equality is structural
/// (kind + payload bytes), which is what result deduplication keys on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScanResult {
    kind: ResultKind,
    payload: Vec<u8>,
}

impl ScanResult {
    pub fn new(kind: ResultKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// The "no match" outcome of an online search.
    pub fn none() -> Self {
        Self {
            kind: ResultKind::None,
            payload: Vec::new(),
        }
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_none(&self) -> bool {
        self.kind == ResultKind::None
    }

    /// Payload as a UTF-8 string, lossy. Barcode digits and image IDs are
    /// ASCII; QR/Datamatrix payloads may not be, use `payload()` for those.
    pub fn value(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            return write!(f, "{}", self.kind);
        }
        match std::str::from_utf8(&self.payload) {
            Ok(text) => write!(f, "{}:{}", self.kind, text),
            Err(_) => write!(f, "{}:0x{}", self.kind, hex::encode(&self.payload)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bits_match_wire_values() {
        assert_eq!(ScanOptions::EAN8.bits(), 1);
        assert_eq!(ScanOptions::EAN13.bits(), 2);
        assert_eq!(ScanOptions::QRCODE.bits(), 4);
        assert_eq!(ScanOptions::DATAMATRIX.bits(), 8);
        assert_eq!(ScanOptions::IMAGE.bits(), 1 << 31);
    }

    #[test]
    fn admits_respects_mask() {
        let mask = ScanOptions::QRCODE | ScanOptions::EAN13;
        assert!(mask.admits(ResultKind::QrCode));
        assert!(mask.admits(ResultKind::Ean13));
        assert!(!mask.admits(ResultKind::Ean8));
        assert!(!mask.admits(ResultKind::Image));
        assert!(!mask.admits(ResultKind::None));
        assert!(!ScanOptions::ALL.admits(ResultKind::None));
    }

    #[test]
    fn labels_round_trip() {
        let mask = ScanOptions::from_labels(&["ean8", "image"]).expect("parse labels");
        assert_eq!(mask, ScanOptions::EAN8 | ScanOptions::IMAGE);
        assert_eq!(mask.labels(), vec!["ean8", "image"]);
        assert!(ScanOptions::from_labels(&["qrc0de"]).is_err());
        assert!(ScanOptions::from_labels(&["none"]).is_err());
    }

    #[test]
    fn equality_is_structural() {
        let a = ScanResult::new(ResultKind::QrCode, b"hello".to_vec());
        let b = ScanResult::new(ResultKind::QrCode, b"hello".to_vec());
        let c = ScanResult::new(ResultKind::DataMatrix, b"hello".to_vec());
        let d = ScanResult::new(ResultKind::QrCode, b"other".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn display_falls_back_to_hex() {
        let text = ScanResult::new(ResultKind::Ean13, b"4006381333931".to_vec());
        assert_eq!(text.to_string(), "ean13:4006381333931");
        let binary = ScanResult::new(ResultKind::QrCode, vec![0xff, 0xfe]);
        assert_eq!(binary.to_string(), "qrcode:0xfffe");
        assert_eq!(ScanResult::none().to_string(), "none");
    }
}
