//! Names.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A name object: an interned atom.
///
/// `#xx` escapes are decoded by the lexer, so two spellings of the same name
/// compare equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a name from its decoded text.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// The decoded text of the name, without the leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Well-known dictionary keys.
pub mod keys {
    macro_rules! key {
        ($(#[$doc:meta])* $name:ident, $lit:literal) => {
            $(#[$doc])*
            pub const $name: &str = $lit;
        };
    }

    key!(/** `/Type` */ TYPE, "Type");
    key!(/** `/Subtype` */ SUBTYPE, "Subtype");
    key!(/** `/Length` */ LENGTH, "Length");
    key!(/** `/Filter` */ FILTER, "Filter");
    key!(/** `/DecodeParms` */ DECODE_PARMS, "DecodeParms");
    key!(/** `/Root` */ ROOT, "Root");
    key!(/** `/Info` */ INFO, "Info");
    key!(/** `/Size` */ SIZE, "Size");
    key!(/** `/Prev` */ PREV, "Prev");
    key!(/** `/XRefStm` */ XREF_STM, "XRefStm");
    key!(/** `/Encrypt` */ ENCRYPT, "Encrypt");
    key!(/** `/Index` */ INDEX, "Index");
    key!(/** `/W` */ W, "W");
    key!(/** `/N` */ N, "N");
    key!(/** `/First` */ FIRST, "First");
    key!(/** `/Version` */ VERSION, "Version");
    key!(/** `/Pages` */ PAGES, "Pages");
    key!(/** `/Kids` */ KIDS, "Kids");
    key!(/** `/Count` */ COUNT, "Count");
    key!(/** `/MediaBox` */ MEDIA_BOX, "MediaBox");
    key!(/** `/CropBox` */ CROP_BOX, "CropBox");
    key!(/** `/Rotate` */ ROTATE, "Rotate");
    key!(/** `/Resources` */ RESOURCES, "Resources");
    key!(/** `/Contents` */ CONTENTS, "Contents");
    key!(/** `/Font` */ FONT, "Font");
    key!(/** `/XObject` */ XOBJECT, "XObject");
    key!(/** `/ExtGState` */ EXT_G_STATE, "ExtGState");
    key!(/** `/ColorSpace` */ COLOR_SPACE, "ColorSpace");
    key!(/** `/Shading` */ SHADING, "Shading");
    key!(/** `/Pattern` */ PATTERN, "Pattern");
    key!(/** `/Properties` */ PROPERTIES, "Properties");
    key!(/** `/Width` */ WIDTH, "Width");
    key!(/** `/Height` */ HEIGHT, "Height");
    key!(/** `/BitsPerComponent` */ BITS_PER_COMPONENT, "BitsPerComponent");
    key!(/** `/ImageMask` */ IMAGE_MASK, "ImageMask");
    key!(/** `/Decode` */ DECODE, "Decode");
    key!(/** `/Interpolate` */ INTERPOLATE, "Interpolate");
    key!(/** `/SMask` */ SMASK, "SMask");
    key!(/** `/BBox` */ BBOX, "BBox");
    key!(/** `/Matrix` */ MATRIX, "Matrix");
    key!(/** `/Group` */ GROUP, "Group");
    key!(/** `/S` */ S, "S");
    key!(/** `/BaseFont` */ BASE_FONT, "BaseFont");
    key!(/** `/FontDescriptor` */ FONT_DESCRIPTOR, "FontDescriptor");
    key!(/** `/FontFile` */ FONT_FILE, "FontFile");
    key!(/** `/FontFile2` */ FONT_FILE2, "FontFile2");
    key!(/** `/FontFile3` */ FONT_FILE3, "FontFile3");
    key!(/** `/FontName` */ FONT_NAME, "FontName");
    key!(/** `/Flags` */ FLAGS, "Flags");
    key!(/** `/FirstChar` */ FIRST_CHAR, "FirstChar");
    key!(/** `/LastChar` */ LAST_CHAR, "LastChar");
    key!(/** `/Widths` */ WIDTHS, "Widths");
    key!(/** `/MissingWidth` */ MISSING_WIDTH, "MissingWidth");
    key!(/** `/Encoding` */ ENCODING, "Encoding");
    key!(/** `/BaseEncoding` */ BASE_ENCODING, "BaseEncoding");
    key!(/** `/Differences` */ DIFFERENCES, "Differences");
    key!(/** `/ToUnicode` */ TO_UNICODE, "ToUnicode");
    key!(/** `/DescendantFonts` */ DESCENDANT_FONTS, "DescendantFonts");
    key!(/** `/CIDToGIDMap` */ CID_TO_GID_MAP, "CIDToGIDMap");
    key!(/** `/CIDSystemInfo` */ CID_SYSTEM_INFO, "CIDSystemInfo");
    key!(/** `/DW` */ DW, "DW");
    key!(/** `/CharProcs` */ CHAR_PROCS, "CharProcs");
    key!(/** `/FontMatrix` */ FONT_MATRIX, "FontMatrix");
    key!(/** `/Title` */ TITLE, "Title");
    key!(/** `/Author` */ AUTHOR, "Author");
    key!(/** `/Subject` */ SUBJECT, "Subject");
    key!(/** `/Keywords` */ KEYWORDS, "Keywords");
    key!(/** `/Creator` */ CREATOR, "Creator");
    key!(/** `/Producer` */ PRODUCER, "Producer");
    key!(/** `/CreationDate` */ CREATION_DATE, "CreationDate");
    key!(/** `/ModDate` */ MOD_DATE, "ModDate");
    key!(/** `/Predictor` */ PREDICTOR, "Predictor");
    key!(/** `/Colors` */ COLORS, "Colors");
    key!(/** `/Columns` */ COLUMNS, "Columns");
    key!(/** `/EarlyChange` */ EARLY_CHANGE, "EarlyChange");
    key!(/** `/FunctionType` */ FUNCTION_TYPE, "FunctionType");
    key!(/** `/Domain` */ DOMAIN, "Domain");
    key!(/** `/Range` */ RANGE, "Range");
    key!(/** `/C0` */ C0, "C0");
    key!(/** `/C1` */ C1, "C1");
    key!(/** `/Functions` */ FUNCTIONS, "Functions");
    key!(/** `/Function` */ FUNCTION, "Function");
    key!(/** `/Bounds` */ BOUNDS, "Bounds");
    key!(/** `/Encode` */ ENCODE, "Encode");
    key!(/** `/BitsPerSample` */ BITS_PER_SAMPLE, "BitsPerSample");
    key!(/** `/ShadingType` */ SHADING_TYPE, "ShadingType");
    key!(/** `/Coords` */ COORDS, "Coords");
    key!(/** `/Extend` */ EXTEND, "Extend");
}

#[cfg(test)]
mod tests {
    use super::Name;

    #[test]
    fn equality_with_str() {
        let n = Name::new("Pages");
        assert_eq!(n, "Pages");
        assert_eq!(n.as_str(), "Pages");
    }
}
