//! Glyph-name to Unicode mapping.
//!
//! A working subset of the Adobe Glyph List covering Latin text, punctuation
//! and the f-ligatures, plus the algorithmic `uniXXXX`/`uXXXXXX` forms. The
//! list and the ligature table are process-wide, read-only tables.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Look a glyph name up, returning its Unicode text.
///
/// Suffixed names (`a.sc`, `one.oldstyle`) fall back to their base name, as
/// the glyph-list conventions prescribe.
pub(crate) fn unicode_for_glyph_name(name: &str) -> Option<String> {
    if name.is_empty() || name == ".notdef" {
        return None;
    }

    // uni0041 and u0041 / u1F600 forms.
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 {
            if let Some(c) = u32::from_str_radix(&hex[..4], 16)
                .ok()
                .and_then(char::from_u32)
            {
                return Some(c.to_string());
            }
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(c.to_string());
            }
        }
    }

    // Single ASCII letters and digits name themselves.
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c.to_string());
        }
    }

    if let Some(c) = GLYPH_LIST.get(name) {
        return Some(c.to_string());
    }

    // Drop a variant suffix and retry once.
    if let Some((base, _)) = name.split_once('.') {
        return unicode_for_glyph_name(base);
    }

    None
}

/// Rewrite ligature characters into their component letters. Applied before
/// the collision check so that two spellings of the same text compare equal.
pub(crate) fn normalize_ligatures(text: &str) -> String {
    if !text.chars().any(|c| LIGATURES.contains_key(&c)) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match LIGATURES.get(&c) {
            Some(expansion) => out.push_str(expansion),
            None => out.push(c),
        }
    }
    out
}

static LIGATURES: Lazy<FxHashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('\u{fb00}', "ff"),
        ('\u{fb01}', "fi"),
        ('\u{fb02}', "fl"),
        ('\u{fb03}', "ffi"),
        ('\u{fb04}', "ffl"),
        ('\u{fb05}', "ft"),
        ('\u{fb06}', "st"),
        ('\u{0132}', "IJ"),
        ('\u{0133}', "ij"),
    ]
    .into_iter()
    .collect()
});

static GLYPH_LIST: Lazy<FxHashMap<&'static str, char>> =
    Lazy::new(|| GLYPHS.iter().copied().collect());

#[rustfmt::skip]
const GLYPHS: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("parenleft", '('), ("parenright", ')'), ("asterisk", '*'), ("plus", '+'),
    ("comma", ','), ("hyphen", '-'), ("period", '.'), ("slash", '/'),
    ("zero", '0'), ("one", '1'), ("two", '2'), ("three", '3'), ("four", '4'),
    ("five", '5'), ("six", '6'), ("seven", '7'), ("eight", '8'), ("nine", '9'),
    ("colon", ':'), ("semicolon", ';'), ("less", '<'), ("equal", '='),
    ("greater", '>'), ("question", '?'), ("at", '@'), ("bracketleft", '['),
    ("backslash", '\\'), ("bracketright", ']'), ("asciicircum", '^'),
    ("underscore", '_'), ("grave", '`'), ("braceleft", '{'), ("bar", '|'),
    ("braceright", '}'), ("asciitilde", '~'),

    ("quoteleft", '\u{2018}'), ("quoteright", '\u{2019}'),
    ("quotedblleft", '\u{201c}'), ("quotedblright", '\u{201d}'),
    ("quotesinglbase", '\u{201a}'), ("quotedblbase", '\u{201e}'),
    ("guillemotleft", '\u{ab}'), ("guillemotright", '\u{bb}'),
    ("guilsinglleft", '\u{2039}'), ("guilsinglright", '\u{203a}'),
    ("endash", '\u{2013}'), ("emdash", '\u{2014}'), ("bullet", '\u{2022}'),
    ("dagger", '\u{2020}'), ("daggerdbl", '\u{2021}'), ("ellipsis", '\u{2026}'),
    ("perthousand", '\u{2030}'), ("trademark", '\u{2122}'),
    ("copyright", '\u{a9}'), ("registered", '\u{ae}'), ("degree", '\u{b0}'),
    ("plusminus", '\u{b1}'), ("multiply", '\u{d7}'), ("divide", '\u{f7}'),
    ("onehalf", '\u{bd}'), ("onequarter", '\u{bc}'), ("threequarters", '\u{be}'),
    ("onesuperior", '\u{b9}'), ("twosuperior", '\u{b2}'),
    ("threesuperior", '\u{b3}'), ("mu", '\u{b5}'), ("paragraph", '\u{b6}'),
    ("section", '\u{a7}'), ("periodcentered", '\u{b7}'), ("cedilla", '\u{b8}'),
    ("ordfeminine", '\u{aa}'), ("ordmasculine", '\u{ba}'),
    ("exclamdown", '\u{a1}'), ("questiondown", '\u{bf}'), ("cent", '\u{a2}'),
    ("sterling", '\u{a3}'), ("currency", '\u{a4}'), ("yen", '\u{a5}'),
    ("brokenbar", '\u{a6}'), ("dieresis", '\u{a8}'), ("macron", '\u{af}'),
    ("acute", '\u{b4}'), ("logicalnot", '\u{ac}'), ("florin", '\u{192}'),
    ("fraction", '\u{2044}'), ("minus", '\u{2212}'), ("Euro", '\u{20ac}'),
    ("circumflex", '\u{2c6}'), ("tilde", '\u{2dc}'), ("breve", '\u{2d8}'),
    ("dotaccent", '\u{2d9}'), ("ring", '\u{2da}'), ("ogonek", '\u{2db}'),
    ("hungarumlaut", '\u{2dd}'), ("caron", '\u{2c7}'),
    ("nbspace", '\u{a0}'), ("softhyphen", '\u{ad}'),

    ("Agrave", '\u{c0}'), ("Aacute", '\u{c1}'), ("Acircumflex", '\u{c2}'),
    ("Atilde", '\u{c3}'), ("Adieresis", '\u{c4}'), ("Aring", '\u{c5}'),
    ("AE", '\u{c6}'), ("Ccedilla", '\u{c7}'), ("Egrave", '\u{c8}'),
    ("Eacute", '\u{c9}'), ("Ecircumflex", '\u{ca}'), ("Edieresis", '\u{cb}'),
    ("Igrave", '\u{cc}'), ("Iacute", '\u{cd}'), ("Icircumflex", '\u{ce}'),
    ("Idieresis", '\u{cf}'), ("Eth", '\u{d0}'), ("Ntilde", '\u{d1}'),
    ("Ograve", '\u{d2}'), ("Oacute", '\u{d3}'), ("Ocircumflex", '\u{d4}'),
    ("Otilde", '\u{d5}'), ("Odieresis", '\u{d6}'), ("Oslash", '\u{d8}'),
    ("Ugrave", '\u{d9}'), ("Uacute", '\u{da}'), ("Ucircumflex", '\u{db}'),
    ("Udieresis", '\u{dc}'), ("Yacute", '\u{dd}'), ("Thorn", '\u{de}'),
    ("germandbls", '\u{df}'),
    ("agrave", '\u{e0}'), ("aacute", '\u{e1}'), ("acircumflex", '\u{e2}'),
    ("atilde", '\u{e3}'), ("adieresis", '\u{e4}'), ("aring", '\u{e5}'),
    ("ae", '\u{e6}'), ("ccedilla", '\u{e7}'), ("egrave", '\u{e8}'),
    ("eacute", '\u{e9}'), ("ecircumflex", '\u{ea}'), ("edieresis", '\u{eb}'),
    ("igrave", '\u{ec}'), ("iacute", '\u{ed}'), ("icircumflex", '\u{ee}'),
    ("idieresis", '\u{ef}'), ("eth", '\u{f0}'), ("ntilde", '\u{f1}'),
    ("ograve", '\u{f2}'), ("oacute", '\u{f3}'), ("ocircumflex", '\u{f4}'),
    ("otilde", '\u{f5}'), ("odieresis", '\u{f6}'), ("oslash", '\u{f8}'),
    ("ugrave", '\u{f9}'), ("uacute", '\u{fa}'), ("ucircumflex", '\u{fb}'),
    ("udieresis", '\u{fc}'), ("yacute", '\u{fd}'), ("thorn", '\u{fe}'),
    ("ydieresis", '\u{ff}'), ("Ydieresis", '\u{178}'),
    ("OE", '\u{152}'), ("oe", '\u{153}'), ("Scaron", '\u{160}'),
    ("scaron", '\u{161}'), ("Zcaron", '\u{17d}'), ("zcaron", '\u{17e}'),
    ("Lslash", '\u{141}'), ("lslash", '\u{142}'), ("dotlessi", '\u{131}'),

    ("ff", '\u{fb00}'), ("fi", '\u{fb01}'), ("fl", '\u{fb02}'),
    ("ffi", '\u{fb03}'), ("ffl", '\u{fb04}'),

    ("notequal", '\u{2260}'), ("infinity", '\u{221e}'),
    ("lessequal", '\u{2264}'), ("greaterequal", '\u{2265}'),
    ("partialdiff", '\u{2202}'), ("summation", '\u{2211}'),
    ("product", '\u{220f}'), ("pi", '\u{3c0}'), ("integral", '\u{222b}'),
    ("Omega", '\u{3a9}'), ("radical", '\u{221a}'), ("approxequal", '\u{2248}'),
    ("Delta", '\u{394}'), ("lozenge", '\u{25ca}'), ("apple", '\u{f8ff}'),
];

#[cfg(test)]
mod tests {
    use super::{normalize_ligatures, unicode_for_glyph_name};

    #[test]
    fn single_letters_name_themselves() {
        assert_eq!(unicode_for_glyph_name("A").as_deref(), Some("A"));
        assert_eq!(unicode_for_glyph_name("z").as_deref(), Some("z"));
    }

    #[test]
    fn table_names() {
        assert_eq!(unicode_for_glyph_name("eacute").as_deref(), Some("é"));
        assert_eq!(unicode_for_glyph_name("emdash").as_deref(), Some("\u{2014}"));
    }

    #[test]
    fn uni_form() {
        assert_eq!(unicode_for_glyph_name("uni0041").as_deref(), Some("A"));
        assert_eq!(unicode_for_glyph_name("u1F600").as_deref(), Some("\u{1f600}"));
    }

    #[test]
    fn suffixes_fall_back() {
        assert_eq!(unicode_for_glyph_name("one.oldstyle").as_deref(), Some("1"));
    }

    #[test]
    fn notdef_has_no_text() {
        assert_eq!(unicode_for_glyph_name(".notdef"), None);
        assert_eq!(unicode_for_glyph_name("glyph42"), None);
    }

    #[test]
    fn ligatures_expand() {
        assert_eq!(normalize_ligatures("e\u{fb03}cient"), "efficient");
        assert_eq!(normalize_ligatures("plain"), "plain");
    }
}
