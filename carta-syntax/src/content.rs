//! Content-stream operations.
//!
//! [`ContentIter`] walks a content stream the way the imaging model does: a
//! parameter stack accumulates objects until an operator keyword is read, at
//! which point the pair is handed out as an [`Operation`]. [`Op::dispatch`]
//! turns an operation into a typed variant, checking operand arity.

use crate::lexer::TokenKind;
use crate::object::{Array, Dict, Name, Object, PdfString, Stream};
use crate::parser::Parser;
use crate::xref::XRef;
use log::warn;
use smallvec::SmallVec;

// Six operands cover transforms and cubics; more is rare.
const OPERAND_STACK: usize = 6;

/// The operand stack of a single operation.
pub type Operands = SmallVec<[Object; OPERAND_STACK]>;

/// A raw operation: operator bytes plus the operands collected before it.
pub struct Operation<'a> {
    /// The operator keyword, e.g. `Tj`.
    pub operator: &'a [u8],
    /// The operands, in the order they appeared.
    pub operands: Operands,
}

/// An iterator over the operations of a content stream.
pub struct ContentIter<'a> {
    parser: Parser<'a>,
    stack: Operands,
    // References cannot occur in content streams, so object parsing never
    // needs a real xref.
    no_xref: XRef,
    done: bool,
}

impl<'a> ContentIter<'a> {
    /// Iterate over the operations of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            parser: Parser::in_content_stream(data),
            stack: SmallVec::new(),
            no_xref: XRef::empty(),
            done: false,
        }
    }

    fn inline_image(&mut self) -> Option<Stream> {
        // The dictionary between BI and ID uses abbreviated keys.
        let mut entries = vec![];

        loop {
            let token = self.parser.lexer.try_token()?;
            match token.kind {
                TokenKind::Keyword(b"ID") => break,
                TokenKind::Name(key) => {
                    let value = self.parser.parse_object(&self.no_xref)?;
                    entries.push((Name::from(expand_inline_key(&key)), expand_inline_value(value)));
                }
                _ => return None,
            }
        }

        let dict = Dict::new(entries);

        // Exactly one white-space byte separates ID from the data.
        let data = self.parser.lexer.cursor.data();
        let mut start = self.parser.lexer.pos();
        if start < data.len() && crate::trivia::is_white_space(data[start]) {
            start += 1;
        }

        // The encoded data may itself contain the EI marker. Candidate end
        // positions are probed by decoding; the first that decodes wins.
        let mut pos = start;
        while pos + 2 <= data.len() {
            if &data[pos..pos + 2] == b"EI"
                && (pos + 2 == data.len() || !crate::trivia::is_regular(data[pos + 2]))
            {
                // The separating white space before EI is not image data.
                let mut end = pos;
                if end > start && crate::trivia::is_white_space(data[end - 1]) {
                    end -= 1;
                }

                let candidate = Stream::new(dict.clone(), data[start..end].to_vec());
                if candidate.decoded(&self.no_xref).is_ok() {
                    self.parser.lexer.seek(pos + 2);
                    return Some(candidate);
                }
            }
            pos += 1;
        }

        None
    }
}

impl<'a> Iterator for ContentIter<'a> {
    type Item = Operation<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.stack.clear();

        loop {
            // Operands first; anything that parses as an object is one.
            if let Some(obj) = self.parser.parse_object(&self.no_xref) {
                self.stack.push(obj);
                continue;
            }

            let token = match self.parser.lexer.try_token() {
                Some(t) => t,
                None => {
                    self.done = true;
                    return None;
                }
            };

            let TokenKind::Keyword(operator) = token.kind else {
                warn!("unreadable byte in content stream, stopping");
                self.done = true;
                return None;
            };

            if operator == b"BI" {
                match self.inline_image() {
                    Some(stream) => self.stack.push(Object::Stream(stream)),
                    None => {
                        warn!("unterminated inline image, stopping");
                        self.done = true;
                        return None;
                    }
                }
            }

            return Some(Operation {
                operator,
                operands: std::mem::take(&mut self.stack),
            });
        }
    }
}

fn expand_inline_key(key: &str) -> String {
    match key {
        "W" => "Width",
        "H" => "Height",
        "BPC" => "BitsPerComponent",
        "CS" => "ColorSpace",
        "F" => "Filter",
        "DP" => "DecodeParms",
        "IM" => "ImageMask",
        "D" => "Decode",
        "I" => "Interpolate",
        other => other,
    }
    .to_string()
}

fn expand_inline_value(value: Object) -> Object {
    let expand_name = |n: &Name| -> Option<Name> {
        Some(Name::new(match n.as_str() {
            "G" => "DeviceGray",
            "RGB" => "DeviceRGB",
            "CMYK" => "DeviceCMYK",
            "I" => "Indexed",
            _ => return None,
        }))
    };

    match &value {
        Object::Name(n) => expand_name(n).map(Object::Name).unwrap_or(value),
        Object::Array(arr) => Object::Array(Array::new(
            arr.iter()
                .map(|o| expand_inline_value(o.clone()))
                .collect(),
        )),
        _ => value,
    }
}

/// Why an operation failed to dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The operator is not part of the supported operator set.
    UnknownOperator,
    /// The operand stack didn't match the operator's arity or types.
    InvalidOperands,
}

/// A typed content-stream operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `q`
    SaveState,
    /// `Q`
    RestoreState,
    /// `cm`
    Concat([f32; 6]),
    /// `w`
    SetLineWidth(f32),
    /// `J`
    SetLineCap(i32),
    /// `j`
    SetLineJoin(i32),
    /// `M`
    SetMiterLimit(f32),
    /// `d`
    SetDash(Vec<f32>, f32),
    /// `ri`
    SetRenderingIntent(Name),
    /// `i`
    SetFlatness(f32),
    /// `gs`
    SetExtGState(Name),

    /// `m`
    MoveTo(f32, f32),
    /// `l`
    LineTo(f32, f32),
    /// `c`
    CurveTo([f32; 6]),
    /// `v`
    CurveToStart([f32; 4]),
    /// `y`
    CurveToEnd([f32; 4]),
    /// `h`
    ClosePath,
    /// `re`
    Rect([f32; 4]),

    /// `S`
    Stroke,
    /// `s`
    CloseStroke,
    /// `f` / `F`
    Fill,
    /// `f*`
    FillEvenOdd,
    /// `B`
    FillStroke,
    /// `B*`
    FillStrokeEvenOdd,
    /// `b`
    CloseFillStroke,
    /// `b*`
    CloseFillStrokeEvenOdd,
    /// `n`
    EndPath,

    /// `W`
    Clip,
    /// `W*`
    ClipEvenOdd,

    /// `CS`
    SetStrokeColorSpace(Name),
    /// `cs`
    SetFillColorSpace(Name),
    /// `SC`
    SetStrokeColor(Vec<f32>),
    /// `SCN`
    SetStrokeColorExtended(Vec<f32>, Option<Name>),
    /// `sc`
    SetFillColor(Vec<f32>),
    /// `scn`
    SetFillColorExtended(Vec<f32>, Option<Name>),
    /// `G`
    SetStrokeGray(f32),
    /// `g`
    SetFillGray(f32),
    /// `RG`
    SetStrokeRgb([f32; 3]),
    /// `rg`
    SetFillRgb([f32; 3]),
    /// `K`
    SetStrokeCmyk([f32; 4]),
    /// `k`
    SetFillCmyk([f32; 4]),

    /// `sh`
    Shading(Name),
    /// `Do`
    XObject(Name),
    /// `BI … ID … EI`
    InlineImage(Stream),

    /// `BT`
    BeginText,
    /// `ET`
    EndText,
    /// `Tc`
    SetCharSpacing(f32),
    /// `Tw`
    SetWordSpacing(f32),
    /// `Tz`
    SetHorizontalScaling(f32),
    /// `TL`
    SetLeading(f32),
    /// `Tf`
    SetFont(Name, f32),
    /// `Tr`
    SetTextRenderMode(i32),
    /// `Ts`
    SetRise(f32),
    /// `Td`
    NextLine(f32, f32),
    /// `TD`
    NextLineSetLeading(f32, f32),
    /// `Tm`
    SetTextMatrix([f32; 6]),
    /// `T*`
    NextLineDefault,
    /// `Tj`
    ShowText(PdfString),
    /// `'`
    ShowTextNextLine(PdfString),
    /// `"`
    ShowTextSpaced(f32, f32, PdfString),
    /// `TJ`
    ShowTextArray(Array),

    /// `d0`
    GlyphWidth(f32, f32),
    /// `d1`
    GlyphWidthBBox([f32; 6]),

    /// `MP`
    MarkedContentPoint(Name),
    /// `DP`
    MarkedContentPointProps(Name, Object),
    /// `BMC`
    BeginMarkedContent(Name),
    /// `BDC`
    BeginMarkedContentProps(Name, Object),
    /// `EMC`
    EndMarkedContent,

    /// `BX`
    BeginCompatibility,
    /// `EX`
    EndCompatibility,
}

impl Op {
    /// Dispatch a raw operation into its typed variant.
    pub fn dispatch(op: &Operation) -> Result<Op, DispatchError> {
        let s = &op.operands;

        let num = |i: usize| -> Result<f32, DispatchError> {
            s.get(i)
                .and_then(Object::as_f32)
                .ok_or(DispatchError::InvalidOperands)
        };
        let int = |i: usize| -> Result<i32, DispatchError> {
            s.get(i)
                .and_then(Object::as_i64)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or(DispatchError::InvalidOperands)
        };
        let name = |i: usize| -> Result<Name, DispatchError> {
            s.get(i)
                .and_then(Object::as_name)
                .cloned()
                .ok_or(DispatchError::InvalidOperands)
        };
        let string = |i: usize| -> Result<PdfString, DispatchError> {
            s.get(i)
                .and_then(Object::as_string)
                .cloned()
                .ok_or(DispatchError::InvalidOperands)
        };
        let six = || -> Result<[f32; 6], DispatchError> {
            Ok([num(0)?, num(1)?, num(2)?, num(3)?, num(4)?, num(5)?])
        };
        let four = || -> Result<[f32; 4], DispatchError> {
            Ok([num(0)?, num(1)?, num(2)?, num(3)?])
        };
        let all_nums = |from: usize, to: usize| -> Vec<f32> {
            s.iter()
                .skip(from)
                .take(to.saturating_sub(from))
                .filter_map(Object::as_f32)
                .collect()
        };

        let checked = |expected: usize, typed: Op| -> Result<Op, DispatchError> {
            if s.len() != expected {
                warn!(
                    "operator {} expected {} operands, got {}",
                    String::from_utf8_lossy(op.operator),
                    expected,
                    s.len()
                );
                return Err(DispatchError::InvalidOperands);
            }
            Ok(typed)
        };

        let result = match op.operator {
            b"q" => checked(0, Op::SaveState),
            b"Q" => checked(0, Op::RestoreState),
            b"cm" => checked(6, Op::Concat(six()?)),
            b"w" => checked(1, Op::SetLineWidth(num(0)?)),
            b"J" => checked(1, Op::SetLineCap(int(0)?)),
            b"j" => checked(1, Op::SetLineJoin(int(0)?)),
            b"M" => checked(1, Op::SetMiterLimit(num(0)?)),
            b"d" => {
                let arr = s
                    .first()
                    .and_then(Object::as_array)
                    .ok_or(DispatchError::InvalidOperands)?;
                let dashes = arr.iter().filter_map(Object::as_f32).collect();
                checked(2, Op::SetDash(dashes, num(1)?))
            }
            b"ri" => checked(1, Op::SetRenderingIntent(name(0)?)),
            b"i" => checked(1, Op::SetFlatness(num(0)?)),
            b"gs" => checked(1, Op::SetExtGState(name(0)?)),

            b"m" => checked(2, Op::MoveTo(num(0)?, num(1)?)),
            b"l" => checked(2, Op::LineTo(num(0)?, num(1)?)),
            b"c" => checked(6, Op::CurveTo(six()?)),
            b"v" => checked(4, Op::CurveToStart(four()?)),
            b"y" => checked(4, Op::CurveToEnd(four()?)),
            b"h" => checked(0, Op::ClosePath),
            b"re" => checked(4, Op::Rect(four()?)),

            b"S" => checked(0, Op::Stroke),
            b"s" => checked(0, Op::CloseStroke),
            b"f" | b"F" => checked(0, Op::Fill),
            b"f*" => checked(0, Op::FillEvenOdd),
            b"B" => checked(0, Op::FillStroke),
            b"B*" => checked(0, Op::FillStrokeEvenOdd),
            b"b" => checked(0, Op::CloseFillStroke),
            b"b*" => checked(0, Op::CloseFillStrokeEvenOdd),
            b"n" => checked(0, Op::EndPath),

            b"W" => checked(0, Op::Clip),
            b"W*" => checked(0, Op::ClipEvenOdd),

            b"CS" => checked(1, Op::SetStrokeColorSpace(name(0)?)),
            b"cs" => checked(1, Op::SetFillColorSpace(name(0)?)),
            b"SC" => Ok(Op::SetStrokeColor(all_nums(0, s.len()))),
            b"sc" => Ok(Op::SetFillColor(all_nums(0, s.len()))),
            b"SCN" | b"scn" => {
                let pattern = s.last().and_then(Object::as_name).cloned();
                let count = if pattern.is_some() {
                    s.len().saturating_sub(1)
                } else {
                    s.len()
                };
                let components = all_nums(0, count);
                if op.operator == b"SCN" {
                    Ok(Op::SetStrokeColorExtended(components, pattern))
                } else {
                    Ok(Op::SetFillColorExtended(components, pattern))
                }
            }
            b"G" => checked(1, Op::SetStrokeGray(num(0)?)),
            b"g" => checked(1, Op::SetFillGray(num(0)?)),
            b"RG" => checked(3, Op::SetStrokeRgb([num(0)?, num(1)?, num(2)?])),
            b"rg" => checked(3, Op::SetFillRgb([num(0)?, num(1)?, num(2)?])),
            b"K" => checked(4, Op::SetStrokeCmyk(four()?)),
            b"k" => checked(4, Op::SetFillCmyk(four()?)),

            b"sh" => checked(1, Op::Shading(name(0)?)),
            b"Do" => checked(1, Op::XObject(name(0)?)),
            b"BI" => {
                let stream = s
                    .first()
                    .and_then(Object::as_stream)
                    .cloned()
                    .ok_or(DispatchError::InvalidOperands)?;
                checked(1, Op::InlineImage(stream))
            }

            b"BT" => checked(0, Op::BeginText),
            b"ET" => checked(0, Op::EndText),
            b"Tc" => checked(1, Op::SetCharSpacing(num(0)?)),
            b"Tw" => checked(1, Op::SetWordSpacing(num(0)?)),
            b"Tz" => checked(1, Op::SetHorizontalScaling(num(0)?)),
            b"TL" => checked(1, Op::SetLeading(num(0)?)),
            b"Tf" => checked(2, Op::SetFont(name(0)?, num(1)?)),
            b"Tr" => checked(1, Op::SetTextRenderMode(int(0)?)),
            b"Ts" => checked(1, Op::SetRise(num(0)?)),
            b"Td" => checked(2, Op::NextLine(num(0)?, num(1)?)),
            b"TD" => checked(2, Op::NextLineSetLeading(num(0)?, num(1)?)),
            b"Tm" => checked(6, Op::SetTextMatrix(six()?)),
            b"T*" => checked(0, Op::NextLineDefault),
            b"Tj" => checked(1, Op::ShowText(string(0)?)),
            b"'" => checked(1, Op::ShowTextNextLine(string(0)?)),
            b"\"" => checked(3, Op::ShowTextSpaced(num(0)?, num(1)?, string(2)?)),
            b"TJ" => {
                let arr = s
                    .first()
                    .and_then(Object::as_array)
                    .cloned()
                    .ok_or(DispatchError::InvalidOperands)?;
                checked(1, Op::ShowTextArray(arr))
            }

            b"d0" => checked(2, Op::GlyphWidth(num(0)?, num(1)?)),
            b"d1" => checked(6, Op::GlyphWidthBBox(six()?)),

            b"MP" => checked(1, Op::MarkedContentPoint(name(0)?)),
            b"DP" => {
                let props = s.get(1).cloned().ok_or(DispatchError::InvalidOperands)?;
                checked(2, Op::MarkedContentPointProps(name(0)?, props))
            }
            b"BMC" => checked(1, Op::BeginMarkedContent(name(0)?)),
            b"BDC" => {
                let props = s.get(1).cloned().ok_or(DispatchError::InvalidOperands)?;
                checked(2, Op::BeginMarkedContentProps(name(0)?, props))
            }
            b"EMC" => checked(0, Op::EndMarkedContent),

            b"BX" => checked(0, Op::BeginCompatibility),
            b"EX" => checked(0, Op::EndCompatibility),

            _ => Err(DispatchError::UnknownOperator),
        };

        result
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentIter, DispatchError, Op};
    use crate::object::Object;

    fn ops(data: &[u8]) -> Vec<Result<Op, DispatchError>> {
        ContentIter::new(data).map(|op| Op::dispatch(&op)).collect()
    }

    #[test]
    fn path_and_paint() {
        assert_eq!(
            ops(b"10 10 m 90 90 l S"),
            vec![
                Ok(Op::MoveTo(10.0, 10.0)),
                Ok(Op::LineTo(90.0, 90.0)),
                Ok(Op::Stroke)
            ]
        );
    }

    #[test]
    fn text_block() {
        let got = ops(b"BT /F1 12 Tf 50 50 Td (Hi) Tj ET");
        assert_eq!(got.len(), 5);
        assert!(matches!(got[1], Ok(Op::SetFont(_, size)) if size == 12.0));
        assert!(matches!(got[3], Ok(Op::ShowText(_))));
    }

    #[test]
    fn dash_pattern() {
        assert_eq!(
            ops(b"[2 4] 1.5 d"),
            vec![Ok(Op::SetDash(vec![2.0, 4.0], 1.5))]
        );
    }

    #[test]
    fn scn_with_pattern_name() {
        let got = ops(b"/P0 scn");
        assert!(
            matches!(&got[0], Ok(Op::SetFillColorExtended(c, Some(n))) if c.is_empty() && n.as_str() == "P0")
        );
    }

    #[test]
    fn unknown_operator() {
        assert_eq!(ops(b"frobnicate"), vec![Err(DispatchError::UnknownOperator)]);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert_eq!(ops(b"1 2 3 m"), vec![Err(DispatchError::InvalidOperands)]);
    }

    #[test]
    fn inline_image() {
        let data = b"BI /W 2 /H 1 /BPC 8 /CS /G ID \x10\x20 EI Q";
        let got: Vec<_> = ContentIter::new(data).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].operator, b"BI");

        let Some(Object::Stream(s)) = got[0].operands.first() else {
            panic!("expected a stream operand");
        };
        assert_eq!(s.raw(), b"\x10\x20");
        assert!(s.dict().contains_key("Width"));
        assert!(s.dict().contains_key("ColorSpace"));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(ops(b"% setup\nq"), vec![Ok(Op::SaveState)]);
    }
}
