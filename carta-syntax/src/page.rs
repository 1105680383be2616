//! The page tree.

use crate::object::name::keys::*;
use crate::object::{Array, Dict, Name, Object, Rect, Stream};
use crate::xref::XRef;
use log::warn;
use rustc_hash::FxHashSet;
use std::sync::{Arc, OnceLock};

/// The dimension of an A4 page in points, the fallback for pages without a
/// usable media box.
pub const A4: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 595.27557,
    y1: 841.8898,
};

/// The rotation of a page, from its `/Rotate` entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Quarter,
    /// 180 degrees.
    Half,
    /// 270 degrees clockwise.
    ThreeQuarters,
}

impl Rotation {
    fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            270 => Rotation::ThreeQuarters,
            0 => Rotation::None,
            other => {
                warn!("ignoring non-axis-aligned /Rotate {other}");
                Rotation::None
            }
        }
    }

    /// Whether the rotation swaps width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarters)
    }

    /// The rotation in degrees.
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarters => 270,
        }
    }
}

/// Attributes a page inherits from its ancestors.
#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: Option<i64>,
    resources: Option<Dict>,
}

/// A leaf of the page tree, with inherited attributes materialized.
#[derive(Debug)]
pub struct Page {
    xref: XRef,
    dict: Dict,
    media_box: Rect,
    crop_box: Rect,
    rotation: Rotation,
    resources: Dict,
    contents: OnceLock<Option<Arc<[u8]>>>,
}

impl Page {
    fn new(dict: &Dict, inherited: &Inherited, xref: &XRef) -> Page {
        let media_box = dict
            .get::<Rect>(MEDIA_BOX, xref)
            .or(inherited.media_box)
            .unwrap_or(A4);
        let crop_box = dict
            .get::<Rect>(CROP_BOX, xref)
            .or(inherited.crop_box)
            .unwrap_or(media_box);
        let rotation = Rotation::from_degrees(
            dict.get::<i64>(ROTATE, xref)
                .or(inherited.rotate)
                .unwrap_or(0),
        );
        let resources = dict
            .get::<Dict>(RESOURCES, xref)
            .or_else(|| inherited.resources.clone())
            .unwrap_or_default();

        Page {
            xref: xref.clone(),
            dict: dict.clone(),
            media_box,
            crop_box,
            rotation,
            resources,
            contents: OnceLock::new(),
        }
    }

    /// The page's raw dictionary.
    pub fn raw(&self) -> &Dict {
        &self.dict
    }

    /// The xref of the owning document.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// The page's media box.
    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// The page's crop box.
    pub fn crop_box(&self) -> Rect {
        self.crop_box
    }

    /// The page's rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// The resource dictionary in effect for the page's content.
    pub fn resources(&self) -> &Dict {
        &self.resources
    }

    /// The effective page box: crop box intersected with media box, with an
    /// A4 fallback for degenerate boxes.
    pub fn effective_box(&self) -> Rect {
        let b = self.crop_box.intersect(&self.media_box);

        if b.width() < 1.0e-6 || b.height() < 1.0e-6 {
            A4
        } else {
            b
        }
    }

    /// The page width in points, before rotation.
    pub fn base_width(&self) -> f32 {
        self.effective_box().width()
    }

    /// The page height in points, before rotation.
    pub fn base_height(&self) -> f32 {
        self.effective_box().height()
    }

    /// The width the page renders at, with rotation applied.
    pub fn width(&self) -> f32 {
        if self.rotation.swaps_axes() {
            self.base_height()
        } else {
            self.base_width()
        }
    }

    /// The height the page renders at, with rotation applied.
    pub fn height(&self) -> f32 {
        if self.rotation.swaps_axes() {
            self.base_width()
        } else {
            self.base_height()
        }
    }

    /// The concatenated, decoded content streams of the page. Multiple
    /// streams are joined with a separating space. Computed once.
    pub fn content(&self) -> &[u8] {
        self.contents
            .get_or_init(|| self.load_content())
            .as_deref()
            .unwrap_or(&[])
    }

    fn load_content(&self) -> Option<Arc<[u8]>> {
        let xref = &self.xref;

        let decode_one = |s: &Stream| -> Option<Vec<u8>> {
            match s.decoded(xref) {
                Ok(data) => Some(data.to_vec()),
                Err(e) => {
                    warn!("skipping undecodable content stream: {e}");
                    None
                }
            }
        };

        match self.dict.get_raw(CONTENTS).map(|o| xref.resolve(o)) {
            Some(Object::Stream(s)) => decode_one(&s).map(Arc::from),
            Some(Object::Array(arr)) => {
                let mut joined = vec![];
                for stream in arr.typed::<Stream>(xref) {
                    if let Some(data) = decode_one(&stream) {
                        joined.extend_from_slice(&data);
                        // Streams must be separated by at least one white
                        // space byte.
                        joined.push(b' ');
                    }
                }
                Some(joined.into())
            }
            _ => {
                warn!("page /Contents is neither a stream nor an array");
                None
            }
        }
    }
}

/// Flatten the page tree under `catalog` into its leaves, resolving
/// inheritable attributes along the way.
pub(crate) fn flatten_pages(catalog: &Dict, xref: &XRef) -> Vec<Page> {
    let mut pages = vec![];
    let mut visited = FxHashSet::default();

    let Some(root) = catalog.get::<Dict>(PAGES, xref) else {
        warn!("catalog has no /Pages entry");
        return pages;
    };

    walk(&root, &Inherited::default(), xref, &mut pages, &mut visited);
    pages
}

fn walk(
    node: &Dict,
    inherited: &Inherited,
    xref: &XRef,
    pages: &mut Vec<Page>,
    visited: &mut FxHashSet<usize>,
) {
    let mut inherited = inherited.clone();

    if let Some(media_box) = node.get::<Rect>(MEDIA_BOX, xref) {
        inherited.media_box = Some(media_box);
    }
    if let Some(crop_box) = node.get::<Rect>(CROP_BOX, xref) {
        inherited.crop_box = Some(crop_box);
    }
    if let Some(rotate) = node.get::<i64>(ROTATE, xref) {
        inherited.rotate = Some(rotate);
    }
    if let Some(resources) = node.get::<Dict>(RESOURCES, xref) {
        inherited.resources = Some(resources);
    }

    let Some(kids) = node.get::<Array>(KIDS, xref) else {
        return;
    };

    for kid in kids.iter() {
        // Guard against loops built out of indirect references.
        if let Object::Ref(r) = kid {
            if !visited.insert(r.num as usize) {
                warn!("page tree cycle through object {}", r.num);
                continue;
            }
        }

        let Some(dict) = xref.resolve(kid).as_dict().cloned() else {
            continue;
        };

        match dict.get_raw(TYPE).and_then(Object::as_name).map(Name::as_str) {
            Some("Pages") => walk(&dict, &inherited, xref, pages, visited),
            // Anything else is assumed to be a leaf; files with a missing or
            // wrong /Type exist.
            _ => pages.push(Page::new(&dict, &inherited, xref)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::PdfBuilder;

    fn load(data: Vec<u8>) -> Vec<Page> {
        let xref = XRef::load(data.into()).unwrap();
        flatten_pages(&xref.catalog().unwrap(), &xref)
    }

    #[test]
    fn leaf_count_matches_tree() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 3 >>")
            .object(3, b"<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 6 0 R] /Count 2 >>")
            .object(4, b"<< /Type /Page /Parent 3 0 R /MediaBox [0 0 10 10] >>")
            .object(5, b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] >>")
            .object(6, b"<< /Type /Page /Parent 3 0 R /MediaBox [0 0 10 10] >>")
            .build();

        assert_eq!(load(data).len(), 3);
    }

    #[test]
    fn inherited_attributes_propagate() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(
                2,
                b"<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 200 400] /Rotate 90 >>",
            )
            .object(3, b"<< /Type /Page /Parent 2 0 R >>")
            .build();

        let pages = load(data);
        assert_eq!(pages[0].base_width(), 200.0);
        assert_eq!(pages[0].base_height(), 400.0);
        assert_eq!(pages[0].rotation(), Rotation::Quarter);
        // Rotation by 90 degrees swaps the rendered dimensions.
        assert_eq!(pages[0].width(), 400.0);
        assert_eq!(pages[0].height(), 200.0);
    }

    #[test]
    fn own_attributes_override_inherited() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(
                2,
                b"<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 200 400] >>",
            )
            .object(3, b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 50 60] >>")
            .build();

        let pages = load(data);
        assert_eq!(pages[0].base_width(), 50.0);
    }

    #[test]
    fn crop_box_intersects_media_box() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                b"<< /Type /Page /MediaBox [0 0 100 100] /CropBox [50 50 300 300] >>",
            )
            .build();

        let pages = load(data);
        assert_eq!(pages[0].base_width(), 50.0);
        assert_eq!(pages[0].base_height(), 50.0);
    }

    #[test]
    fn page_tree_cycle_is_tolerated() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R 2 0 R] /Count 1 >>")
            .object(3, b"<< /Type /Page /MediaBox [0 0 10 10] >>")
            .build();

        assert_eq!(load(data).len(), 1);
    }

    #[test]
    fn content_streams_concatenate() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                b"<< /Type /Page /MediaBox [0 0 10 10] /Contents [4 0 R 5 0 R] >>",
            )
            .stream(4, b"<< >>", b"0 0 m")
            .stream(5, b"<< >>", b"10 10 l S")
            .build();

        let pages = load(data);
        assert_eq!(pages[0].content(), b"0 0 m 10 10 l S ");
    }
}
