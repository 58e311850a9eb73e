// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image pages: decode a raster image and draw it onto a fresh single-page
// PDF using `printpdf` 0.8, ready to be imported into an output document.

use bindery_core::PaperSize;
use bindery_core::error::{BinderyError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, instrument};

/// At 72 DPI one image pixel is one point, so scale factors are simply
/// target size over pixel size.
const PLACEMENT_DPI: f32 = 72.0;

/// Where an image lands on its page, in points with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Renders raster images onto single pages of a fixed paper size.
///
/// The image is anchored `margin` from the top-left corner and stretched to
/// the page width minus both margins. Its height is either the requested
/// target height or the page height minus both margins. Aspect ratio is not
/// preserved.
pub struct ImagePageWriter {
    paper_size: PaperSize,
    margin_pt: f32,
}

impl ImagePageWriter {
    pub fn new(paper_size: PaperSize, margin_pt: f32) -> Self {
        Self {
            paper_size,
            margin_pt,
        }
    }

    /// A4 pages with a 25pt margin.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 25.0)
    }

    /// Page dimensions in points.
    pub fn page_size_pt(&self) -> (f32, f32) {
        self.paper_size.dimensions_pt()
    }

    /// Rectangle an image will be drawn into.
    pub fn placement(&self, target_height: Option<u32>) -> ImagePlacement {
        let (page_w, page_h) = self.page_size_pt();
        let width = page_w - 2.0 * self.margin_pt;
        let height = match target_height {
            Some(height) if height > 0 => height as f32,
            _ => page_h - 2.0 * self.margin_pt,
        };
        ImagePlacement {
            x: self.margin_pt,
            y: page_h - self.margin_pt - height,
            width,
            height,
        }
    }

    /// Decode `image_bytes` and return a one-page PDF with the image drawn
    /// at [`ImagePageWriter::placement`].
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn render(&self, image_bytes: &[u8], target_height: Option<u32>) -> Result<Vec<u8>> {
        let dynamic_image = ::image::load_from_memory(image_bytes).map_err(|err| {
            BinderyError::ImageError(format!("failed to decode image: {}", err))
        })?;

        let img_width = dynamic_image.width() as usize;
        let img_height = dynamic_image.height() as usize;
        if img_width == 0 || img_height == 0 {
            return Err(BinderyError::ImageError("image has no pixels".to_string()));
        }

        // Convert to RGB8 for printpdf.
        let rgb_image = dynamic_image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new("Bindery Image");
        let xobject_id = doc.add_image(&raw);

        let placement = self.placement(target_height);
        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(placement.x)),
                translate_y: Some(Pt(placement.y)),
                scale_x: Some(placement.width / img_width as f32),
                scale_y: Some(placement.height / img_height as f32),
                dpi: Some(PLACEMENT_DPI),
                rotate: None,
            },
        }];

        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        let page = PdfPage::new(Mm(w_mm as f32), Mm(h_mm as f32), ops);
        doc.with_pages(vec![page]);

        debug!(
            img_width,
            img_height,
            width = placement.width,
            height = placement.height,
            "Image placed on page"
        );

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn placement_fills_the_page_inside_margins() {
        let writer = ImagePageWriter::a4();
        let (page_w, page_h) = writer.page_size_pt();
        let placement = writer.placement(None);

        assert_eq!(placement.x, 25.0);
        assert!((placement.y - 25.0).abs() < 0.001);
        assert!((placement.width - (page_w - 50.0)).abs() < 0.001);
        assert!((placement.height - (page_h - 50.0)).abs() < 0.001);
    }

    #[test]
    fn target_height_anchors_at_the_top() {
        let writer = ImagePageWriter::a4();
        let (_, page_h) = writer.page_size_pt();
        let placement = writer.placement(Some(200));

        assert_eq!(placement.height, 200.0);
        assert!((placement.y + placement.height - (page_h - 25.0)).abs() < 0.001);
    }

    #[test]
    fn zero_target_height_fills_the_page() {
        let writer = ImagePageWriter::a4();
        assert_eq!(writer.placement(Some(0)), writer.placement(None));
    }

    #[test]
    fn renders_a_single_a4_page() {
        let bytes = ImagePageWriter::a4()
            .render(&testing::png_image(8, 6), None)
            .unwrap();
        assert_eq!(crate::page_count(&bytes).unwrap(), 1);
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let err = ImagePageWriter::a4().render(b"\x89PNG broken", None).unwrap_err();
        assert!(matches!(err, BinderyError::ImageError(_)));
    }
}
