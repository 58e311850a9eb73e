// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-number caption layout: measuring text in a base-14 font and building
// the content stream that draws it centred at the bottom of a page.

use bindery_core::CaptionStyle;

/// Resource name the caption font is registered under on every page.
pub const CAPTION_FONT_KEY: &str = "BdyCaption";

/// Descender depth shared by Helvetica and Helvetica-Bold, in 1/1000 em.
const HELVETICA_DESCENDER: f32 = 207.0;

/// A rectangle in PDF user space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// US Letter, used when a page has no usable /MediaBox anywhere in its tree.
pub const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Advance width of one glyph in 1/1000 em.
///
/// Exact AFM widths for the characters a page caption uses in Helvetica and
/// Helvetica-Bold; anything else is estimated at half an em.
fn glyph_width(font: &str, ch: char) -> f32 {
    let bold = font.eq_ignore_ascii_case("Helvetica-Bold");
    let regular = font.eq_ignore_ascii_case("Helvetica");
    if !bold && !regular {
        return 500.0;
    }
    match ch {
        ' ' => 278.0,
        '0'..='9' => 556.0,
        'P' => 667.0,
        'a' | 'e' => 556.0,
        'g' if bold => 611.0,
        'g' => 556.0,
        _ => 500.0,
    }
}

/// Width of `text` set in `style`, in points.
pub fn text_width(text: &str, style: &CaptionStyle) -> f32 {
    let em: f32 = text.chars().map(|ch| glyph_width(&style.font, ch)).sum();
    em * style.font_size_pt / 1000.0
}

/// Baseline origin that centres `text` horizontally and rests its
/// descender line `inset_pt` above the bottom of `media_box`.
pub fn caption_origin(text: &str, style: &CaptionStyle, media_box: Rect) -> (f32, f32) {
    let x = media_box.x0 + (media_box.width() - text_width(text, style)) / 2.0;
    let descent = HELVETICA_DESCENDER * style.font_size_pt / 1000.0;
    let y = media_box.y0 + style.inset_pt + descent;
    (x, y)
}

/// Text matrix `[a b c d e f]` placing the caption at the bottom of the page
/// as displayed, for a page whose `/Rotate` is `rotate` degrees clockwise.
///
/// The caption is laid out in display space and mapped back into the
/// unrotated user space of `media_box`, turned so it reads upright.
pub fn caption_matrix(text: &str, style: &CaptionStyle, media_box: Rect, rotate: i64) -> [f32; 6] {
    let rotate = rotate.rem_euclid(360);
    let display_width = match rotate {
        90 | 270 => media_box.height(),
        _ => media_box.width(),
    };
    let along = (display_width - text_width(text, style)) / 2.0;
    let up = style.inset_pt + HELVETICA_DESCENDER * style.font_size_pt / 1000.0;
    let Rect { x0, y0, x1, y1 } = media_box;

    match rotate {
        90 => [0.0, 1.0, -1.0, 0.0, x1 - up, y0 + along],
        180 => [-1.0, 0.0, 0.0, -1.0, x1 - along, y1 - up],
        270 => [0.0, -1.0, 1.0, 0.0, x0 + up, y1 - along],
        _ => {
            let (x, y) = caption_origin(text, style, media_box);
            [1.0, 0.0, 0.0, 1.0, x, y]
        }
    }
}

/// Content stream operators drawing the caption in black on a page whose
/// `/Rotate` is `rotate`.
///
/// Assumes the page's existing content has been wrapped in `q`/`Q`, so the
/// graphics state is the page default.
pub fn caption_operators(text: &str, style: &CaptionStyle, media_box: Rect, rotate: i64) -> String {
    let [a, b, c, d, e, f] = caption_matrix(text, style, media_box, rotate);
    format!(
        "q\n0 g\nBT\n/{} {:.2} Tf\n{} {} {} {} {:.2} {:.2} Tm\n({}) Tj\nET\nQ\n",
        CAPTION_FONT_KEY,
        style.font_size_pt,
        a,
        b,
        c,
        d,
        e,
        f,
        escape_literal(text)
    )
}

/// Escape a string for use inside a PDF literal `( ... )`.
fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
