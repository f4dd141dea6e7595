//! Software raster surface the controller draws on.

use tiny_skia::{
    ColorU8, FillRule, LineCap, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Stroke,
    Transform,
};
use tracing::trace;

use crate::config::{BoardConfig, StrokeStyle};
use crate::error::{BoardError, Result};
use crate::image_data::ImageData;
use crate::input::Point;

/// Fixed-size canvas with a single open path.
///
/// The open path only remembers the last recorded position; every segment is
/// rasterized as soon as it is added.
pub struct Canvas {
    pixmap: Pixmap,
    style: StrokeStyle,
    last: Option<Point>,
}

impl Canvas {
    pub fn new(config: &BoardConfig) -> Result<Self> {
        let pixmap = Pixmap::new(config.width, config.height).ok_or(
            BoardError::InvalidDimensions {
                width: config.width,
                height: config.height,
            },
        )?;
        Ok(Self {
            pixmap,
            style: config.stroke,
            last: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Last recorded position of the open path.
    pub fn current_point(&self) -> Option<Point> {
        self.last
    }

    /// Drops the open path so the next segment starts fresh.
    pub fn begin_path(&mut self) {
        self.last = None;
    }

    /// Strokes from the last recorded position to `to` and records `to`.
    ///
    /// With no open path this renders a zero-length segment, which round caps
    /// turn into a dot of the stroke width.
    pub fn stroke_to(&mut self, to: Point) {
        let from = self.last.unwrap_or(to);
        self.stroke_segment(from, to);
        self.last = Some(to);
    }

    fn stroke_segment(&mut self, from: Point, to: Point) {
        trace!(?from, ?to, "stroke segment");
        let [r, g, b, a] = self.style.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;

        if from == to {
            if let Some(dot) = PathBuilder::from_circle(to.x, to.y, self.style.width / 2.0) {
                self.pixmap.fill_path(
                    &dot,
                    &paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width: self.style.width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// Copies the whole canvas out.
    pub fn snapshot(&self) -> ImageData {
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        ImageData::from_pixmap_data(data, self.width(), self.height())
    }

    /// Paints `image` at the origin, replacing the pixels it covers.
    ///
    /// A buffer of a different size is clipped to the overlap; pixels outside
    /// it keep their value.
    pub fn put_image_data(&mut self, image: &ImageData) {
        let canvas_width = self.width() as usize;
        let cols = image.width().min(self.width()) as usize;
        let rows = image.height().min(self.height()) as usize;
        let src = image.data();
        let dst = self.pixmap.pixels_mut();

        for y in 0..rows {
            let src_row = &src[y * image.width() as usize * 4..][..cols * 4];
            let dst_row = &mut dst[y * canvas_width..][..cols];
            for (out, px) in dst_row.iter_mut().zip(src_row.chunks_exact(4)) {
                *out = premultiply(px);
            }
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn inked_pixels(&self) -> usize {
        self.pixmap.pixels().iter().filter(|px| px.alpha() != 0).count()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| BoardError::Encode(e.to_string()))
    }
}

fn premultiply(px: &[u8]) -> PremultipliedColorU8 {
    ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply()
}
