//! Static Map Renderer
//! Offscreen plotters renders for the views egui_plot cannot draw:
//! choropleth maps, the 3D column map, and the bar-race frames. Frames are
//! RGB buffers reused both as egui textures and as PNG/GIF artifacts.

use crate::charts::colormap;
use crate::data::{geometry, RegionGeometry};
use crate::stats::{ColumnPoint, RaceTable};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use plotters::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Nothing to draw")]
    EmptyDomain,
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// An offscreen render: packed RGB rows.
#[derive(Clone)]
pub struct RenderedImage {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        image::save_buffer(
            path,
            &self.rgb,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(())
    }

    fn to_rgba(&self) -> Option<RgbaImage> {
        let mut rgba = Vec::with_capacity(self.rgb.len() / 3 * 4);
        for px in self.rgb.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        RgbaImage::from_raw(self.width, self.height, rgba)
    }
}

/// Mirror of the interactive palette, for the race frames.
const PALETTE: [RGBColor; 13] = [
    RGBColor(231, 76, 60),
    RGBColor(52, 152, 219),
    RGBColor(46, 204, 113),
    RGBColor(155, 89, 182),
    RGBColor(243, 156, 18),
    RGBColor(26, 188, 156),
    RGBColor(233, 30, 99),
    RGBColor(0, 188, 212),
    RGBColor(255, 87, 34),
    RGBColor(121, 85, 72),
    RGBColor(96, 125, 139),
    RGBColor(205, 220, 57),
    RGBColor(103, 58, 183),
];

const COLUMN_COLOR: RGBColor = RGBColor(255, 140, 0);
const MISSING_FILL: RGBColor = RGBColor(225, 225, 225);

/// Renders the static maps and the race animation.
pub struct MapRenderer;

impl MapRenderer {
    /// Choropleth of `values` (keyed by INSEE code) over the region
    /// polygons, colored on the diverging map across `range`.
    pub fn render_choropleth(
        regions: &[RegionGeometry],
        values: &BTreeMap<String, f64>,
        range: (f64, f64),
        title: &str,
        size: (u32, u32),
    ) -> Result<RenderedImage, RenderError> {
        let ((lon_min, lon_max), (lat_min, lat_max)) =
            geometry::bounding_box(regions.iter()).ok_or(RenderError::EmptyDomain)?;
        let (width, height) = size;

        let mut rgb = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .build_cartesian_2d(lon_min..lon_max, lat_min..lat_max)
                .map_err(draw_err)?;

            for region in regions {
                let fill = match values.get(&region.insee_code) {
                    Some(&v) => {
                        let (r, g, b) =
                            colormap::coolwarm(colormap::normalize(v, range.0, range.1));
                        RGBColor(r, g, b)
                    }
                    None => MISSING_FILL,
                };

                for polygon in &region.boundary {
                    let ring: Vec<(f64, f64)> =
                        polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
                    chart
                        .draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))
                        .map_err(draw_err)?;
                    chart
                        .draw_series(std::iter::once(PathElement::new(
                            ring,
                            BLACK.stroke_width(1),
                        )))
                        .map_err(draw_err)?;
                }
            }

            Self::draw_color_scale(&root, range, size).map_err(draw_err)?;
            root.present().map_err(draw_err)?;
        }

        Ok(RenderedImage {
            rgb,
            width,
            height,
        })
    }

    /// Vertical gradient legend on the right edge.
    fn draw_color_scale<DB: DrawingBackend>(
        root: &DrawingArea<DB, plotters::coord::Shift>,
        range: (f64, f64),
        (width, height): (u32, u32),
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let bar_x = width as i32 - 40;
        let bar_top = height as i32 / 4;
        let bar_height = height as i32 / 2;

        for i in 0..bar_height {
            let t = 1.0 - i as f64 / bar_height as f64;
            let (r, g, b) = colormap::coolwarm(t);
            root.draw(&Rectangle::new(
                [(bar_x, bar_top + i), (bar_x + 16, bar_top + i + 1)],
                RGBColor(r, g, b).filled(),
            ))?;
        }

        root.draw(&Text::new(
            format!("{:.0}", range.1),
            (bar_x - 8, bar_top - 18),
            ("sans-serif", 14),
        ))?;
        root.draw(&Text::new(
            format!("{:.0}", range.0),
            (bar_x - 8, bar_top + bar_height + 6),
            ("sans-serif", 14),
        ))?;
        Ok(())
    }

    /// 3D column map: one column per region centroid, elevation
    /// proportional to consumption.
    pub fn render_column_map(
        points: &[ColumnPoint],
        title: &str,
        size: (u32, u32),
    ) -> Result<RenderedImage, RenderError> {
        if points.is_empty() {
            return Err(RenderError::EmptyDomain);
        }
        let (width, height) = size;

        let lon_min = points.iter().map(|p| p.longitude).fold(f64::INFINITY, f64::min);
        let lon_max = points.iter().map(|p| p.longitude).fold(f64::NEG_INFINITY, f64::max);
        let lat_min = points.iter().map(|p| p.latitude).fold(f64::INFINITY, f64::min);
        let lat_max = points.iter().map(|p| p.latitude).fold(f64::NEG_INFINITY, f64::max);
        let v_max = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
        if !v_max.is_finite() || v_max <= 0.0 {
            return Err(RenderError::EmptyDomain);
        }

        let pad_lon = ((lon_max - lon_min) * 0.1).max(0.5);
        let pad_lat = ((lat_max - lat_min) * 0.1).max(0.5);
        let half_width = ((lon_max - lon_min) + 2.0 * pad_lon) * 0.012;

        let mut rgb = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .build_cartesian_3d(
                    (lon_min - pad_lon)..(lon_max + pad_lon),
                    0.0..(v_max * 1.1),
                    (lat_min - pad_lat)..(lat_max + pad_lat),
                )
                .map_err(draw_err)?;

            chart.with_projection(|mut pb| {
                pb.pitch = 0.7;
                pb.yaw = 0.5;
                pb.scale = 0.85;
                pb.into_matrix()
            });
            chart.configure_axes().draw().map_err(draw_err)?;

            for point in points {
                chart
                    .draw_series(std::iter::once(Cubiod::new(
                        [
                            (point.longitude - half_width, 0.0, point.latitude - half_width),
                            (
                                point.longitude + half_width,
                                point.value,
                                point.latitude + half_width,
                            ),
                        ],
                        COLUMN_COLOR.mix(0.6),
                        COLUMN_COLOR,
                    )))
                    .map_err(draw_err)?;
            }

            root.present().map_err(draw_err)?;
        }

        Ok(RenderedImage {
            rgb,
            width,
            height,
        })
    }

    /// All race frames, `steps` interpolated frames per year transition.
    pub fn render_race_frames(
        race: &RaceTable,
        steps: usize,
        size: (u32, u32),
    ) -> Result<Vec<RenderedImage>, RenderError> {
        if race.years.is_empty() || race.regions.is_empty() {
            return Err(RenderError::EmptyDomain);
        }
        let steps = steps.max(1);
        let frame_count = (race.years.len() - 1) * steps + 1;

        (0..frame_count)
            .into_par_iter()
            .map(|i| Self::render_race_frame(race, i as f64 / steps as f64, size))
            .collect()
    }

    fn render_race_frame(
        race: &RaceTable,
        t: f64,
        size: (u32, u32),
    ) -> Result<RenderedImage, RenderError> {
        let (width, height) = size;
        let mut entries = race.interpolated(t);
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let year = race.years[(t.round() as usize).min(race.years.len() - 1)];
        let n = entries.len().max(1);

        let mut rgb = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "CNG consumption by region and year",
                    ("sans-serif", 22),
                )
                .margin(10)
                .margin_right(60)
                .build_cartesian_2d(0.0..(race.max * 1.08).max(1.0), 0.0..n as f64)
                .map_err(draw_err)?;

            for (i, (region, value)) in entries.iter().enumerate() {
                // Largest bar at the top.
                let y = (n - 1 - i) as f64;
                let color_idx = race
                    .regions
                    .iter()
                    .position(|r| r == region)
                    .unwrap_or(0);
                let color = PALETTE[color_idx % PALETTE.len()];

                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(0.0, y + 0.1), (*value, y + 0.9)],
                        color.mix(0.85).filled(),
                    )))
                    .map_err(draw_err)?;
                chart
                    .draw_series(std::iter::once(Text::new(
                        format!("{} ({:.1})", region, value),
                        (race.max * 0.01, y + 0.35),
                        ("sans-serif", 14),
                    )))
                    .map_err(draw_err)?;
            }

            root.draw(&Text::new(
                year.to_string(),
                (width as i32 - 130, height as i32 - 60),
                ("sans-serif", 44),
            ))
            .map_err(draw_err)?;
            root.present().map_err(draw_err)?;
        }

        Ok(RenderedImage {
            rgb,
            width,
            height,
        })
    }

    /// Encode frames into a looping GIF.
    pub fn encode_gif(
        frames: &[RenderedImage],
        path: &Path,
        delay_ms: u32,
    ) -> Result<(), RenderError> {
        if frames.is_empty() {
            return Err(RenderError::EmptyDomain);
        }

        let file = File::create(path)?;
        let mut encoder = GifEncoder::new_with_speed(file, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let rgba = frame.to_rgba().ok_or(RenderError::EmptyDomain)?;
            encoder.encode_frame(Frame::from_parts(
                rgba,
                0,
                0,
                Delay::from_numer_denom_ms(delay_ms, 1),
            ))?;
        }
        log::info!("Wrote {} race frames to {}", frames.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8, width: u32, height: u32) -> RenderedImage {
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            rgb.extend_from_slice(&[r, g, b]);
        }
        RenderedImage { rgb, width, height }
    }

    #[test]
    fn gif_encoding_produces_a_gif_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.gif");
        let frames = vec![solid(255, 0, 0, 16, 16), solid(0, 0, 255, 16, 16)];

        MapRenderer::encode_gif(&frames, &path, 250).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF8"));
    }

    #[test]
    fn encoding_no_frames_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.gif");
        assert!(matches!(
            MapRenderer::encode_gif(&[], &path, 250),
            Err(RenderError::EmptyDomain)
        ));
    }

    #[test]
    fn png_artifact_round_trips_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        solid(10, 20, 30, 24, 12).save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 12));
    }
}
