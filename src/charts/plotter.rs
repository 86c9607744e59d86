//! Chart Plotter Module
//! Interactive dashboard charts built with egui_plot.

use crate::charts::colormap;
use crate::stats::{
    ComparisonRow, HeatmapTable, HistogramBin, PieSlice, TrendPoint, VariationRow,
};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points, Polygon};

pub const YEAR_A_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const YEAR_B_COLOR: Color32 = Color32::from_rgb(243, 156, 18); // Orange
pub const INCREASE_COLOR: Color32 = Color32::from_rgb(46, 204, 113); // Green
pub const DECREASE_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red

/// One color per region, cycled.
pub const PALETTE: [Color32; 13] = [
    Color32::from_rgb(231, 76, 60),
    Color32::from_rgb(52, 152, 219),
    Color32::from_rgb(46, 204, 113),
    Color32::from_rgb(155, 89, 182),
    Color32::from_rgb(243, 156, 18),
    Color32::from_rgb(26, 188, 156),
    Color32::from_rgb(233, 30, 99),
    Color32::from_rgb(0, 188, 212),
    Color32::from_rgb(255, 87, 34),
    Color32::from_rgb(121, 85, 72),
    Color32::from_rgb(96, 125, 139),
    Color32::from_rgb(205, 220, 57),
    Color32::from_rgb(103, 58, 183),
];

const CHART_HEIGHT: f32 = 340.0;
const PIE_SEGMENTS_PER_TURN: usize = 128;

pub fn region_color(index: usize) -> Color32 {
    PALETTE[index % PALETTE.len()]
}

/// Creates the interactive dashboard charts.
pub struct ChartPlotter;

impl ChartPlotter {
    fn empty_notice(ui: &mut egui::Ui) {
        ui.label("No data for this selection");
    }

    /// Grouped bars comparing each region's consumption in the two years.
    pub fn draw_comparison_chart(
        ui: &mut egui::Ui,
        rows: &[ComparisonRow],
        year_a: i32,
        year_b: i32,
    ) {
        if rows.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        let mut first_bars = Vec::new();
        let mut second_bars = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            if let Some(v) = row.first {
                first_bars.push(Bar::new(i as f64 - 0.2, v).width(0.38));
            }
            if let Some(v) = row.second {
                second_bars.push(Bar::new(i as f64 + 0.2, v).width(0.38));
            }
        }

        let labels: Vec<String> = rows.iter().map(|r| r.region.clone()).collect();
        Plot::new("comparison")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .y_axis_label("Consumption (GWh PCS)")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 0.3 {
                    labels.get(idx).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(first_bars)
                        .color(YEAR_A_COLOR)
                        .name(year_a.to_string()),
                );
                plot_ui.bar_chart(
                    BarChart::new(second_bars)
                        .color(YEAR_B_COLOR)
                        .name(year_b.to_string()),
                );
            });
    }

    /// Consumption trend of the selected region over the years.
    pub fn draw_trend_chart(ui: &mut egui::Ui, points: &[TrendPoint], region: &str) {
        if points.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        let series: Vec<[f64; 2]> = points
            .iter()
            .map(|p| [p.year as f64, p.value])
            .collect();

        Plot::new(format!("trend_{}", region))
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("Year")
            .y_axis_label("Consumption (GWh PCS)")
            .x_axis_formatter(|mark, _range| {
                let year = mark.value.round();
                if (mark.value - year).abs() < 1e-6 {
                    format!("{}", year as i64)
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(series.iter().copied()))
                        .color(YEAR_A_COLOR)
                        .width(2.0)
                        .name(region),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(series.iter().copied()))
                        .radius(4.0)
                        .color(YEAR_A_COLOR),
                );
            });
    }

    /// Donut chart of each region's share of the year total.
    pub fn draw_pie_chart(ui: &mut egui::Ui, slices: &[PieSlice], year: i32) {
        if slices.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        const INNER_RADIUS: f64 = 0.45;
        const OUTER_RADIUS: f64 = 1.0;

        Plot::new(format!("pie_{}", year))
            .height(CHART_HEIGHT)
            .data_aspect(1.0)
            .legend(Legend::default())
            .show_axes([false, false])
            .show_grid([false, false])
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                let mut start = 0.0f64;
                for (i, slice) in slices.iter().enumerate() {
                    let sweep = slice.share * std::f64::consts::TAU;
                    let segments =
                        ((slice.share * PIE_SEGMENTS_PER_TURN as f64).ceil() as usize).max(2);

                    // Ring wedge: outer arc forward, inner arc back.
                    let mut points = Vec::with_capacity(2 * (segments + 1));
                    for s in 0..=segments {
                        let a = start + sweep * s as f64 / segments as f64;
                        points.push([OUTER_RADIUS * a.cos(), OUTER_RADIUS * a.sin()]);
                    }
                    for s in (0..=segments).rev() {
                        let a = start + sweep * s as f64 / segments as f64;
                        points.push([INNER_RADIUS * a.cos(), INNER_RADIUS * a.sin()]);
                    }

                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from_iter(points.into_iter()))
                            .fill_color(region_color(i).gamma_multiply(0.85))
                            .stroke(egui::Stroke::new(1.0, Color32::WHITE))
                            .name(format!("{} ({:.1}%)", slice.region, slice.share * 100.0)),
                    );
                    start += sweep;
                }
            });
    }

    /// Distribution of one year's consumption values.
    pub fn draw_histogram_chart(ui: &mut egui::Ui, bins: &[HistogramBin], year: i32) {
        if bins.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        let bars: Vec<Bar> = bins
            .iter()
            .map(|b| {
                Bar::new((b.lower + b.upper) / 2.0, b.count as f64)
                    .width((b.upper - b.lower).max(f64::EPSILON) * 0.95)
            })
            .collect();

        Plot::new(format!("histogram_{}", year))
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("Consumption (GWh PCS)")
            .y_axis_label("Regions")
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(YEAR_A_COLOR));
            });
    }

    /// Percent change per region between the two selected years; green up,
    /// red down.
    pub fn draw_variation_chart(ui: &mut egui::Ui, rows: &[VariationRow]) {
        if rows.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        let bars: Vec<Bar> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.percent.is_finite())
            .map(|(i, r)| {
                let color = if r.percent >= 0.0 {
                    INCREASE_COLOR
                } else {
                    DECREASE_COLOR
                };
                Bar::new(i as f64, r.percent).width(0.7).fill(color)
            })
            .collect();

        let labels: Vec<String> = rows.iter().map(|r| r.region.clone()).collect();
        Plot::new("variation")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .y_axis_label("Variation (%)")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 0.3 {
                    labels.get(idx).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Region × year heatmap of consumption.
    pub fn draw_heatmap(ui: &mut egui::Ui, heat: &HeatmapTable) {
        if heat.values.is_empty() {
            Self::empty_notice(ui);
            return;
        }

        let regions = heat.regions.clone();
        let years = heat.years.clone();
        Plot::new("heatmap")
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_grid([false, false])
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.floor() as usize;
                if (mark.value - (idx as f64 + 0.5)).abs() < 0.3 {
                    years.get(idx).map(|y| y.to_string()).unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .y_axis_formatter(move |mark, _range| {
                let idx = mark.value.floor() as usize;
                if (mark.value - (idx as f64 + 0.5)).abs() < 0.3 {
                    regions.get(idx).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                for r in 0..heat.regions.len() {
                    for y in 0..heat.years.len() {
                        let Some(value) = heat.value(r, y) else {
                            continue;
                        };
                        let (red, green, blue) = colormap::blue_orange(colormap::normalize(
                            value, heat.min, heat.max,
                        ));
                        let (x, yy) = (y as f64, r as f64);
                        let cell = vec![
                            [x, yy],
                            [x + 1.0, yy],
                            [x + 1.0, yy + 1.0],
                            [x, yy + 1.0],
                        ];
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from_iter(cell.into_iter()))
                                .fill_color(Color32::from_rgb(red, green, blue))
                                .stroke(egui::Stroke::NONE),
                        );
                    }
                }
            });
    }
}
