//! Dashboard View
//! Central scrollable panel: the fixed sequence of charts, tables, and
//! maps derived from the current filters.

use crate::charts::{ChartPlotter, RenderedImage};
use crate::data::ConsumptionRecord;
use crate::stats::{
    ComparisonRow, DescriptiveStats, HeatmapTable, HistogramBin, PerCapitaRow, PieSlice,
    RankedRegion, TrendPoint, VariationRow,
};
use egui::{ColorImage, RichText, ScrollArea, TextureHandle, TextureOptions};
use std::time::Duration;

/// Seconds each race frame stays on screen.
const RACE_FRAME_SECONDS: f64 = 0.12;

/// Everything the dashboard shows for one set of filter values, computed
/// off the UI thread.
pub struct ViewBundle {
    pub year_a: i32,
    pub year_b: i32,
    pub region: String,
    pub overview: Vec<ConsumptionRecord>,
    pub comparison: Vec<ComparisonRow>,
    pub trend: Vec<TrendPoint>,
    pub pie: Vec<PieSlice>,
    pub describe: Option<DescriptiveStats>,
    pub top: Vec<RankedRegion>,
    pub bottom: Vec<RankedRegion>,
    pub variation: Vec<VariationRow>,
    pub histogram: Vec<HistogramBin>,
    pub heatmap: HeatmapTable,
    pub per_capita: Vec<PerCapitaRow>,
    pub column_map: Option<RenderedImage>,
    pub choropleth: Option<RenderedImage>,
    pub per_capita_map: Option<RenderedImage>,
}

fn texture_from(ctx: &egui::Context, name: &str, img: &RenderedImage) -> TextureHandle {
    let color = ColorImage::from_rgb([img.width as usize, img.height as usize], &img.rgb);
    ctx.load_texture(name, color, TextureOptions::LINEAR)
}

/// Scrollable view over the current bundle plus the race animation.
pub struct DashboardView {
    bundle: Option<ViewBundle>,
    column_map_tex: Option<TextureHandle>,
    choropleth_tex: Option<TextureHandle>,
    per_capita_tex: Option<TextureHandle>,
    race_frames: Vec<TextureHandle>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            bundle: None,
            column_map_tex: None,
            choropleth_tex: None,
            per_capita_tex: None,
            race_frames: Vec::new(),
        }
    }
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly computed bundle and upload its map textures.
    pub fn set_bundle(&mut self, ctx: &egui::Context, bundle: ViewBundle) {
        self.column_map_tex = bundle
            .column_map
            .as_ref()
            .map(|img| texture_from(ctx, "column_map", img));
        self.choropleth_tex = bundle
            .choropleth
            .as_ref()
            .map(|img| texture_from(ctx, "choropleth", img));
        self.per_capita_tex = bundle
            .per_capita_map
            .as_ref()
            .map(|img| texture_from(ctx, "per_capita_map", img));
        self.bundle = Some(bundle);
    }

    pub fn set_race_frames(&mut self, ctx: &egui::Context, frames: &[RenderedImage]) {
        self.race_frames = frames
            .iter()
            .enumerate()
            .map(|(i, img)| texture_from(ctx, &format!("race_{}", i), img))
            .collect();
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(bundle) = &self.bundle else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Loading dashboard...").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Dashboard on CNG consumption by region in France");
                ui.label(
                    "CNG (Compressed Natural Gas) is an ecological alternative to \
                     traditional vehicle fuels. This dashboard explores its consumption \
                     by French region and year, in GWh PCS.",
                );
                ui.add_space(10.0);

                Self::section(ui, "Data overview", |ui| {
                    Self::overview_table(ui, &bundle.overview);
                });

                Self::section(
                    ui,
                    &format!("Consumption comparison, {} vs {}", bundle.year_a, bundle.year_b),
                    |ui| {
                        ChartPlotter::draw_comparison_chart(
                            ui,
                            &bundle.comparison,
                            bundle.year_a,
                            bundle.year_b,
                        );
                    },
                );

                Self::section(
                    ui,
                    &format!("Consumption trend for {}", bundle.region),
                    |ui| {
                        ChartPlotter::draw_trend_chart(ui, &bundle.trend, &bundle.region);
                    },
                );

                Self::section(
                    ui,
                    &format!("Share of consumption by region in {}", bundle.year_a),
                    |ui| {
                        ChartPlotter::draw_pie_chart(ui, &bundle.pie, bundle.year_a);
                    },
                );

                Self::section(
                    ui,
                    &format!("Descriptive statistics for {}", bundle.year_a),
                    |ui| {
                        Self::describe_table(ui, bundle.describe.as_ref());
                    },
                );

                Self::section(
                    ui,
                    &format!("Top and bottom consumers in {}", bundle.year_a),
                    |ui| {
                        ui.columns(2, |columns| {
                            columns[0].label(RichText::new("Top 3").strong());
                            Self::ranking_table(&mut columns[0], "top", &bundle.top);
                            columns[1].label(RichText::new("Bottom 3").strong());
                            Self::ranking_table(&mut columns[1], "bottom", &bundle.bottom);
                        });
                    },
                );

                Self::section(
                    ui,
                    &format!(
                        "Consumption variation between {} and {}",
                        bundle.year_a, bundle.year_b
                    ),
                    |ui| {
                        ui.label(
                            RichText::new(
                                "Green bars grew over the period, red bars shrank.",
                            )
                            .size(11.0),
                        );
                        ChartPlotter::draw_variation_chart(ui, &bundle.variation);
                    },
                );

                Self::section(
                    ui,
                    &format!("Consumption distribution in {}", bundle.year_a),
                    |ui| {
                        ChartPlotter::draw_histogram_chart(ui, &bundle.histogram, bundle.year_a);
                    },
                );

                Self::section(ui, "Heatmap of consumption by region and year", |ui| {
                    ChartPlotter::draw_heatmap(ui, &bundle.heatmap);
                });

                Self::section(
                    ui,
                    &format!("3D consumption map ({})", bundle.year_a),
                    |ui| {
                        Self::map_image(ui, self.column_map_tex.as_ref());
                    },
                );

                Self::section(
                    ui,
                    &format!("Metropolitan choropleth ({})", bundle.year_a),
                    |ui| {
                        Self::map_image(ui, self.choropleth_tex.as_ref());
                    },
                );

                Self::section(ui, "Bar-chart race over the years", |ui| {
                    self.race_animation(ui);
                });

                Self::section(
                    ui,
                    &format!("Per-capita consumption ({})", bundle.year_a),
                    |ui| {
                        ui.label(
                            "Consumption per inhabitant compares regions more fairly: \
                             populous regions consume more in absolute terms.",
                        );
                        ui.add_space(5.0);
                        Self::map_image(ui, self.per_capita_tex.as_ref());
                        ui.add_space(5.0);
                        Self::per_capita_table(ui, &bundle.per_capita);
                    },
                );

                ui.add_space(20.0);
                ui.label(
                    RichText::new(
                        "CNG consumption in France trends upward, with some regions \
                         adopting it faster than others.",
                    )
                    .size(11.0),
                );
            });
    }

    fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
        ui.add_space(15.0);
        ui.separator();
        ui.add_space(5.0);
        ui.label(RichText::new(title).size(16.0).strong());
        ui.add_space(5.0);
        add_contents(ui);
    }

    fn map_image(ui: &mut egui::Ui, texture: Option<&TextureHandle>) {
        match texture {
            Some(texture) => {
                let max_width = ui.available_width().min(900.0);
                let size = texture.size_vec2();
                let scale = max_width / size.x;
                ui.add(egui::Image::new(texture).fit_to_exact_size(size * scale));
            }
            None => {
                ui.label("Map unavailable for this selection");
            }
        }
    }

    fn race_animation(&self, ui: &mut egui::Ui) {
        if self.race_frames.is_empty() {
            ui.label("Rendering animation...");
            return;
        }

        let time = ui.input(|i| i.time);
        let index = ((time / RACE_FRAME_SECONDS) as usize) % self.race_frames.len();
        Self::map_image(ui, self.race_frames.get(index));
        ui.ctx().request_repaint_after(Duration::from_millis(40));
    }

    fn overview_table(ui: &mut egui::Ui, records: &[ConsumptionRecord]) {
        egui::Grid::new("overview")
            .striped(true)
            .min_col_width(80.0)
            .show(ui, |ui| {
                for header in ["Region", "Year", "GWh PCS", "INSEE", "Lat", "Lon"] {
                    ui.label(RichText::new(header).strong().size(11.0));
                }
                ui.end_row();

                for record in records {
                    ui.label(RichText::new(&record.region).size(11.0));
                    ui.label(RichText::new(record.year.to_string()).size(11.0));
                    ui.label(
                        RichText::new(format!("{:.2}", record.consumption_gwh)).size(11.0),
                    );
                    ui.label(RichText::new(&record.insee_code).size(11.0));
                    ui.label(RichText::new(format!("{:.2}", record.latitude)).size(11.0));
                    ui.label(RichText::new(format!("{:.2}", record.longitude)).size(11.0));
                    ui.end_row();
                }
            });
    }

    fn describe_table(ui: &mut egui::Ui, stats: Option<&DescriptiveStats>) {
        let Some(stats) = stats else {
            ui.label("No data for this selection");
            return;
        };

        egui::Grid::new("describe")
            .striped(true)
            .min_col_width(70.0)
            .show(ui, |ui| {
                for header in ["Count", "Mean", "Std", "Min", "25%", "Median", "75%", "Max"] {
                    ui.label(RichText::new(header).strong().size(11.0));
                }
                ui.end_row();

                ui.label(RichText::new(stats.count.to_string()).size(11.0));
                for value in [
                    stats.mean,
                    stats.std,
                    stats.min,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.max,
                ] {
                    ui.label(RichText::new(format!("{:.2}", value)).size(11.0));
                }
                ui.end_row();
            });
    }

    fn ranking_table(ui: &mut egui::Ui, id: &str, ranked: &[RankedRegion]) {
        egui::Grid::new(format!("ranking_{}", id))
            .striped(true)
            .min_col_width(100.0)
            .show(ui, |ui| {
                ui.label(RichText::new("Region").strong().size(11.0));
                ui.label(RichText::new("GWh PCS").strong().size(11.0));
                ui.end_row();
                for row in ranked {
                    ui.label(RichText::new(&row.region).size(11.0));
                    ui.label(RichText::new(format!("{:.2}", row.value)).size(11.0));
                    ui.end_row();
                }
            });
    }

    fn per_capita_table(ui: &mut egui::Ui, rows: &[PerCapitaRow]) {
        if rows.is_empty() {
            ui.label("No data for this selection");
            return;
        }

        egui::Grid::new("per_capita")
            .striped(true)
            .min_col_width(100.0)
            .show(ui, |ui| {
                for header in ["Region", "GWh PCS", "Population", "kWh / inhabitant"] {
                    ui.label(RichText::new(header).strong().size(11.0));
                }
                ui.end_row();
                for row in rows {
                    ui.label(RichText::new(&row.region).size(11.0));
                    ui.label(RichText::new(format!("{:.2}", row.consumption_gwh)).size(11.0));
                    ui.label(RichText::new(row.population.to_string()).size(11.0));
                    ui.label(RichText::new(format!("{:.1}", row.per_capita_kwh)).size(11.0));
                    ui.end_row();
                }
            });
    }
}
