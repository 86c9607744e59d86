//! Main Application
//! Sidebar filters on the left, dashboard on the right. Loading and the
//! heavy renders run on background threads reporting over channels.

use crate::charts::MapRenderer;
use crate::config::DashboardConfig;
use crate::data::loader::{self, VALUE_COL};
use crate::data::{geometry, population, RegionGeometry};
use crate::gui::{DashboardView, FilterPanel, FilterPanelAction, ViewBundle};
use crate::stats::ViewCalculator;
use egui::SidePanel;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

const CHOROPLETH_SIZE: (u32, u32) = (900, 800);
const RACE_FRAME_SIZE: (u32, u32) = (700, 500);
const RACE_STEPS_PER_YEAR: usize = 8;
const RACE_GIF_DELAY_MS: u32 = 120;
const OVERVIEW_ROWS: usize = 5;

/// Everything loaded once per session; read-only afterwards.
struct LoadedData {
    consumption: DataFrame,
    regions: Arc<Vec<RegionGeometry>>,
    population: DataFrame,
}

enum LoadResult {
    Progress(String),
    Complete(Box<LoadedData>),
    Error(String),
}

enum ViewResult {
    Progress(f32, String),
    Complete(Box<ViewBundle>),
    Error(String),
}

enum RaceResult {
    Complete(Vec<crate::charts::RenderedImage>),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    filter_panel: FilterPanel,
    dashboard: DashboardView,
    data: Option<LoadedData>,

    load_rx: Option<Receiver<LoadResult>>,
    view_rx: Option<Receiver<ViewResult>>,
    race_rx: Option<Receiver<RaceResult>>,
    is_loading: bool,
    is_computing: bool,
    needs_recompute: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (config, config_warning) = DashboardConfig::load_or_default();
        if let Some(warning) = &config_warning {
            log::error!("Broken config file, using defaults: {}", warning);
        }

        let mut app = Self {
            config,
            filter_panel: FilterPanel::new(),
            dashboard: DashboardView::new(),
            data: None,
            load_rx: None,
            view_rx: None,
            race_rx: None,
            is_loading: false,
            is_computing: false,
            needs_recompute: false,
        };
        app.filter_panel.config_warning = config_warning;
        app.start_loading();
        app
    }

    /// Read all three inputs on a background thread. The consumption table
    /// goes through the process-wide cache so a rebuild of this struct
    /// never re-parses the file.
    fn start_loading(&mut self) {
        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        self.is_loading = true;
        self.filter_panel.set_progress(5.0, "Loading data...");

        let config = self.config.clone();
        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Parsing consumption CSV...".into()));
            let consumption = match loader::cached_consumption(&config.consumption_csv) {
                Ok(df) => df.clone(),
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                    return;
                }
            };

            let _ = tx.send(LoadResult::Progress("Reading region boundaries...".into()));
            let regions = match geometry::load_regions(&config.regions_shapefile) {
                Ok(r) => Arc::new(r),
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                    return;
                }
            };

            let _ = tx.send(LoadResult::Progress("Reading population CSV...".into()));
            let population = match population::load_population(&config.population_csv) {
                Ok(df) => df,
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                    return;
                }
            };

            let _ = tx.send(LoadResult::Complete(Box::new(LoadedData {
                consumption,
                regions,
                population,
            })));
        });
    }

    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };
        let mut keep = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                LoadResult::Progress(status) => {
                    self.filter_panel.set_progress(10.0, &status);
                }
                LoadResult::Complete(data) => {
                    if let Some((min, max)) = loader::year_bounds(&data.consumption) {
                        self.filter_panel.set_year_bounds(min, max);
                    }
                    self.filter_panel
                        .update_regions(loader::region_names(&data.consumption));
                    self.filter_panel.set_progress(30.0, "Data loaded");
                    self.data = Some(*data);
                    self.is_loading = false;
                    keep = false;
                    self.start_view_computation();
                    self.start_race_render();
                }
                LoadResult::Error(error) => {
                    log::error!("Startup load failed: {}", error);
                    self.filter_panel.set_progress(0.0, &format!("Error: {}", error));
                    self.is_loading = false;
                    keep = false;
                }
            }
        }

        if keep {
            self.load_rx = Some(rx);
        }
    }

    /// Recompute every view for the current filters on a background thread.
    fn start_view_computation(&mut self) {
        let Some(data) = &self.data else {
            return;
        };
        if self.is_computing {
            self.needs_recompute = true;
            return;
        }

        let (tx, rx) = channel();
        self.view_rx = Some(rx);
        self.is_computing = true;
        self.filter_panel.set_progress(40.0, "Deriving views...");

        let consumption = data.consumption.clone();
        let population = data.population.clone();
        let regions = Arc::clone(&data.regions);
        let settings = self.filter_panel.settings.clone();
        let config = self.config.clone();

        thread::spawn(move || {
            Self::run_view_computation(tx, consumption, population, regions, settings, config);
        });
    }

    fn run_view_computation(
        tx: Sender<ViewResult>,
        consumption: DataFrame,
        population: DataFrame,
        regions: Arc<Vec<RegionGeometry>>,
        settings: crate::gui::filter_panel::FilterSettings,
        config: DashboardConfig,
    ) {
        let (year_a, year_b) = (settings.year_a, settings.year_b);

        let computed = (|| -> Result<ViewBundle, crate::stats::StatsError> {
            let overview = loader::records(&consumption.head(Some(OVERVIEW_ROWS)))?;
            let comparison = ViewCalculator::comparison(&consumption, year_a, year_b)?;
            let trend = ViewCalculator::trend(&consumption, &settings.region)?;
            let pie = ViewCalculator::pie(&consumption, year_a)?;
            let describe = ViewCalculator::describe(&consumption, year_a)?;
            let top = ViewCalculator::top_regions(&consumption, year_a, 3)?;
            let bottom = ViewCalculator::bottom_regions(&consumption, year_a, 3)?;
            let variation = ViewCalculator::variation(&consumption, year_a, year_b)?;
            let histogram = ViewCalculator::histogram(&consumption, year_a, 30)?;
            let heatmap = ViewCalculator::heatmap(&consumption)?;
            let per_capita = ViewCalculator::per_capita(&consumption, &population, year_a)?;

            Ok(ViewBundle {
                year_a,
                year_b,
                region: settings.region.clone(),
                overview,
                comparison,
                trend,
                pie,
                describe,
                top,
                bottom,
                variation,
                histogram,
                heatmap,
                per_capita,
                column_map: None,
                choropleth: None,
                per_capita_map: None,
            })
        })();

        let mut bundle = match computed {
            Ok(bundle) => bundle,
            Err(e) => {
                let _ = tx.send(ViewResult::Error(e.to_string()));
                return;
            }
        };

        let _ = tx.send(ViewResult::Progress(60.0, "Rendering maps...".into()));
        let metropolitan: Vec<RegionGeometry> = regions
            .iter()
            .filter(|r| !geometry::is_overseas(&r.name))
            .cloned()
            .collect();

        // Raw choropleth uses the global value range so the color scale is
        // comparable across years.
        let value_range = consumption
            .column(VALUE_COL)
            .ok()
            .and_then(|c| c.f64().ok().map(|ca| (ca.min(), ca.max())))
            .and_then(|(min, max)| Some((min?, max?)))
            .unwrap_or((0.0, 1.0));

        let year_values: BTreeMap<String, f64> =
            match loader::filter_year(&consumption, year_a).and_then(|df| loader::records(&df)) {
                Ok(records) => records
                    .into_iter()
                    .map(|r| (r.insee_code, r.consumption_gwh))
                    .collect(),
                Err(e) => {
                    let _ = tx.send(ViewResult::Error(e.to_string()));
                    return;
                }
            };
        if year_values.is_empty() {
            log::warn!("No consumption rows for year {}", year_a);
        }

        bundle.choropleth = MapRenderer::render_choropleth(
            &metropolitan,
            &year_values,
            value_range,
            &format!("CNG consumption by metropolitan region ({})", year_a),
            CHOROPLETH_SIZE,
        )
        .map_err(|e| log::warn!("Choropleth render failed: {}", e))
        .ok();

        let capita_values: BTreeMap<String, f64> = bundle
            .per_capita
            .iter()
            .map(|r| (r.insee_code.clone(), r.per_capita_kwh))
            .collect();
        let capita_range = capita_values
            .values()
            .fold(None::<(f64, f64)>, |acc, &v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
            .unwrap_or((0.0, 1.0));

        bundle.per_capita_map = MapRenderer::render_choropleth(
            &metropolitan,
            &capita_values,
            capita_range,
            &format!("CNG consumption per inhabitant, kWh ({})", year_a),
            CHOROPLETH_SIZE,
        )
        .map_err(|e| log::warn!("Per-capita choropleth render failed: {}", e))
        .ok();

        let _ = tx.send(ViewResult::Progress(80.0, "Rendering 3D map...".into()));
        bundle.column_map = ViewCalculator::column_points(&consumption, year_a)
            .ok()
            .and_then(|points| {
                MapRenderer::render_column_map(
                    &points,
                    &format!("3D consumption columns ({})", year_a),
                    CHOROPLETH_SIZE,
                )
                .map_err(|e| log::warn!("3D map render failed: {}", e))
                .ok()
            });

        // One raster artifact per choropleth render, as the original did.
        if let Some(img) = &bundle.choropleth {
            let path = config.choropleth_path("choropleth", year_a);
            if let Err(e) = img.save_png(&path) {
                log::warn!("Could not write {}: {}", path.display(), e);
            }
        }
        if let Some(img) = &bundle.per_capita_map {
            let path = config.choropleth_path("choropleth_per_capita", year_a);
            if let Err(e) = img.save_png(&path) {
                log::warn!("Could not write {}: {}", path.display(), e);
            }
        }

        let _ = tx.send(ViewResult::Complete(Box::new(bundle)));
    }

    fn check_view_results(&mut self, ctx: &egui::Context) {
        let Some(rx) = self.view_rx.take() else {
            return;
        };
        let mut keep = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                ViewResult::Progress(progress, status) => {
                    self.filter_panel.set_progress(progress, &status);
                }
                ViewResult::Complete(bundle) => {
                    self.dashboard.set_bundle(ctx, *bundle);
                    self.filter_panel.set_progress(100.0, "Ready");
                    self.is_computing = false;
                    keep = false;
                }
                ViewResult::Error(error) => {
                    self.filter_panel.set_progress(0.0, &format!("Error: {}", error));
                    self.is_computing = false;
                    keep = false;
                }
            }
        }

        if keep {
            self.view_rx = Some(rx);
        } else if self.needs_recompute {
            self.needs_recompute = false;
            self.start_view_computation();
        }
    }

    /// The race only depends on the full table, so it renders once per
    /// session, right after loading.
    fn start_race_render(&mut self) {
        let Some(data) = &self.data else {
            return;
        };
        let (tx, rx) = channel();
        self.race_rx = Some(rx);

        let consumption = data.consumption.clone();
        let gif_path = self.config.race_gif_path();
        thread::spawn(move || {
            let result = ViewCalculator::race_table(&consumption)
                .map_err(|e| e.to_string())
                .and_then(|race| {
                    MapRenderer::render_race_frames(&race, RACE_STEPS_PER_YEAR, RACE_FRAME_SIZE)
                        .map_err(|e| e.to_string())
                })
                .and_then(|frames| {
                    MapRenderer::encode_gif(&frames, &gif_path, RACE_GIF_DELAY_MS)
                        .map_err(|e| e.to_string())
                        .map(|()| frames)
                });
            let _ = tx.send(match result {
                Ok(frames) => RaceResult::Complete(frames),
                Err(e) => RaceResult::Error(e),
            });
        });
    }

    fn check_race_results(&mut self, ctx: &egui::Context) {
        let Some(rx) = self.race_rx.take() else {
            return;
        };
        match rx.try_recv() {
            Ok(RaceResult::Complete(frames)) => {
                self.dashboard.set_race_frames(ctx, &frames);
                self.filter_panel.gif_ready = true;
            }
            Ok(RaceResult::Error(error)) => {
                log::warn!("Race render failed: {}", error);
            }
            Err(_) => {
                self.race_rx = Some(rx);
            }
        }
    }

    fn handle_open_gif(&self) {
        let path = self.config.race_gif_path();
        if let Err(e) = open::that(&path) {
            log::warn!("Could not open {}: {}", path.display(), e);
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();
        self.check_view_results(ctx);
        self.check_race_results(ctx);

        if self.is_loading || self.is_computing {
            ctx.request_repaint();
        }

        SidePanel::left("filter_panel")
            .min_width(260.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.filter_panel.show(ui) {
                        FilterPanelAction::FiltersChanged => self.start_view_computation(),
                        FilterPanelAction::OpenGif => self.handle_open_gif(),
                        FilterPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.dashboard.show(ui);
        });
    }
}
