//! Filter Panel Widget
//! Left side panel: the two year sliders, the region dropdown, and the
//! load/render status readout.

use egui::{Color32, ComboBox, RichText, Slider};

/// The three user-selected filter values driving every view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    pub year_a: i32,
    pub year_b: i32,
    pub region: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            year_a: 0,
            year_b: 0,
            region: String::new(),
        }
    }
}

/// Left side panel with the filters and progress readout.
pub struct FilterPanel {
    pub settings: FilterSettings,
    /// Slider bounds, min/max year present in the data.
    pub year_bounds: Option<(i32, i32)>,
    pub regions: Vec<String>,
    pub progress: f32,
    pub status: String,
    /// Enables the "open race GIF" button once the file is written.
    pub gif_ready: bool,
    /// Shown persistently when the config file was present but unusable.
    pub config_warning: Option<String>,
}

impl Default for FilterPanel {
    fn default() -> Self {
        Self {
            settings: FilterSettings::default(),
            year_bounds: None,
            regions: Vec::new(),
            progress: 0.0,
            status: "Loading data...".to_string(),
            gif_ready: false,
            config_warning: None,
        }
    }
}

impl FilterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the sliders after the data is loaded; defaults compare the
    /// first year against the last.
    pub fn set_year_bounds(&mut self, min: i32, max: i32) {
        self.year_bounds = Some((min, max));
        self.settings.year_a = min;
        self.settings.year_b = max;
    }

    pub fn update_regions(&mut self, regions: Vec<String>) {
        self.regions = regions;
        if self.settings.region.is_empty() {
            if let Some(first) = self.regions.first() {
                self.settings.region = first.clone();
            }
        }
    }

    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }

    /// Draw the panel; reports whether the user changed a filter.
    pub fn show(&mut self, ui: &mut egui::Ui) -> FilterPanelAction {
        let mut action = FilterPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("⛽ CNG Dashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Consumption by French region")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        ui.label(RichText::new("📆 Years").size(14.0).strong());
        ui.add_space(5.0);
        ui.label(
            RichText::new("Pick two years to compare CNG consumption between them.")
                .size(11.0)
                .color(Color32::GRAY),
        );
        ui.add_space(5.0);

        if let Some((min, max)) = self.year_bounds {
            let before = self.settings.clone();
            ui.add(Slider::new(&mut self.settings.year_a, min..=max).text("First year"));
            ui.add_space(3.0);
            ui.add(Slider::new(&mut self.settings.year_b, min..=max).text("Second year"));
            if self.settings != before {
                action = FilterPanelAction::FiltersChanged;
            }
        } else {
            ui.label(RichText::new("Waiting for data...").color(Color32::GRAY));
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.label(RichText::new("🗺 Region").size(14.0).strong());
        ui.add_space(5.0);
        ui.label(
            RichText::new("Select a region to see its consumption trend over time.")
                .size(11.0)
                .color(Color32::GRAY),
        );
        ui.add_space(5.0);

        ComboBox::from_id_salt("region")
            .width(220.0)
            .selected_text(&self.settings.region)
            .show_ui(ui, |ui| {
                for region in &self.regions {
                    if ui
                        .selectable_label(self.settings.region == *region, region)
                        .clicked()
                        && self.settings.region != *region
                    {
                        self.settings.region = region.clone();
                        action = FilterPanelAction::FiltersChanged;
                    }
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.gif_ready, |ui| {
                let button = egui::Button::new(RichText::new("🎞 Open race GIF").size(14.0))
                    .min_size(egui::vec2(180.0, 30.0));
                if ui.add(button).clicked() {
                    action = FilterPanelAction::OpenGif;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);
        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );
        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Ready") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        if let Some(warning) = &self.config_warning {
            ui.add_space(5.0);
            ui.label(
                RichText::new(format!("⚠ {}", warning))
                    .size(11.0)
                    .color(Color32::from_rgb(255, 193, 7)),
            );
        }

        action
    }
}

/// Actions triggered by the filter panel
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPanelAction {
    None,
    FiltersChanged,
    OpenGif,
}
