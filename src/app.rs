use eframe::egui::{self, Color32, ColorImage, TextureHandle, TextureOptions};
use hierarchical_rd::{
    GlobalParams, LayerId, LayerParams, Mode, Selector, SimConfig, Simulation, StageId,
    StageParams, StageRole,
};

const SIDE: usize = 256;

pub struct CascadeApp {
    sim: Simulation,
    params: GlobalParams,
    mode: Mode,
    steps_per_frame: usize,
    left: Selector,
    right: Selector,
    textures: [Option<TextureHandle>; 2],
    status: Option<String>,
    paused: bool,
}

impl CascadeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self, hierarchical_rd::CoreError> {
        let sim = Simulation::new(SimConfig::new(SIDE))?;
        Ok(Self {
            sim,
            params: GlobalParams::default(),
            mode: Mode::Structure,
            steps_per_frame: 1,
            left: Selector::BASE_X,
            right: Selector::layer(0),
            textures: [None, None],
            status: None,
            paused: false,
        })
    }

    fn switch_mode(&mut self, mode: Mode) {
        if self.sim.switch_mode(mode) {
            self.mode = mode;
            let views = self.sim.views();
            if !views.contains(&self.left) {
                self.left = Selector::BASE_X;
            }
            if !views.contains(&self.right) {
                self.right = match mode {
                    Mode::Structure => Selector::layer(0),
                    Mode::Cascade => Selector::BASE_Y,
                };
            }
        }
    }

    fn add_level(&mut self) {
        let added = match self.mode {
            Mode::Structure => {
                let index = self.sim.layers().len();
                self.sim
                    .add_layer(LayerParams::for_layer(index))
                    .map(|LayerId(id)| Selector::layer(id))
            }
            Mode::Cascade => self
                .sim
                .add_stage(StageParams::from_global(&self.params))
                .map(|StageId(id)| Selector::stage_y(id)),
        };
        match added {
            Ok(selector) => {
                self.right = selector;
                self.status = None;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn update_textures(&mut self, ctx: &egui::Context) {
        let c = self.sim.current_feedback_value();
        for (slot, selector, bar) in [(0, self.left, None), (1, self.right, Some(c))] {
            let view = self.sim.sample_field(selector);
            let side = view.side();
            let image = ColorImage::from_rgba_unmultiplied([side, side], &to_rgba8(view.values(), side, bar));
            match &mut self.textures[slot] {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.textures[slot] =
                        Some(ctx.load_texture(format!("view-{slot}"), image, TextureOptions::NEAREST));
                }
            }
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Mode");
        ui.horizontal(|ui| {
            if ui.selectable_label(self.mode == Mode::Structure, "structure").clicked() {
                self.switch_mode(Mode::Structure);
            }
            if ui.selectable_label(self.mode == Mode::Cascade, "cascade").clicked() {
                self.switch_mode(Mode::Cascade);
            }
        });

        ui.separator();
        ui.heading("Reaction-Diffusion");
        ui.add(egui::Slider::new(&mut self.params.diff_a, 0.0..=1.5).text("diff A"));
        ui.add(egui::Slider::new(&mut self.params.diff_b, 0.0..=1.0).text("diff B"));
        ui.add(egui::Slider::new(&mut self.params.feed, 0.0..=0.1).text("feed"));
        ui.add(egui::Slider::new(&mut self.params.kill, 0.0..=0.1).text("kill"));
        ui.add(egui::Slider::new(&mut self.params.dt, 0.05..=1.5).text("dt"));
        ui.add(egui::Slider::new(&mut self.steps_per_frame, 1..=20).text("steps/frame"));
        let number = self.params.diffusion_number();
        if number >= 1.0 {
            ui.colored_label(
                Color32::from_rgb(230, 160, 60),
                format!("4·dt·diff = {number:.2}: explicit step is unstable"),
            );
        }

        ui.horizontal(|ui| {
            if ui.button(if self.paused { "Resume" } else { "Pause" }).clicked() {
                self.paused = !self.paused;
            }
            if ui.button("Reseed").clicked() {
                self.sim.reseed();
            }
            let add_label = match self.mode {
                Mode::Structure => "Add layer",
                Mode::Cascade => "Add stage",
            };
            if ui.button(add_label).clicked() {
                self.add_level();
            }
        });
        if let Some(status) = &self.status {
            ui.colored_label(Color32::from_rgb(230, 100, 100), status.as_str());
        }

        ui.separator();
        match self.mode {
            Mode::Structure => self.draw_structure_controls(ui),
            Mode::Cascade => self.draw_stage_controls(ui),
        }

        ui.separator();
        ui.heading("Views");
        let views = self.sim.views();
        view_picker(ui, "left", &mut self.left, &views);
        view_picker(ui, "right", &mut self.right, &views);
    }

    fn draw_structure_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Feedback");
        ui.add(egui::Slider::new(&mut self.params.inhibition, 0.0..=2.0).text("inhibition"));
        ui.add(egui::Slider::new(&mut self.params.smoothing, 0.0..=0.999).text("C smoothing"));

        let mut enabled = self.sim.feedback_enabled();
        if ui.checkbox(&mut enabled, "C inhibition").changed() {
            self.sim.set_feedback_enabled(enabled);
        }

        let labels: Vec<String> = self.sim.layers().iter().map(|l| l.label()).collect();
        let current = self.sim.feedback_source();
        let mut selected = current;
        egui::ComboBox::from_label("C source")
            .selected_text(
                selected
                    .and_then(|LayerId(i)| labels.get(i).cloned())
                    .unwrap_or_default(),
            )
            .show_ui(ui, |ui| {
                for (i, label) in labels.iter().enumerate() {
                    ui.selectable_value(&mut selected, Some(LayerId(i)), label.as_str());
                }
            });
        if selected != current {
            if let Some(id) = selected {
                self.sim.set_feedback_source(id);
            }
        }

        for (i, label) in labels.iter().enumerate() {
            let value = self.sim.layer_global_value(LayerId(i)).unwrap_or(0.0);
            ui.label(format!("{label}: {value:.3}"));
            if let Ok(params) = self.sim.layer_params_mut(LayerId(i)) {
                ui.add(egui::Slider::new(&mut params.gain, 0.1..=20.0).text("gain"));
            }
        }
    }

    fn draw_stage_controls(&mut self, ui: &mut egui::Ui) {
        let stages: Vec<(StageId, String, bool, bool)> = self
            .sim
            .stages()
            .iter()
            .map(|s| {
                let driven = matches!(s.role(), StageRole::Driven(_));
                (s.id(), s.label(), s.is_frozen(), driven)
            })
            .collect();

        for (id, label, frozen, driven) in stages {
            ui.horizontal(|ui| {
                ui.strong(label.as_str());
                if frozen {
                    ui.colored_label(Color32::LIGHT_BLUE, "FROZEN");
                }
            });
            if driven {
                if let Ok(params) = self.sim.stage_params_mut(id) {
                    ui.add(egui::Slider::new(&mut params.diff_x, 0.0..=2.0).text("diffX"));
                    ui.add(egui::Slider::new(&mut params.diff_y, 0.0..=2.0).text("diffY"));
                    ui.add(egui::Slider::new(&mut params.feed, 0.0..=0.1).text("feed"));
                    ui.add(egui::Slider::new(&mut params.kill, 0.0..=0.1).text("kill"));
                    ui.add(egui::Slider::new(&mut params.drive, 0.0..=10.0).text("drive"));
                }
            } else {
                ui.label("driven by the global sliders");
            }
            if ui.button(if frozen { "Unfreeze" } else { "Freeze" }).clicked() {
                if let Err(err) = self.sim.set_frozen(id, !frozen) {
                    self.status = Some(err.to_string());
                }
            }
            ui.add_space(4.0);
        }
    }

    fn draw_visuals(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let left = self.sim.sample_field(self.left).stats();
            let right = self.sim.sample_field(self.right).stats();
            ui.label(format!("mode: {}", self.mode.label()));
            ui.separator();
            ui.label(format!("tick: {}", self.sim.tick_count()));
            ui.separator();
            ui.label(format!("left mean: {:.4}", left.mean));
            ui.separator();
            ui.label(format!("right mean: {:.4}", right.mean));
            if self.mode == Mode::Structure {
                ui.separator();
                ui.label(format!("C: {:.4}", self.sim.current_feedback_value()));
            }
        });

        ui.separator();

        let available = ui.available_size();
        let size = (available.x / 2.0).min(available.y).max(64.0);
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            for texture in self.textures.iter().flatten() {
                ui.image((texture.id(), egui::vec2(size, size)));
            }
        });
    }
}

fn view_picker(ui: &mut egui::Ui, label: &str, selected: &mut Selector, views: &[Selector]) {
    egui::ComboBox::from_label(label)
        .selected_text(selected.label())
        .show_ui(ui, |ui| {
            for view in views {
                ui.selectable_value(selected, *view, view.label());
            }
        });
}

fn ramp(value: f32) -> f32 {
    let t = ((value.clamp(0.0, 1.0) - 0.1) / 0.8).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Grey ramp of one channel; with `bar`, a white strip along the top row
/// band covering the `bar` fraction of the width.
fn to_rgba8(values: &[f32], side: usize, bar: Option<f32>) -> Vec<u8> {
    let band = (side / 50).max(1);
    let bar_cols = bar.map_or(0, |c| (c.clamp(0.0, 1.0) * side as f32) as usize);
    let mut rgba = Vec::with_capacity(values.len() * 4);
    for (idx, &value) in values.iter().enumerate() {
        let (x, y) = (idx % side, idx / side);
        let grey = if y < band && x < bar_cols {
            255
        } else {
            (ramp(value) * 255.0) as u8
        };
        rgba.extend_from_slice(&[grey, grey, grey, 255]);
    }
    rgba
}

impl eframe::App for CascadeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.paused {
            for _ in 0..self.steps_per_frame {
                self.sim.advance(self.mode, &self.params);
            }
        }

        self.update_textures(ctx);

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.draw_controls(ui);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_visuals(ui);
        });

        ctx.request_repaint();
    }
}
