mod app;

fn main() -> eframe::Result<()> {
    if let Err(err) = hierarchical_rd::telemetry::init_tracing() {
        eprintln!("{err}");
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([900.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Hierarchical Reaction Diffusion",
        options,
        Box::new(|cc| Ok(Box::new(app::CascadeApp::new(cc)?))),
    )
}
