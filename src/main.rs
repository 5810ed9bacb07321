#![warn(clippy::all, rust_2018_idioms)]

use dataframe_cleaner::App;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Log to stderr (if you run with `RUST_LOG=debug`).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = tokio::runtime::Runtime::new()?;
    let handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Dataframe Cleaner",
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc, handle)))),
    )?;
    Ok(())
}
