use crate::routes::Route;

/// Landing page with a link to every other page. Returns the page the user picked.
pub fn show_home(ui: &mut egui::Ui) -> Option<Route> {
    let mut picked = None;
    ui.heading("Dataframe Cleaner");
    ui.label("Upload a CSV or Excel file, apply column operations and download any version.");
    ui.add_space(12.0);
    for route in Route::ALL.into_iter().filter(|r| *r != Route::Home) {
        if ui.link(route.title()).clicked() {
            picked = Some(route);
        }
        ui.weak(route.path());
        ui.add_space(4.0);
    }
    picked
}

#[derive(Debug, Default)]
pub struct AboutPage {
    count: u32,
}

impl AboutPage {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.heading("About");
        ui.label(format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label(format!("count is {}", self.count));
            if ui.button("+1").clicked() {
                self.increment();
            }
        });
    }
}
