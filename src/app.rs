use crate::api::ApiClient;
use crate::cleaner::CleanerPage;
use crate::config::{ClientConfig, MIN_POLL_INTERVAL_MS};
use crate::pages::{self, AboutPage};
use crate::routes::Route;
use crate::upload::{Endpoint, SyncUploadPage};
use egui::{DragValue, Grid, TextEdit, Window};
use std::time::Duration;
use tokio::runtime::Handle;

const BUSY_REPAINT: Duration = Duration::from_millis(100);

enum Page {
    Home,
    About(AboutPage),
    Upload(SyncUploadPage),
    Cleaner(CleanerPage),
    /// The page needs the backend but no client could be built.
    Unavailable(String),
}

impl Page {
    fn is_busy(&self) -> bool {
        match self {
            Page::Upload(page) => page.is_busy(),
            Page::Cleaner(page) => page.is_busy(),
            _ => false,
        }
    }
}

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct App {
    route: Route,
    config: ClientConfig,
    #[serde(skip)]
    runtime: Option<Handle>,
    #[serde(skip)]
    client: Option<Result<ApiClient, String>>,
    #[serde(skip)]
    page: Option<Page>,
    #[serde(skip)]
    settings: Option<ClientConfig>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            route: Route::Home,
            config: ClientConfig::default(),
            runtime: None,
            client: None,
            page: None,
            settings: None,
        }
    }
}

impl App {
    /// Called once before the first frame. Background requests run on `runtime`.
    pub fn new(cc: &eframe::CreationContext<'_>, runtime: Handle) -> Self {
        let mut app: App = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        app.config = app.config.with_env_overrides();
        app.runtime = Some(runtime);
        app.rebuild_client();
        log::info!(
            "starting on {} against {}",
            app.route.path(),
            app.config.api_url
        );
        app
    }

    fn rebuild_client(&mut self) {
        let client = ApiClient::new(self.config.clone()).map_err(|err| {
            log::error!("cannot build API client: {err}");
            err.to_string()
        });
        self.client = Some(client);
        self.page = None;
    }

    pub fn navigate(&mut self, route: Route) {
        log::debug!("navigate {} -> {}", self.route.path(), route.path());
        self.route = route;
        // Dropping the old page aborts whatever it still had running.
        self.page = None;
    }

    fn build_page(&self) -> Page {
        let backend = match (&self.client, &self.runtime) {
            (Some(Ok(client)), Some(runtime)) => Ok((client.clone(), runtime.clone())),
            (Some(Err(err)), _) => Err(err.clone()),
            _ => Err("the API client is not initialized".to_owned()),
        };
        match (self.route, backend) {
            (Route::Home, _) => Page::Home,
            (Route::About, _) => Page::About(AboutPage::default()),
            (_, Err(err)) => Page::Unavailable(err),
            (Route::DataframeV1, Ok((client, runtime))) => {
                Page::Upload(SyncUploadPage::new(Endpoint::Columns, client, runtime))
            }
            (Route::DataframeV2, Ok((client, runtime))) => {
                Page::Upload(SyncUploadPage::new(Endpoint::Table, client, runtime))
            }
            (Route::Cleaner, Ok((client, runtime))) => {
                Page::Cleaner(CleanerPage::new(client, runtime))
            }
        }
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        let Some(draft) = self.settings.as_mut() else {
            return;
        };
        let mut open = true;
        let mut apply = false;
        Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                Grid::new("settings_grid")
                    .num_columns(2)
                    .spacing([40.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("API URL");
                        ui.add(TextEdit::singleline(&mut draft.api_url).desired_width(280.0));
                        ui.end_row();

                        ui.label("Token");
                        let mut token = draft.auth_token.clone().unwrap_or_default();
                        if ui
                            .add(TextEdit::singleline(&mut token).password(true))
                            .changed()
                        {
                            draft.auth_token = Some(token).filter(|t| !t.is_empty());
                        }
                        ui.end_row();

                        ui.label("Poll interval (ms)");
                        ui.add(DragValue::new(&mut draft.poll_interval_ms).range(MIN_POLL_INTERVAL_MS..=60_000));
                        ui.end_row();
                    });
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        apply = true;
                    }
                    if ui.button("Reset").clicked() {
                        *draft = ClientConfig::default();
                    }
                });
            });

        if apply {
            if let Some(config) = self.settings.take() {
                log::info!("settings applied, backend is {}", config.api_url);
                self.config = config;
                self.rebuild_client();
            }
        } else if !open {
            self.settings = None;
        }
    }
}

impl eframe::App for App {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut target = None;
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Pages", |ui| {
                    for route in Route::ALL {
                        if ui
                            .selectable_label(self.route == route, route.title())
                            .clicked()
                        {
                            target = Some(route);
                            ui.close_menu();
                        }
                    }
                });
                ui.menu_button("App", |ui| {
                    if ui.button("Settings").clicked() {
                        self.settings = Some(self.config.clone());
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.separator();
                ui.weak(self.route.path());
            });
        });

        if self.page.is_none() {
            self.page = Some(self.build_page());
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| match self.page.as_mut() {
                    Some(Page::Home) => {
                        if let Some(route) = pages::show_home(ui) {
                            target = Some(route);
                        }
                    }
                    Some(Page::About(page)) => page.show(ui),
                    Some(Page::Upload(page)) => page.show(ui),
                    Some(Page::Cleaner(page)) => page.show(ui),
                    Some(Page::Unavailable(err)) => {
                        ui.heading(self.route.title());
                        ui.colored_label(
                            ui.visuals().error_fg_color,
                            format!("Backend unavailable: {err}"),
                        );
                        ui.label("Check the API URL and token under App → Settings.");
                    }
                    None => {}
                });
        });

        self.show_settings(ctx);

        if let Some(route) = target {
            self.navigate(route);
        }
        if self.page.as_ref().is_some_and(Page::is_busy) {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
