//! Pages for the synchronous upload endpoints. The backend answers the upload with the
//! parsed table directly, so there is no polling and no version history.

use crate::api::ApiClient;
use crate::error::CleanerError;
use crate::grid::DataGrid;
use crate::model::TableData;
use crate::polling::TaskSlot;
use egui::{Button, RichText};
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Column-oriented response, field types are inferred.
    Columns,
    /// Rows plus schema.
    Table,
}

impl Endpoint {
    pub fn title(&self) -> &'static str {
        match self {
            Endpoint::Columns => "Dataframe V1",
            Endpoint::Table => "Dataframe V2",
        }
    }

    async fn fetch(&self, client: &ApiClient, path: &Path) -> Result<TableData, CleanerError> {
        match self {
            Endpoint::Columns => Ok(TableData::from_columns(&client.upload_columns(path).await?)),
            Endpoint::Table => Ok(client.upload_table(path).await?.data),
        }
    }
}

pub struct SyncUploadPage {
    endpoint: Endpoint,
    client: ApiClient,
    runtime: Handle,
    file: Option<PathBuf>,
    grid: Option<DataGrid>,
    error: Option<String>,
    task: TaskSlot,
    tx: UnboundedSender<Result<TableData, String>>,
    rx: UnboundedReceiver<Result<TableData, String>>,
}

impl SyncUploadPage {
    pub fn new(endpoint: Endpoint, client: ApiClient, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            endpoint,
            client,
            runtime,
            file: None,
            grid: None,
            error: None,
            task: TaskSlot::default(),
            tx,
            rx,
        }
    }

    pub fn grid(&self) -> Option<&DataGrid> {
        self.grid.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_running()
    }

    pub fn select_file(&mut self, path: PathBuf) {
        self.file = Some(path);
    }

    pub fn upload(&mut self) {
        let Some(path) = self.file.clone() else {
            return;
        };
        self.error = None;
        let endpoint = self.endpoint;
        let client = self.client.clone();
        let tx = self.tx.clone();
        log::info!("{}: uploading {}", endpoint.title(), path.display());
        self.task.spawn(&self.runtime, async move {
            let result = endpoint
                .fetch(&client, &path)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(result);
        });
    }

    pub fn pump(&mut self) {
        while let Ok(result) = self.rx.try_recv() {
            match result.and_then(|table| DataGrid::plain(&table).map_err(|e| e.to_string())) {
                Ok(grid) => self.grid = Some(grid),
                Err(err) => {
                    log::error!("Error uploading file: {err}");
                    self.error = Some(err);
                }
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.pump();

        ui.heading(self.endpoint.title());
        ui.label(RichText::new("Upload CSV or Excel File").strong());
        ui.horizontal(|ui| {
            if ui.button("Choose file…").clicked() {
                if let Some(path) = FileDialog::new()
                    .add_filter("Tabular data", &crate::cleaner::UPLOAD_EXTENSIONS)
                    .pick_file()
                {
                    self.select_file(path);
                }
            }
            if let Some(name) = self.file.as_ref().and_then(|p| p.file_name()) {
                ui.label(name.to_string_lossy());
            }
            if ui
                .add_enabled(self.file.is_some() && !self.is_busy(), Button::new("Upload"))
                .clicked()
            {
                self.upload();
            }
            if self.is_busy() {
                ui.spinner();
            }
        });
        if let Some(err) = &self.error {
            ui.colored_label(ui.visuals().error_fg_color, err);
        }
        ui.add_space(8.0);
        if let Some(grid) = self.grid.as_mut() {
            grid.show(ui, &[]);
        }
    }
}
