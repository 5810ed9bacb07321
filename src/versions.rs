use crate::api::ApiClient;
use crate::error::CleanerError;
use crate::model::{ProcessStatus, Version};
use egui::{Button, Color32};
use egui_extras::{Column, TableBuilder};
use std::path::Path;

pub const PAGE_SIZE: usize = 5;

/// Version history of one dataframe with a download action per row.
///
/// Only one download is tracked at a time: starting another replaces the spinner.
#[derive(Debug, Default)]
pub struct VersionTable {
    page: usize,
    downloading: Option<String>,
}

impl VersionTable {
    pub fn downloading(&self) -> Option<&str> {
        self.downloading.as_deref()
    }

    pub fn is_downloading(&self, version_id: &str) -> bool {
        self.downloading.as_deref() == Some(version_id)
    }

    pub fn begin_download(&mut self, version_id: &str) {
        self.downloading = Some(version_id.to_owned());
    }

    /// Clears the spinner if it still belongs to `version_id`.
    pub fn finish_download(&mut self, version_id: &str) {
        if self.is_downloading(version_id) {
            self.downloading = None;
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(total: usize) -> usize {
        total.div_ceil(PAGE_SIZE).max(1)
    }

    pub fn set_page(&mut self, page: usize, total: usize) {
        self.page = page.min(Self::page_count(total) - 1);
    }

    /// Draws the table and returns the version whose download button was clicked.
    pub fn show(&mut self, ui: &mut egui::Ui, versions: &[Version]) -> Option<String> {
        self.set_page(self.page, versions.len());
        let start = self.page * PAGE_SIZE;
        let rows = &versions[start.min(versions.len())..(start + PAGE_SIZE).min(versions.len())];
        let mut clicked = None;

        ui.push_id("version_table", |ui| {
            TableBuilder::new(ui)
                .column(Column::auto().at_least(80.0))
                .column(Column::auto().at_least(120.0))
                .column(Column::auto().at_least(100.0))
                .column(Column::remainder())
                .striped(true)
                .header(20.0, |mut header| {
                    for title in ["Version", "Operation type", "Processing status", "Actions"] {
                        header.col(|ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|body| {
                    body.rows(22.0, rows.len(), |mut row| {
                        let version = &rows[row.index()];
                        row.col(|ui| {
                            ui.label(version.version_id.as_str());
                        });
                        row.col(|ui| {
                            ui.label(version.operation.as_str());
                        });
                        row.col(|ui| {
                            let color = match version.status {
                                ProcessStatus::Processing => Color32::from_rgb(200, 150, 0),
                                ProcessStatus::Processed => Color32::from_rgb(0, 150, 70),
                                ProcessStatus::Failed => Color32::from_rgb(200, 40, 40),
                            };
                            ui.colored_label(color, version.status.as_str());
                        });
                        row.col(|ui| {
                            if self.is_downloading(&version.version_id) {
                                ui.spinner();
                            } else if ui
                                .add_enabled(
                                    version.status == ProcessStatus::Processed,
                                    Button::new("⬇"),
                                )
                                .on_hover_text("Download this version")
                                .clicked()
                            {
                                clicked = Some(version.version_id.clone());
                            }
                        });
                    });
                });
        });

        let pages = Self::page_count(versions.len());
        if pages > 1 {
            ui.horizontal(|ui| {
                if ui.add_enabled(self.page > 0, Button::new("◀")).clicked() {
                    self.page -= 1;
                }
                ui.label(format!("{} / {}", self.page + 1, pages));
                if ui.add_enabled(self.page + 1 < pages, Button::new("▶")).clicked() {
                    self.page += 1;
                }
            });
        }
        clicked
    }
}

/// Fetches a version's processed output and writes it to `path`. Returns the byte count.
pub async fn download_to(
    client: &ApiClient,
    dataframe_id: &str,
    version_id: &str,
    path: &Path,
) -> Result<usize, CleanerError> {
    let bytes = client.download(dataframe_id, version_id).await?;
    tokio::fs::write(path, &bytes).await?;
    log::info!(
        "saved version {version_id} of {dataframe_id} to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(bytes.len())
}

pub fn default_file_name(version_id: &str) -> String {
    format!("{version_id}.csv")
}
