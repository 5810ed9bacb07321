//! The dataframe cleaner page.
//!
//! One upload or column operation is one cycle: `Idle -> Uploading -> Polling ->
//! Ready | Failed`. Each cycle runs as a single background task that sends tagged
//! messages back to the page. Starting a cycle aborts the previous task, and messages
//! from older cycles are dropped when they arrive.

use crate::api::ApiClient;
use crate::error::CleanerError;
use crate::grid::{ColumnAction, DataGrid};
use crate::model::{
    ColumnOperation, DataFrameMeta, OperationKind, ProcessRequest, UploadAccepted,
    VersionPayload,
};
use crate::polling::{poll_until_settled, Settled, TaskSlot};
use crate::versions::{self, VersionTable};
use egui::{Button, Color32, RichText, TextEdit, Window};
use rfd::FileDialog;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const UPLOAD_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Polling,
    Ready,
    Failed,
}

impl Phase {
    pub fn is_loading(&self) -> bool {
        matches!(self, Phase::Uploading | Phase::Polling)
    }
}

#[derive(Debug)]
enum CycleEvent {
    Uploaded(UploadAccepted),
    ProcessAccepted,
    Status(DataFrameMeta),
    Settled(Settled),
    Failed(String),
}

#[derive(Debug)]
enum Message {
    Cycle { cycle: u64, event: CycleEvent },
    Download { version_id: String, result: Result<usize, String> },
}

/// Input dialog for operations that need a script or a fill value.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationDialog {
    pub column: String,
    pub kind: OperationKind,
    pub input: String,
}

impl OperationDialog {
    fn title(&self) -> String {
        match self.kind {
            OperationKind::ApplyScript => format!("Apply script to {}", self.column),
            _ => format!("Fill null value with {}", self.column),
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            OperationKind::ApplyScript => "Python Code",
            _ => "Value to fill",
        }
    }

    fn helper_text(&self) -> &'static str {
        match self.kind {
            OperationKind::ApplyScript => {
                "Input the Python function in Lambda format with 'x' as input, for example x+2"
            }
            _ => "Input the value to fill null value with, it should have the same type as the column",
        }
    }
}

pub struct CleanerPage {
    client: ApiClient,
    runtime: Handle,
    file: Option<PathBuf>,
    dataframe_id: Option<String>,
    meta: Option<DataFrameMeta>,
    payload: Option<VersionPayload>,
    grid: Option<DataGrid>,
    phase: Phase,
    banner: Option<String>,
    dialog: Option<OperationDialog>,
    versions: VersionTable,
    cycle: u64,
    task: TaskSlot,
    downloads: Vec<TaskSlot>,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
}

impl CleanerPage {
    pub fn new(client: ApiClient, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            runtime,
            file: None,
            dataframe_id: None,
            meta: None,
            payload: None,
            grid: None,
            phase: Phase::Idle,
            banner: None,
            dialog: None,
            versions: VersionTable::default(),
            cycle: 0,
            task: TaskSlot::default(),
            downloads: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn dataframe_id(&self) -> Option<&str> {
        self.dataframe_id.as_deref()
    }

    pub fn meta(&self) -> Option<&DataFrameMeta> {
        self.meta.as_ref()
    }

    pub fn payload(&self) -> Option<&VersionPayload> {
        self.payload.as_ref()
    }

    pub fn grid(&self) -> Option<&DataGrid> {
        self.grid.as_ref()
    }

    pub fn dialog(&self) -> Option<&OperationDialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut OperationDialog> {
        self.dialog.as_mut()
    }

    pub fn versions(&self) -> &VersionTable {
        &self.versions
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_loading() || self.downloads.iter().any(TaskSlot::is_running)
    }

    pub fn select_file(&mut self, path: PathBuf) {
        self.file = Some(path);
    }

    fn poll_interval(&self) -> Duration {
        self.client.config().poll_interval()
    }

    fn next_cycle(&mut self, phase: Phase) -> u64 {
        self.cycle += 1;
        self.phase = phase;
        self.cycle
    }

    /// Uploads the selected file and polls the new dataframe until it settles.
    /// Does nothing when no file is selected.
    pub fn upload(&mut self) {
        let Some(path) = self.file.clone() else {
            return;
        };
        self.dataframe_id = None;
        self.banner = None;
        let cycle = self.next_cycle(Phase::Uploading);
        let client = self.client.clone();
        let tx = self.tx.clone();
        let every = self.poll_interval();
        log::info!("cycle {cycle}: uploading {}", path.display());

        self.task.spawn(&self.runtime, async move {
            let accepted = match client.upload(&path).await {
                Ok(accepted) => accepted,
                Err(err) => {
                    log::error!("Error uploading file: {err}");
                    send(&tx, cycle, CycleEvent::Failed(err.to_string()));
                    return;
                }
            };
            let dataframe_id = accepted.dataframe_id.clone();
            send(&tx, cycle, CycleEvent::Uploaded(accepted));
            poll_and_report(&client, &dataframe_id, every, cycle, &tx).await;
        });
    }

    /// Requests `operation` on `column` of the displayed version, then polls the
    /// dataframe until the new version settles.
    pub fn dispatch(&mut self, column: &str, operation: ColumnOperation) -> Result<(), CleanerError> {
        let payload = self.payload.as_ref().ok_or(CleanerError::NoVersionLoaded)?;
        let request = ProcessRequest {
            version_id: payload.version_id.clone(),
            column: column.to_owned(),
            operation,
        };
        let target = payload.dataframe_id.clone();
        // The new version's id is unknown until the backend reports it, so polling
        // follows the dataframe.
        let dataframe_id = self
            .dataframe_id
            .clone()
            .unwrap_or_else(|| target.clone());

        self.banner = None;
        let cycle = self.next_cycle(Phase::Uploading);
        let client = self.client.clone();
        let tx = self.tx.clone();
        let every = self.poll_interval();
        log::info!(
            "cycle {cycle}: {} on column {} of version {}",
            request.operation.kind(),
            request.column,
            request.version_id
        );

        self.task.spawn(&self.runtime, async move {
            if let Err(err) = client.process(&target, &request).await {
                log::error!("Error processing DataFrame: {err}");
                send(&tx, cycle, CycleEvent::Failed(err.to_string()));
                return;
            }
            send(&tx, cycle, CycleEvent::ProcessAccepted);
            poll_and_report(&client, &dataframe_id, every, cycle, &tx).await;
        });
        Ok(())
    }

    /// Handles an entry picked from a column's menu. Operations that need input open the
    /// dialog; the rest are dispatched right away.
    pub fn column_action(&mut self, action: ColumnAction) {
        if action.kind.needs_input() {
            self.dialog = Some(OperationDialog {
                column: action.column,
                kind: action.kind,
                input: String::new(),
            });
            return;
        }
        match ColumnOperation::from_kind(action.kind, None) {
            Some(operation) => {
                if let Err(err) = self.dispatch(&action.column, operation) {
                    log::error!("cannot dispatch {}: {err}", action.kind);
                    self.banner = Some(err.to_string());
                }
            }
            None => log::warn!("{} is not a column operation", action.kind),
        }
    }

    /// Submits the dialog. Returns false, keeping the dialog open, while the input is empty.
    pub fn submit_dialog(&mut self) -> bool {
        let Some(dialog) = self.dialog.as_ref() else {
            return false;
        };
        if dialog.input.is_empty() {
            return false;
        }
        let Some(dialog) = self.dialog.take() else {
            return false;
        };
        if let Some(operation) = ColumnOperation::from_kind(dialog.kind, Some(dialog.input)) {
            if let Err(err) = self.dispatch(&dialog.column, operation) {
                log::error!("cannot dispatch {}: {err}", dialog.kind);
                self.banner = Some(err.to_string());
            }
        }
        true
    }

    pub fn cancel_dialog(&mut self) {
        self.dialog = None;
    }

    /// Downloads `version_id` of the dataframe shown in the version table into `path`.
    pub fn download(&mut self, version_id: &str, path: PathBuf) {
        let Some(dataframe_id) = self.meta.as_ref().map(|m| m.dataframe_id.clone()) else {
            log::warn!("cannot download version {version_id}: no dataframe is shown");
            return;
        };
        self.versions.begin_download(version_id);
        let client = self.client.clone();
        let tx = self.tx.clone();
        let version_id = version_id.to_owned();

        let mut slot = TaskSlot::default();
        slot.spawn(&self.runtime, async move {
            let result = versions::download_to(&client, &dataframe_id, &version_id, &path)
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(Message::Download { version_id, result });
        });
        self.downloads.retain(TaskSlot::is_running);
        self.downloads.push(slot);
    }

    /// Applies every message that arrived since the last call.
    pub fn pump(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle(message);
        }
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Cycle { cycle, event } if cycle != self.cycle => {
                log::trace!("dropping {event:?} from stale cycle {cycle}");
            }
            Message::Cycle { event, .. } => self.apply(event),
            Message::Download { version_id, result } => {
                self.versions.finish_download(&version_id);
                if let Err(err) = result {
                    log::error!("Error downloading version {version_id}: {err}");
                }
            }
        }
    }

    fn apply(&mut self, event: CycleEvent) {
        match event {
            CycleEvent::Uploaded(accepted) => {
                self.dataframe_id = Some(accepted.dataframe_id);
                self.phase = Phase::Polling;
            }
            CycleEvent::ProcessAccepted => {
                self.phase = Phase::Polling;
            }
            CycleEvent::Status(meta) => {
                self.meta = Some(meta);
            }
            CycleEvent::Settled(Settled::Loaded(payload)) => match DataGrid::typed(&payload.data) {
                Ok(grid) => {
                    self.grid = Some(grid);
                    self.payload = Some(payload);
                    self.phase = Phase::Ready;
                }
                Err(err) => {
                    log::error!("cannot display version {}: {err}", payload.version_id);
                    self.banner = Some(err.to_string());
                    self.phase = Phase::Failed;
                }
            },
            CycleEvent::Settled(Settled::Failed(message)) => {
                let err = CleanerError::ProcessingFailed(message);
                log::warn!("cycle {}: {err}", self.cycle);
                self.banner = Some(err.to_string());
                self.phase = Phase::Failed;
            }
            CycleEvent::Failed(message) => {
                self.banner = Some(message);
                self.phase = Phase::Failed;
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.pump();

        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.heading("Dataframe Cleaner");
                ui.label(RichText::new("Upload CSV or Excel File").strong());
                ui.horizontal(|ui| {
                    if ui.button("Choose file…").clicked() {
                        if let Some(path) = FileDialog::new()
                            .add_filter("Tabular data", &UPLOAD_EXTENSIONS)
                            .pick_file()
                        {
                            self.select_file(path);
                        }
                    }
                    let name = self
                        .file
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "No file selected".to_owned());
                    ui.label(name);
                });
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(self.file.is_some(), Button::new("Upload"))
                        .clicked()
                    {
                        self.upload();
                    }
                    if self.phase.is_loading() {
                        ui.spinner();
                    }
                });
            });
            ui.add_space(20.0);
            ui.vertical(|ui| {
                let versions = self
                    .meta
                    .as_ref()
                    .map(|m| m.versions.clone())
                    .unwrap_or_default();
                if let Some(version_id) = self.versions.show(ui, &versions) {
                    if let Some(path) = FileDialog::new()
                        .set_file_name(versions::default_file_name(&version_id))
                        .save_file()
                    {
                        self.download(&version_id, path);
                    }
                }
            });
        });

        if let Some(message) = self.banner.clone() {
            ui.add_space(8.0);
            egui::Frame::none()
                .fill(Color32::from_rgb(255, 244, 229))
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(Color32::from_rgb(102, 60, 0), format!("⚠ {message}"));
                        if ui.small_button("✖").clicked() {
                            self.dismiss_banner();
                        }
                    });
                });
        }

        self.show_dialog(ui.ctx());

        ui.add_space(8.0);
        if let Some(payload) = &self.payload {
            if payload.is_truncated() {
                ui.colored_label(
                    Color32::from_rgb(180, 110, 0),
                    format!(
                        "The table does not display the whole data ({} rows) because it reached the maximum display size ({} rows). To get all processed data, please download as csv.",
                        payload.actual_size, payload.limit_size
                    ),
                );
            }
        }
        let action = self
            .grid
            .as_mut()
            .and_then(|grid| grid.show(ui, &OperationKind::MENU));
        if let Some(action) = action {
            self.column_action(action);
        }
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };
        let mut open = true;
        let mut submit = false;
        let mut cancel = false;
        Window::new(dialog.title())
            .id(egui::Id::new("operation_dialog"))
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(640.0)
            .show(ctx, |ui| {
                ui.label(dialog.label());
                ui.add(
                    TextEdit::multiline(&mut dialog.input)
                        .desired_rows(10)
                        .desired_width(f32::INFINITY)
                        .code_editor(),
                );
                ui.small(dialog.helper_text());
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                    if ui
                        .add_enabled(!dialog.input.is_empty(), Button::new("Submit"))
                        .clicked()
                    {
                        submit = true;
                    }
                });
            });
        if submit {
            self.submit_dialog();
        } else if cancel || !open {
            self.cancel_dialog();
        }
    }
}

fn send(tx: &UnboundedSender<Message>, cycle: u64, event: CycleEvent) {
    // The page may already be gone, in which case nobody is listening.
    let _ = tx.send(Message::Cycle { cycle, event });
}

async fn poll_and_report(
    client: &ApiClient,
    dataframe_id: &str,
    every: Duration,
    cycle: u64,
    tx: &UnboundedSender<Message>,
) {
    let result = poll_until_settled(client, dataframe_id, every, |meta| {
        send(tx, cycle, CycleEvent::Status(meta));
    })
    .await;
    match result {
        Ok(settled) => send(tx, cycle, CycleEvent::Settled(settled)),
        Err(err) => {
            log::error!("Error fetching dataframe {dataframe_id}: {err}");
            send(tx, cycle, CycleEvent::Failed(err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, MIN_POLL_INTERVAL_MS};
    use crate::model::ProcessStatus;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;
    use tokio::time;

    fn page_for(server: &mockito::Server) -> CleanerPage {
        let client = ApiClient::new(ClientConfig {
            api_url: server.url(),
            poll_interval_ms: MIN_POLL_INTERVAL_MS,
            ..ClientConfig::default()
        })
        .unwrap();
        CleanerPage::new(client, Handle::current())
    }

    fn two_row_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,age\nJohn,30\nJane,25").unwrap();
        file
    }

    async fn settle(page: &mut CleanerPage) {
        for _ in 0..300 {
            page.pump();
            if !page.phase().is_loading() {
                return;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        panic!("page did not settle, phase {:?}", page.phase());
    }

    async fn mock_processed_dataframe(server: &mut mockito::Server) -> (mockito::Mock, mockito::Mock) {
        let status = server
            .mock("GET", "/api/dataframes/df-1/")
            .with_body(
                json!({
                    "dataframe_id": "df-1",
                    "versions": [{"version_id": "V1", "operation": "initialize", "script": null, "column": null, "status": "processed"}]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let data = server
            .mock("GET", "/api/dataframes/df-1/versions/V1")
            .with_body(
                json!({
                    "dataframe_id": "df-1",
                    "version_id": "V1",
                    "previous_version_id": null,
                    "actual_size": 2,
                    "limit_size": 2,
                    "data": {
                        "data": [{"name": "John", "age": 30}, {"name": "Jane", "age": 25}],
                        "schema": {"fields": [{"name": "name", "type": "string"}, {"name": "age", "type": "integer"}]}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        (status, data)
    }

    #[tokio::test]
    async fn test_upload_two_row_csv_until_ready() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/api/dataframes-async/")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_string()),
            )
            .with_status(201)
            .with_body(r#"{"dataframe_id": "df-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let (_status, _data) = mock_processed_dataframe(&mut server).await;

        let file = two_row_csv();
        let mut page = page_for(&server);
        page.select_file(file.path().to_path_buf());
        page.upload();
        assert_eq!(page.phase(), Phase::Uploading);
        settle(&mut page).await;

        assert_eq!(page.phase(), Phase::Ready);
        assert_eq!(page.dataframe_id(), Some("df-1"));
        let meta = page.meta().unwrap();
        assert_eq!(meta.versions.len(), 1);
        assert_eq!(meta.versions[0].status, ProcessStatus::Processed);
        assert_eq!(page.grid().unwrap().rendered_row_count(), 3);
        assert!(page.banner().is_none());
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_without_file_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/api/dataframes-async/")
            .expect(0)
            .create_async()
            .await;
        let mut page = page_for(&server);
        page.upload();
        assert_eq!(page.phase(), Phase::Idle);
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_version_shows_banner_without_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/api/dataframes-async/")
            .with_status(201)
            .with_body(r#"{"dataframe_id": "df-1"}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/api/dataframes/df-1/")
            .with_body(
                json!({
                    "dataframe_id": "df-1",
                    "versions": [{"version_id": "V1", "operation": "initialize", "script": null, "column": null, "status": "failed"}]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let data = server
            .mock("GET", Matcher::Regex("^/api/dataframes/df-1/versions/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let file = two_row_csv();
        let mut page = page_for(&server);
        page.select_file(file.path().to_path_buf());
        page.upload();
        settle(&mut page).await;

        assert_eq!(page.phase(), Phase::Failed);
        assert_eq!(
            page.banner(),
            Some("failed to process operation initialize with script null on column null")
        );
        assert!(page.grid().is_none());
        time::sleep(Duration::from_millis(50)).await;
        status.assert_async().await;
        data.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_error_clears_loading() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/api/dataframes-async/")
            .with_status(400)
            .with_body(r#"{"message": "Unsupported file type"}"#)
            .create_async()
            .await;

        let file = two_row_csv();
        let mut page = page_for(&server);
        page.select_file(file.path().to_path_buf());
        page.upload();
        settle(&mut page).await;

        assert_eq!(page.phase(), Phase::Failed);
        assert!(!page.is_busy());
        assert_eq!(
            page.banner(),
            Some("Error code 400 with message Unsupported file type")
        );
        page.dismiss_banner();
        assert!(page.banner().is_none());
    }

    #[tokio::test]
    async fn test_cast_dispatch_posts_current_version() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/api/dataframes-async/")
            .with_status(201)
            .with_body(r#"{"dataframe_id": "df-1"}"#)
            .create_async()
            .await;
        let (_status, _data) = mock_processed_dataframe(&mut server).await;
        let process = server
            .mock("POST", "/api/dataframes/df-1/process-async/")
            .match_body(Matcher::Json(json!({
                "version_id": "V1",
                "column": "age",
                "operation": {"type": "cast_to_numeric", "script": null, "to_fill": null}
            })))
            .with_status(202)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let file = two_row_csv();
        let mut page = page_for(&server);
        page.select_file(file.path().to_path_buf());
        page.upload();
        settle(&mut page).await;
        assert_eq!(page.payload().unwrap().version_id, "V1");

        page.column_action(ColumnAction {
            column: "age".to_owned(),
            kind: OperationKind::CastToNumeric,
        });
        assert_eq!(page.phase(), Phase::Uploading);
        settle(&mut page).await;

        assert_eq!(page.phase(), Phase::Ready);
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_script_dialog_requires_input() {
        let mut server = mockito::Server::new_async().await;
        let process = server
            .mock("POST", "/api/dataframes/df-1/process-async/")
            .match_body(Matcher::Json(json!({
                "version_id": "V1",
                "column": "age",
                "operation": {"type": "apply_script", "script": "x+2", "to_fill": null}
            })))
            .with_status(202)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let (_status, _data) = mock_processed_dataframe(&mut server).await;

        let mut page = page_for(&server);
        page.dataframe_id = Some("df-1".to_owned());
        page.payload = Some(
            serde_json::from_value(json!({
                "dataframe_id": "df-1",
                "version_id": "V1",
                "actual_size": 0,
                "limit_size": 0,
                "data": {"data": [], "schema": {"fields": []}}
            }))
            .unwrap(),
        );

        page.column_action(ColumnAction {
            column: "age".to_owned(),
            kind: OperationKind::ApplyScript,
        });
        assert_eq!(page.phase(), Phase::Idle);
        assert!(!page.submit_dialog());
        assert!(page.dialog().is_some());

        page.dialog_mut().unwrap().input = "x+2".to_owned();
        assert!(page.submit_dialog());
        assert!(page.dialog().is_none());
        settle(&mut page).await;
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_dispatch_without_version_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let process = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let mut page = page_for(&server);
        assert!(matches!(
            page.dispatch("age", ColumnOperation::CastToString),
            Err(CleanerError::NoVersionLoaded)
        ));
        assert_eq!(page.phase(), Phase::Idle);
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_after_failed_reupload_uses_shown_dataframe() {
        let mut server = mockito::Server::new_async().await;
        let first_upload = server
            .mock("POST", "/api/dataframes-async/")
            .with_status(201)
            .with_body(r#"{"dataframe_id": "df-1"}"#)
            .create_async()
            .await;
        let (_status, _data) = mock_processed_dataframe(&mut server).await;
        let download = server
            .mock("GET", "/api/rest/dataframes/df-1/download/V1")
            .with_body("name,age\nJohn,30\nJane,25\n")
            .expect(1)
            .create_async()
            .await;

        let file = two_row_csv();
        let mut page = page_for(&server);
        page.select_file(file.path().to_path_buf());
        page.upload();
        settle(&mut page).await;
        assert_eq!(page.phase(), Phase::Ready);

        first_upload.remove_async().await;
        let _rejected = server
            .mock("POST", "/api/dataframes-async/")
            .with_status(400)
            .with_body(r#"{"message": "Unsupported file type"}"#)
            .create_async()
            .await;
        page.upload();
        settle(&mut page).await;
        assert_eq!(page.phase(), Phase::Failed);
        assert_eq!(page.dataframe_id(), None);
        assert_eq!(page.meta().unwrap().dataframe_id, "df-1");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(versions::default_file_name("V1"));
        page.download("V1", path.clone());
        assert_eq!(page.versions().downloading(), Some("V1"));
        for _ in 0..300 {
            page.pump();
            if page.versions().downloading().is_none() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(page.versions().downloading(), None);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name,age\nJohn,30\nJane,25\n"
        );
        download.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_without_shown_dataframe_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let mut page = page_for(&server);
        let dir = tempfile::tempdir().unwrap();
        page.download("V1", dir.path().join("V1.csv"));
        assert_eq!(page.versions().downloading(), None);
        assert!(!page.is_busy());
        download.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_cycle_messages_are_ignored() {
        let server = mockito::Server::new_async().await;
        let mut page = page_for(&server);
        page.cycle = 2;
        page.handle(Message::Cycle {
            cycle: 1,
            event: CycleEvent::Failed("late".to_owned()),
        });
        assert!(page.banner().is_none());

        page.handle(Message::Cycle {
            cycle: 2,
            event: CycleEvent::Failed("current".to_owned()),
        });
        assert_eq!(page.banner(), Some("current"));
    }
}
