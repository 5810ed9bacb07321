//! Paginated, sortable and filterable table over a backend payload.
//!
//! The payload rows are converted once into a polars `DataFrame`. The displayed view is
//! derived from it and only recomputed when the sort or the filter changes.

use crate::error::CleanerError;
use crate::filter::{DataFrameFilter, FilterOps};
use crate::model::{OperationKind, TableData};
use egui::{Button, ComboBox, TextEdit};
use egui_extras::{Column, TableBuilder};
use polars::prelude::*;
use rfd::FileDialog;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];
pub const EXPORT_FILE_NAME: &str = "processed-dataframe.csv";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExportScope {
    /// Every row of the filtered and sorted view.
    AllRows,
    /// Only the rows on the current page.
    PageRows,
}

/// An operation picked from a column header's menu.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnAction {
    pub column: String,
    pub kind: OperationKind,
}

#[derive(Clone, Debug, PartialEq)]
struct GridColumn {
    name: String,
    header: String,
}

#[derive(Clone, Debug)]
pub struct DataGrid {
    data: DataFrame,
    view: DataFrame,
    columns: Vec<GridColumn>,
    sort: Option<(String, SortOrder)>,
    filter: DataFrameFilter,
    page: usize,
    page_size: usize,
}

/// Converts payload rows into a `DataFrame`, typing each column by its declared schema type.
pub fn to_dataframe(table: &TableData) -> PolarsResult<DataFrame> {
    let series = table
        .schema
        .fields
        .iter()
        .map(|field| {
            let name = field.name.as_str();
            let values = table.data.iter().map(|row| row.get(name));
            match field.field_type.as_str() {
                "integer" => Series::new(
                    name,
                    values.map(|v| v.and_then(Value::as_i64)).collect::<Vec<_>>(),
                ),
                "number" => Series::new(
                    name,
                    values.map(|v| v.and_then(Value::as_f64)).collect::<Vec<_>>(),
                ),
                "boolean" => Series::new(
                    name,
                    values.map(|v| v.and_then(Value::as_bool)).collect::<Vec<_>>(),
                ),
                _ => Series::new(name, values.map(text_value).collect::<Vec<_>>()),
            }
        })
        .collect::<Vec<_>>();
    DataFrame::new(series)
}

fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Text shown in a cell. Booleans are spelled out and nulls are blank.
pub fn cell_text(value: &AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Boolean(b) => b.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{other}"),
    }
}

impl DataGrid {
    /// Builds a grid whose headers read `name[type]`.
    pub fn typed(table: &TableData) -> Result<Self, CleanerError> {
        Self::build(table, true)
    }

    /// Builds a grid whose headers are the bare field names.
    pub fn plain(table: &TableData) -> Result<Self, CleanerError> {
        Self::build(table, false)
    }

    fn build(table: &TableData, typed_headers: bool) -> Result<Self, CleanerError> {
        let data = to_dataframe(table)?;
        let columns = table
            .schema
            .fields
            .iter()
            .map(|field| GridColumn {
                name: field.name.clone(),
                header: if typed_headers {
                    field.typed_label()
                } else {
                    field.name.clone()
                },
            })
            .collect();
        Ok(Self {
            view: data.clone(),
            data,
            columns,
            sort: None,
            filter: DataFrameFilter::default(),
            page: 0,
            page_size: PAGE_SIZES[0],
        })
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn view_height(&self) -> usize {
        self.view.height()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(name, order)| (name.as_str(), *order))
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.view.height().div_ceil(self.page_size).max(1)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 0;
    }

    /// Rows of the current page.
    pub fn page_rows(&self) -> DataFrame {
        let offset = self.page * self.page_size;
        self.view.slice(offset as i64, self.page_size)
    }

    /// Number of table rows drawn for the current page: one header row plus the data rows.
    pub fn rendered_row_count(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            1 + self.page_rows().height()
        }
    }

    /// Cycles the sort on `column`: ascending, descending, then unsorted.
    pub fn toggle_sort(&mut self, column: &str) {
        let next = match &self.sort {
            Some((name, SortOrder::Ascending)) if name == column => {
                Some((column.to_owned(), SortOrder::Descending))
            }
            Some((name, SortOrder::Descending)) if name == column => None,
            _ => Some((column.to_owned(), SortOrder::Ascending)),
        };
        let previous = std::mem::replace(&mut self.sort, next);
        if let Err(err) = self.refresh_view() {
            log::warn!("could not sort by {column}: {err}");
            self.sort = previous;
        }
    }

    /// Applies the filter form. On failure the previous filter and view are kept.
    pub fn apply_filter(&mut self) -> Result<(), CleanerError> {
        let previous = self.filter.applied.clone();
        if !self.filter.apply() {
            return Ok(());
        }
        self.refresh_view().map_err(|err| {
            log::warn!("could not apply filter: {err}");
            self.filter.applied = previous;
            err
        })
    }

    pub fn clear_filter(&mut self) {
        let previous = self.filter.applied.clone();
        self.filter.clear();
        if let Err(err) = self.refresh_view() {
            log::warn!("could not clear filter: {err}");
            self.filter.applied = previous;
        }
    }

    pub fn filter_mut(&mut self) -> &mut DataFrameFilter {
        &mut self.filter
    }

    fn refresh_view(&mut self) -> Result<(), CleanerError> {
        let mut lazy = self.data.clone().lazy();
        if let Some(applied) = &self.filter.applied {
            lazy = lazy.filter(applied.expr());
        }
        if let Some((name, order)) = &self.sort {
            lazy = lazy.sort(
                [name.as_str()],
                SortMultipleOptions::default()
                    .with_order_descending(*order == SortOrder::Descending),
            );
        }
        self.view = lazy.collect()?;
        self.page = self.page.min(self.page_count() - 1);
        Ok(())
    }

    /// Writes the selected rows as comma separated values with a header row.
    pub fn write_csv<W: Write>(&self, scope: ExportScope, writer: W) -> Result<usize, CleanerError> {
        let mut rows = match scope {
            ExportScope::AllRows => self.view.clone(),
            ExportScope::PageRows => self.page_rows(),
        };
        CsvWriter::new(writer)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut rows)?;
        Ok(rows.height())
    }

    pub fn export_csv(&self, scope: ExportScope, path: &Path) -> Result<usize, CleanerError> {
        let file = std::fs::File::create(path)?;
        let written = self.write_csv(scope, file)?;
        log::info!("exported {written} rows to {}", path.display());
        Ok(written)
    }

    fn export_with_dialog(&self, scope: ExportScope) {
        if let Some(path) = FileDialog::new()
            .set_file_name(EXPORT_FILE_NAME)
            .add_filter("CSV", &["csv"])
            .save_file()
        {
            if let Err(err) = self.export_csv(scope, &path) {
                log::error!("export to {} failed: {err}", path.display());
            }
        }
    }

    /// Draws the grid. Column headers sort on click; when `column_actions` is not empty
    /// they also open a menu on right click, and the picked entry is returned.
    pub fn show(&mut self, ui: &mut egui::Ui, column_actions: &[OperationKind]) -> Option<ColumnAction> {
        self.show_toolbar(ui);
        ui.separator();

        let page = self.page_rows();
        let offset = self.page * self.page_size;
        let mut action = None;
        let mut sort_clicked = None;

        egui::ScrollArea::horizontal()
            .id_source("grid_scroll")
            .show(ui, |ui| {
                TableBuilder::new(ui)
                    .column(Column::auto())
                    .columns(Column::auto().clip(true), self.columns.len())
                    .striped(true)
                    .resizable(true)
                    .max_scroll_height(480.0)
                    .header(20.0, |mut header| {
                        header.col(|ui| {
                            ui.label("Row");
                        });
                        for column in &self.columns {
                            header.col(|ui| {
                                let marker = match &self.sort {
                                    Some((name, SortOrder::Ascending)) if *name == column.name => " ⏶",
                                    Some((name, SortOrder::Descending)) if *name == column.name => " ⏷",
                                    _ => "",
                                };
                                let response = ui.button(format!("{}{}", column.header, marker));
                                if response.clicked() {
                                    sort_clicked = Some(column.name.clone());
                                }
                                if !column_actions.is_empty() {
                                    response.context_menu(|ui| {
                                        for kind in column_actions {
                                            if ui.button(kind.label()).clicked() {
                                                action = Some(ColumnAction {
                                                    column: column.name.clone(),
                                                    kind: *kind,
                                                });
                                                ui.close_menu();
                                            }
                                        }
                                    });
                                }
                            });
                        }
                    })
                    .body(|body| {
                        body.rows(18.0, page.height(), |mut row| {
                            let row_index = row.index();
                            row.col(|ui| {
                                ui.label(format!("{}", offset + row_index));
                            });
                            for series in page.get_columns() {
                                row.col(|ui| {
                                    if let Ok(value) = series.get(row_index) {
                                        ui.label(cell_text(&value));
                                    }
                                });
                            }
                        });
                    });
            });

        if let Some(name) = sort_clicked {
            self.toggle_sort(&name);
        }
        self.show_pager(ui);
        action
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.view.height() > 0, Button::new("⬇ Export All Rows"))
                .clicked()
            {
                self.export_with_dialog(ExportScope::AllRows);
            }
            if ui
                .add_enabled(self.page_rows().height() > 0, Button::new("⬇ Export Page Rows"))
                .clicked()
            {
                self.export_with_dialog(ExportScope::PageRows);
            }
            ui.separator();

            let columns: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
            let filter = &mut self.filter;
            ComboBox::new("grid_filter_column", "")
                .selected_text(filter.column.as_str())
                .show_ui(ui, |ui| {
                    for name in &columns {
                        ui.selectable_value(&mut filter.column, name.to_owned(), name.as_str());
                    }
                });
            ComboBox::new("grid_filter_op", "")
                .selected_text(filter.operation.label())
                .show_ui(ui, |ui| {
                    for op in FilterOps::ALL {
                        ui.selectable_value(&mut filter.operation, op, op.label());
                    }
                });
            if filter.operation.takes_value() {
                ui.add(TextEdit::singleline(&mut filter.value).desired_width(100.0));
            }
            if ui.button("Filter").clicked() {
                let _ = self.apply_filter();
            }
            if ui
                .add_enabled(self.filter.applied.is_some(), Button::new("Clear"))
                .clicked()
            {
                self.clear_filter();
            }
        });
    }

    fn show_pager(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let mut page_size = self.page_size;
            ComboBox::new("grid_page_size", "rows per page")
                .selected_text(page_size.to_string())
                .show_ui(ui, |ui| {
                    for size in PAGE_SIZES {
                        ui.selectable_value(&mut page_size, size, size.to_string());
                    }
                });
            if page_size != self.page_size {
                self.set_page_size(page_size);
            }

            let last = self.page_count() - 1;
            if ui.add_enabled(self.page > 0, Button::new("⏮")).clicked() {
                self.set_page(0);
            }
            if ui.add_enabled(self.page > 0, Button::new("◀")).clicked() {
                self.set_page(self.page - 1);
            }
            ui.label(format!("Page {} of {}", self.page + 1, last + 1));
            if ui.add_enabled(self.page < last, Button::new("▶")).clicked() {
                self.set_page(self.page + 1);
            }
            if ui.add_enabled(self.page < last, Button::new("⏭")).clicked() {
                self.set_page(last);
            }
            ui.label(format!("{} of {} rows", self.view.height(), self.data.height()));
        });
    }
}
