//! Wire types exchanged with the dataframe backend.
//!
//! A dataframe is an opaque id with a linear chain of versions. Every upload or column
//! operation appends a version, and the backend processes it asynchronously.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// One data row, keyed by field name in schema order.
pub type Row = Map<String, Value>;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Processing,
    Processed,
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Processing => "processing",
            ProcessStatus::Processed => "processed",
            ProcessStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Initialize,
    ApplyScript,
    FillNull,
    CastToNumeric,
    CastToString,
    CastToDatetime,
    CastToTimedelta,
    CastToBoolean,
    CastToCategory,
}

impl OperationKind {
    /// Operations offered in a column's actions menu, in menu order.
    pub const MENU: [OperationKind; 8] = [
        OperationKind::CastToNumeric,
        OperationKind::CastToString,
        OperationKind::CastToDatetime,
        OperationKind::CastToTimedelta,
        OperationKind::CastToBoolean,
        OperationKind::CastToCategory,
        OperationKind::ApplyScript,
        OperationKind::FillNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Initialize => "initialize",
            OperationKind::ApplyScript => "apply_script",
            OperationKind::FillNull => "fill_null",
            OperationKind::CastToNumeric => "cast_to_numeric",
            OperationKind::CastToString => "cast_to_string",
            OperationKind::CastToDatetime => "cast_to_datetime",
            OperationKind::CastToTimedelta => "cast_to_timedelta",
            OperationKind::CastToBoolean => "cast_to_boolean",
            OperationKind::CastToCategory => "cast_to_category",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Initialize => "Initialize",
            OperationKind::ApplyScript => "Apply function",
            OperationKind::FillNull => "Fill null value",
            OperationKind::CastToNumeric => "Cast to Numeric",
            OperationKind::CastToString => "Cast to String",
            OperationKind::CastToDatetime => "Cast to Datetime",
            OperationKind::CastToTimedelta => "Cast to Timedelta",
            OperationKind::CastToBoolean => "Cast to Boolean",
            OperationKind::CastToCategory => "Cast to Category",
        }
    }

    /// Whether the operation needs text input (a script or a fill value) from the user.
    pub fn needs_input(&self) -> bool {
        matches!(self, OperationKind::ApplyScript | OperationKind::FillNull)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column transformation request. Only `ApplyScript` and `FillNull` carry a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnOperation {
    ApplyScript { script: String },
    FillNull { value: String },
    CastToNumeric,
    CastToString,
    CastToDatetime,
    CastToTimedelta,
    CastToBoolean,
    CastToCategory,
}

impl ColumnOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ColumnOperation::ApplyScript { .. } => OperationKind::ApplyScript,
            ColumnOperation::FillNull { .. } => OperationKind::FillNull,
            ColumnOperation::CastToNumeric => OperationKind::CastToNumeric,
            ColumnOperation::CastToString => OperationKind::CastToString,
            ColumnOperation::CastToDatetime => OperationKind::CastToDatetime,
            ColumnOperation::CastToTimedelta => OperationKind::CastToTimedelta,
            ColumnOperation::CastToBoolean => OperationKind::CastToBoolean,
            ColumnOperation::CastToCategory => OperationKind::CastToCategory,
        }
    }

    /// Builds the operation for `kind`. `input` is used only by kinds that need it, and
    /// `None` is returned when such a kind gets no input or when `kind` is not a
    /// user-requestable operation.
    pub fn from_kind(kind: OperationKind, input: Option<String>) -> Option<Self> {
        match kind {
            OperationKind::ApplyScript => input.map(|script| ColumnOperation::ApplyScript { script }),
            OperationKind::FillNull => input.map(|value| ColumnOperation::FillNull { value }),
            OperationKind::CastToNumeric => Some(ColumnOperation::CastToNumeric),
            OperationKind::CastToString => Some(ColumnOperation::CastToString),
            OperationKind::CastToDatetime => Some(ColumnOperation::CastToDatetime),
            OperationKind::CastToTimedelta => Some(ColumnOperation::CastToTimedelta),
            OperationKind::CastToBoolean => Some(ColumnOperation::CastToBoolean),
            OperationKind::CastToCategory => Some(ColumnOperation::CastToCategory),
            OperationKind::Initialize => None,
        }
    }
}

#[derive(Serialize)]
struct OperationBody<'a> {
    #[serde(rename = "type")]
    kind: OperationKind,
    script: Option<&'a str>,
    to_fill: Option<&'a str>,
}

impl Serialize for ColumnOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (script, to_fill) = match self {
            ColumnOperation::ApplyScript { script } => (Some(script.as_str()), None),
            ColumnOperation::FillNull { value } => (None, Some(value.as_str())),
            _ => (None, None),
        };
        OperationBody {
            kind: self.kind(),
            script,
            to_fill,
        }
        .serialize(serializer)
    }
}

/// Body of `POST /api/dataframes/{id}/process-async/`.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ProcessRequest {
    pub version_id: String,
    pub column: String,
    pub operation: ColumnOperation,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Version {
    #[serde(deserialize_with = "id_string")]
    pub version_id: String,
    pub operation: OperationKind,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    pub status: ProcessStatus,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub previous_version_id: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DataFrameMeta {
    #[serde(deserialize_with = "id_string")]
    pub dataframe_id: String,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl DataFrameMeta {
    pub fn is_processing(&self) -> bool {
        self.versions
            .iter()
            .any(|v| v.status == ProcessStatus::Processing)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct UploadAccepted {
    #[serde(deserialize_with = "id_string")]
    pub dataframe_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Constraints {
    #[serde(rename = "enum", default)]
    pub allowed: Option<Vec<Value>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub constraints: Option<Constraints>,
}

impl SchemaField {
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_owned(),
            field_type: field_type.to_owned(),
            constraints: None,
        }
    }

    pub fn display_type(&self) -> &str {
        match self.field_type.as_str() {
            "string" => "text",
            "datetime" => "date",
            _ if self
                .constraints
                .as_ref()
                .is_some_and(|c| c.allowed.is_some()) =>
            {
                "category"
            }
            other => other,
        }
    }

    /// Header text, e.g. `age[integer]`.
    pub fn typed_label(&self) -> String {
        format!("{}[{}]", self.name, self.display_type())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct TableData {
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub schema: Schema,
}

impl TableData {
    /// Builds a table from a column-oriented object, where each column is either an array
    /// or an `{index: value}` object. Field types are inferred from the values.
    pub fn from_columns(columns: &Map<String, Value>) -> Self {
        let cells: Vec<(&String, Vec<&Value>)> = columns
            .iter()
            .map(|(name, values)| {
                let values = match values {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(by_index) => by_index.values().collect(),
                    scalar => vec![scalar],
                };
                (name, values)
            })
            .collect();
        let height = cells.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

        let fields = cells
            .iter()
            .map(|(name, values)| SchemaField::new(name, infer_type(values)))
            .collect();
        let data = (0..height)
            .map(|i| {
                cells
                    .iter()
                    .map(|(name, values)| {
                        let value = values.get(i).copied().cloned().unwrap_or(Value::Null);
                        ((*name).clone(), value)
                    })
                    .collect()
            })
            .collect();

        Self {
            data,
            schema: Schema { fields },
        }
    }
}

fn infer_type(values: &[&Value]) -> &'static str {
    let present: Vec<&&Value> = values.iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        "string"
    } else if present.iter().all(|v| v.is_i64() || v.is_u64()) {
        "integer"
    } else if present.iter().all(|v| v.is_number()) {
        "number"
    } else if present.iter().all(|v| v.is_boolean()) {
        "boolean"
    } else {
        "string"
    }
}

/// Response of `GET /api/dataframes/{id}/versions/{version_id}`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct VersionPayload {
    #[serde(deserialize_with = "id_string")]
    pub dataframe_id: String,
    #[serde(deserialize_with = "id_string")]
    pub version_id: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub previous_version_id: Option<String>,
    #[serde(default)]
    pub actual_size: u64,
    #[serde(default)]
    pub limit_size: u64,
    pub data: TableData,
}

impl VersionPayload {
    pub fn is_truncated(&self) -> bool {
        self.actual_size != self.limit_size
    }
}

/// Response of the synchronous V2 upload.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SyncUpload {
    pub data: TableData,
}

/// Ids come back as strings from the async endpoints but as numbers from some others.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn optional_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cast_operation_sends_null_payloads() {
        let request = ProcessRequest {
            version_id: "V1".to_owned(),
            column: "age".to_owned(),
            operation: ColumnOperation::CastToNumeric,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "version_id": "V1",
                "column": "age",
                "operation": {"type": "cast_to_numeric", "script": null, "to_fill": null}
            })
        );
    }

    #[test]
    fn script_and_fill_value_go_to_their_own_fields() {
        let script = ColumnOperation::from_kind(OperationKind::ApplyScript, Some("x+2".into())).unwrap();
        assert_eq!(
            serde_json::to_value(&script).unwrap(),
            json!({"type": "apply_script", "script": "x+2", "to_fill": null})
        );

        let fill = ColumnOperation::from_kind(OperationKind::FillNull, Some("0".into())).unwrap();
        assert_eq!(
            serde_json::to_value(&fill).unwrap(),
            json!({"type": "fill_null", "script": null, "to_fill": "0"})
        );
    }

    #[test]
    fn input_kinds_require_input() {
        assert!(ColumnOperation::from_kind(OperationKind::ApplyScript, None).is_none());
        assert!(ColumnOperation::from_kind(OperationKind::FillNull, None).is_none());
        assert!(ColumnOperation::from_kind(OperationKind::Initialize, None).is_none());
        assert_eq!(
            ColumnOperation::from_kind(OperationKind::CastToBoolean, Some("ignored".into())),
            Some(ColumnOperation::CastToBoolean)
        );
    }

    #[test]
    fn parses_status_response() {
        let meta: DataFrameMeta = serde_json::from_value(json!({
            "dataframe_id": "df-1",
            "versions": [
                {"version_id": "v1", "operation": "initialize", "script": null, "column": null, "status": "processed"},
                {"version_id": "v2", "operation": "fill_null", "script": null, "column": "age", "status": "processing"}
            ]
        }))
        .unwrap();
        assert!(meta.is_processing());
        assert_eq!(meta.latest().unwrap().operation, OperationKind::FillNull);
        assert_eq!(meta.latest().unwrap().column.as_deref(), Some("age"));
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let accepted: UploadAccepted = serde_json::from_value(json!({"dataframe_id": 123})).unwrap();
        assert_eq!(accepted.dataframe_id, "123");

        let version: Version = serde_json::from_value(json!({
            "version_id": 8,
            "operation": "cast_to_string",
            "status": "processed",
            "previous_version_id": 7
        }))
        .unwrap();
        assert_eq!(version.version_id, "8");
        assert_eq!(version.previous_version_id.as_deref(), Some("7"));

        let first: Version = serde_json::from_value(json!({
            "version_id": "v1",
            "operation": "initialize",
            "status": "processed",
            "previous_version_id": null
        }))
        .unwrap();
        assert!(first.previous_version_id.is_none());
    }

    #[test]
    fn display_types_follow_schema() {
        let fields: Vec<SchemaField> = serde_json::from_value(json!([
            {"name": "name", "type": "string"},
            {"name": "born", "type": "datetime"},
            {"name": "grade", "type": "any", "constraints": {"enum": ["a", "b"]}},
            {"name": "age", "type": "integer"}
        ]))
        .unwrap();
        let labels: Vec<String> = fields.iter().map(SchemaField::typed_label).collect();
        assert_eq!(
            labels,
            vec!["name[text]", "born[date]", "grade[category]", "age[integer]"]
        );
    }

    #[test]
    fn payload_reports_truncation() {
        let payload: VersionPayload = serde_json::from_value(json!({
            "dataframe_id": "df-1",
            "version_id": "v1",
            "previous_version_id": null,
            "actual_size": 5000,
            "limit_size": 1000,
            "data": {"data": [], "schema": {"fields": []}}
        }))
        .unwrap();
        assert!(payload.is_truncated());
    }

    #[test]
    fn column_map_becomes_rows() {
        let columns = json!({
            "name": {"0": "John", "1": "Jane"},
            "age": [30, 25],
            "score": [1.5, null]
        });
        let table = TableData::from_columns(columns.as_object().unwrap());
        assert_eq!(table.data.len(), 2);
        assert_eq!(table.data[1]["name"], json!("Jane"));
        let types: Vec<&str> = table
            .schema
            .fields
            .iter()
            .map(|f| f.field_type.as_str())
            .collect();
        assert_eq!(types, vec!["string", "integer", "number"]);
    }
}
