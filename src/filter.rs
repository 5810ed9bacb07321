use polars::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOps {
    EqualNum,
    EqualStr,
    GreaterThan,
    GreaterEqualThan,
    LowerThan,
    LowerEqualThan,
    IsNull,
    IsNotNull,
}

impl FilterOps {
    pub const ALL: [FilterOps; 8] = [
        FilterOps::EqualNum,
        FilterOps::EqualStr,
        FilterOps::GreaterThan,
        FilterOps::GreaterEqualThan,
        FilterOps::LowerThan,
        FilterOps::LowerEqualThan,
        FilterOps::IsNull,
        FilterOps::IsNotNull,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterOps::EqualNum => "= (number)",
            FilterOps::EqualStr => "= (text)",
            FilterOps::GreaterThan => ">",
            FilterOps::GreaterEqualThan => ">=",
            FilterOps::LowerThan => "<",
            FilterOps::LowerEqualThan => "<=",
            FilterOps::IsNull => "is null",
            FilterOps::IsNotNull => "is not null",
        }
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOps::IsNull | FilterOps::IsNotNull)
    }
}

/// Grid filter settings. `applied` holds the last filter the user confirmed, which is
/// what the view is derived from; the other fields are the form being edited.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrameFilter {
    pub column: String,
    pub operation: FilterOps,
    pub value: String,
    pub applied: Option<AppliedFilter>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppliedFilter {
    pub column: String,
    pub operation: FilterOps,
    pub value: String,
}

impl Default for DataFrameFilter {
    fn default() -> Self {
        Self {
            column: String::from(""),
            operation: FilterOps::EqualNum,
            value: String::from(""),
            applied: None,
        }
    }
}

impl DataFrameFilter {
    /// Confirms the form. Returns false when no column is selected.
    pub fn apply(&mut self) -> bool {
        if self.column.is_empty() {
            return false;
        }
        self.applied = Some(AppliedFilter {
            column: self.column.clone(),
            operation: self.operation,
            value: self.value.clone(),
        });
        true
    }

    pub fn clear(&mut self) {
        self.applied = None;
    }
}

impl AppliedFilter {
    pub fn expr(&self) -> Expr {
        let column = self.column.as_str();
        let parsed_number = self.value.trim().parse::<f64>().unwrap_or_default();
        match self.operation {
            FilterOps::EqualNum => col(column).eq(lit(parsed_number)),
            FilterOps::EqualStr => col(column).eq(lit(self.value.clone())),
            FilterOps::GreaterThan => col(column).gt(lit(parsed_number)),
            FilterOps::GreaterEqualThan => col(column).gt_eq(lit(parsed_number)),
            FilterOps::LowerThan => col(column).lt(lit(parsed_number)),
            FilterOps::LowerEqualThan => col(column).lt_eq(lit(parsed_number)),
            FilterOps::IsNull => col(column).is_null(),
            FilterOps::IsNotNull => col(column).is_not_null(),
        }
    }
}
