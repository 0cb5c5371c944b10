use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fmt::{Display, Formatter};

pub const UNKNOWN: &str = "-";

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ResourceReference {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

impl Display for ResourceReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.api_version, self.kind, self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub condition_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
}

impl Condition {
    pub fn unknown() -> Self {
        Self {
            condition_type: String::new(),
            status: UNKNOWN.to_string(),
            reason: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConditionList(pub Vec<Condition>);

impl ConditionList {
    pub fn get(&self, condition_type: &str) -> Condition {
        self.0
            .iter()
            .find(|condition| condition.condition_type == condition_type)
            .cloned()
            .unwrap_or_else(Condition::unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("row has {got} fields but {expected} are required")]
pub struct RowShapeError {
    pub got: usize,
    pub expected: usize,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Row {
    pub namespace: String,
    pub kind: String,
    pub api_version: String,
    pub name: String,
    pub synced: String,
    pub synced_reason: String,
    pub ready: String,
    pub ready_reason: String,
}

impl Row {
    pub const FIELD_COUNT: usize = 8;
    pub const HEADERS: [&'static str; Self::FIELD_COUNT] = [
        "Namespace",
        "Kind",
        "ApiVersion",
        "Name",
        "Synced",
        "SyncedReason",
        "Ready",
        "ReadyReason",
    ];

    pub fn derive(namespace: &str, reference: &ResourceReference, status: &ConditionList) -> Self {
        let synced = status.get("Synced");
        let ready = status.get("Ready");
        Self {
            namespace: namespace.to_string(),
            kind: reference.kind.clone(),
            api_version: reference.api_version.clone(),
            name: reference.name.clone(),
            synced: synced.status,
            synced_reason: synced.reason,
            ready: ready.status,
            ready_reason: ready.reason,
        }
    }

    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.namespace.clone(),
            self.kind.clone(),
            self.api_version.clone(),
            self.name.clone(),
            self.synced.clone(),
            self.synced_reason.clone(),
            self.ready.clone(),
            self.ready_reason.clone(),
        ]
    }

    pub fn from_fields(fields: &[String]) -> Result<Self, RowShapeError> {
        let [
            namespace,
            kind,
            api_version,
            name,
            synced,
            synced_reason,
            ready,
            ready_reason,
        ] = fields
        else {
            return Err(RowShapeError {
                got: fields.len(),
                expected: Self::FIELD_COUNT,
            });
        };

        Ok(Self {
            namespace: namespace.clone(),
            kind: kind.clone(),
            api_version: api_version.clone(),
            name: name.clone(),
            synced: synced.clone(),
            synced_reason: synced_reason.clone(),
            ready: ready.clone(),
            ready_reason: ready_reason.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TableStatus {
    Loading,
    Loaded,
    NoReferences,
}

#[derive(Debug, Clone)]
pub struct ResourceTable {
    rows: Vec<Vec<String>>,
    selected: usize,
    loaded: bool,
    last_refreshed: Option<DateTime<Local>>,
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTable {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            selected: 0,
            loaded: false,
            last_refreshed: None,
        }
    }

    /// Replaces every row in declaration order. The cursor keeps its index,
    /// clamped to the new last row.
    pub fn apply_rows(&mut self, rows: &[Row], refreshed_at: DateTime<Local>) {
        self.rows.clear();
        self.rows.extend(rows.iter().map(Row::to_fields));
        self.loaded = true;
        self.last_refreshed = Some(refreshed_at);
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn status(&self) -> TableStatus {
        if !self.loaded {
            TableStatus::Loading
        } else if self.rows.is_empty() {
            TableStatus::NoReferences
        } else {
            TableStatus::Loaded
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn selected_row(&self) -> Option<Result<Row, RowShapeError>> {
        self.rows.get(self.selected).map(|fields| Row::from_fields(fields))
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }

        let max_index = self.rows.len().saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.selected = (current + delta).clamp(0, max_index) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, ConditionList, ResourceReference, ResourceTable, Row, TableStatus};
    use chrono::Local;

    fn reference(kind: &str, name: &str) -> ResourceReference {
        ResourceReference {
            api_version: "example.org/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    fn rows(names: &[&str]) -> Vec<Row> {
        names
            .iter()
            .map(|name| Row::derive("default", &reference("Thing", name), &ConditionList::default()))
            .collect()
    }

    #[test]
    fn row_fields_round_trip() {
        let status = ConditionList(vec![
            Condition {
                condition_type: "Synced".to_string(),
                status: "True".to_string(),
                reason: "ReconcileSuccess".to_string(),
            },
            Condition {
                condition_type: "Ready".to_string(),
                status: "False".to_string(),
                reason: "Creating".to_string(),
            },
        ]);
        let samples = [
            Row::derive("default", &reference("Application", "app"), &status),
            Row::derive("", &reference("", ""), &ConditionList::default()),
        ];

        for row in samples {
            let fields = row.to_fields();
            assert_eq!(fields.len(), Row::FIELD_COUNT);
            assert_eq!(Row::from_fields(&fields), Ok(row));
        }
    }

    #[test]
    fn row_fields_follow_header_order() {
        let status = ConditionList(vec![Condition {
            condition_type: "Ready".to_string(),
            status: "True".to_string(),
            reason: "Available".to_string(),
        }]);
        let row = Row::derive("ns", &reference("Secret", "creds"), &status);
        assert_eq!(
            row.to_fields(),
            vec!["ns", "Secret", "example.org/v1", "creds", "-", "-", "True", "Available"]
        );
        assert_eq!(Row::HEADERS.len(), row.to_fields().len());
    }

    #[test]
    fn from_fields_rejects_wrong_shape() {
        let short = vec!["a".to_string(); 3];
        let error = Row::from_fields(&short).unwrap_err();
        assert_eq!(error.got, 3);
        assert_eq!(error.expected, Row::FIELD_COUNT);
    }

    #[test]
    fn missing_condition_falls_back_to_placeholder() {
        let condition = ConditionList::default().get("Ready");
        assert_eq!(condition.status, "-");
        assert_eq!(condition.reason, "-");
    }

    #[test]
    fn condition_lookup_returns_first_match() {
        let list = ConditionList(vec![
            Condition {
                condition_type: "Ready".to_string(),
                status: "False".to_string(),
                reason: "first".to_string(),
            },
            Condition {
                condition_type: "Ready".to_string(),
                status: "True".to_string(),
                reason: "second".to_string(),
            },
        ]);
        assert_eq!(list.get("Ready").reason, "first");
    }

    #[test]
    fn cursor_clamps_to_last_row_when_table_shrinks() {
        let mut table = ResourceTable::new();
        table.apply_rows(&rows(&["a", "b", "c", "d", "e"]), Local::now());
        table.move_selection(4);
        assert_eq!(table.selected(), 4);

        table.apply_rows(&rows(&["a", "b"]), Local::now());
        assert_eq!(table.selected(), 1);
    }

    #[test]
    fn cursor_keeps_index_not_identity() {
        let mut table = ResourceTable::new();
        table.apply_rows(&rows(&["a", "b", "c"]), Local::now());
        table.move_selection(1);

        table.apply_rows(&rows(&["x", "y", "z"]), Local::now());
        assert_eq!(table.selected(), 1);
        let selected = table.selected_row().unwrap().unwrap();
        assert_eq!(selected.name, "y");
    }

    #[test]
    fn rows_keep_declaration_order() {
        let mut table = ResourceTable::new();
        table.apply_rows(&rows(&["zeta", "alpha", "mid"]), Local::now());
        let names = table
            .rows()
            .iter()
            .map(|fields| fields[3].as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn empty_rows_after_load_report_no_references() {
        let mut table = ResourceTable::new();
        assert_eq!(table.status(), TableStatus::Loading);

        table.apply_rows(&rows(&["a", "b"]), Local::now());
        assert_eq!(table.status(), TableStatus::Loaded);

        table.apply_rows(&[], Local::now());
        assert_eq!(table.status(), TableStatus::NoReferences);
        assert!(table.is_empty());
        assert_eq!(table.selected(), 0);
        assert!(table.selected_row().is_none());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut table = ResourceTable::new();
        table.apply_rows(&rows(&["a", "b", "c"]), Local::now());
        table.move_selection(-5);
        assert_eq!(table.selected(), 0);
        table.move_selection(10);
        assert_eq!(table.selected(), 2);
        table.select_first();
        assert_eq!(table.selected(), 0);
        table.select_last();
        assert_eq!(table.selected(), 2);
    }
}
