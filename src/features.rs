//! Project feature extraction shared by training, evaluation and live scoring.
//!
//! Every consumer encodes rows through [`FeatureRow::to_vector`], which walks
//! [`FEATURE_COLUMNS`] in order, so the training and serving layouts cannot
//! drift apart.

use serde::Serialize;
use time::{Date, Month};

/// Number of `f32` values per encoded feature vector.
pub const FEATURE_LEN: usize = 7;

/// Case-insensitive marker in a project name that flags a custom build.
const CUSTOM_MARKER: &str = "custom";

/// Yacht model dimensions relevant to build duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YachtSpec {
    pub length_m: f32,
    pub base_price: f32,
}

/// One project as read from storage, with its related entities already counted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectAggregate {
    pub project_id: i64,
    pub name: String,
    pub customer_name: String,
    pub planned_start: Date,
    pub planned_end: Date,
    pub actual_end: Option<Date>,
    /// `None` when the project has no yacht model linked.
    pub yacht: Option<YachtSpec>,
    pub task_count: u32,
    pub change_request_count: u32,
    pub interaction_count: u32,
}

impl ProjectAggregate {
    /// Projects still under way have no recorded completion.
    pub fn is_active(&self) -> bool {
        self.actual_end.is_none()
    }
}

/// Numeric summary of one project for model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    pub length_m: f32,
    pub base_price: f32,
    pub task_count: u32,
    pub change_request_count: u32,
    pub interaction_count: u32,
    pub is_custom: bool,
    pub is_summer_start: bool,
    /// Actual minus planned completion in days; `None` until the project completes.
    pub label_delay_days: Option<f32>,
}

impl FeatureRow {
    /// Build an unlabeled row from raw spec values and counts.
    ///
    /// Used by callers that only know the yacht spec and counts, so the
    /// custom and summer flags stay unset.
    pub fn from_counts(
        length_m: f32,
        base_price: f32,
        task_count: u32,
        change_request_count: u32,
        interaction_count: u32,
    ) -> Self {
        Self {
            length_m,
            base_price,
            task_count,
            change_request_count,
            interaction_count,
            is_custom: false,
            is_summer_start: false,
            label_delay_days: None,
        }
    }

    /// Encode the row in [`FEATURE_COLUMNS`] order.
    pub fn to_vector(&self) -> [f32; FEATURE_LEN] {
        let mut out = [0.0f32; FEATURE_LEN];
        for (slot, column) in out.iter_mut().zip(FEATURE_COLUMNS.iter()) {
            *slot = (column.value)(self);
        }
        out
    }

    /// Label with unlabeled rows counted as a zero-day delay.
    pub fn label_or_zero(&self) -> f32 {
        self.label_delay_days.unwrap_or(0.0)
    }
}

/// A named accessor for one feature column.
#[derive(Clone, Copy)]
pub struct FeatureColumn {
    pub name: &'static str,
    pub value: fn(&FeatureRow) -> f32,
}

impl std::fmt::Debug for FeatureColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureColumn")
            .field("name", &self.name)
            .finish()
    }
}

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Feature layout used by every model in the crate.
pub const FEATURE_COLUMNS: [FeatureColumn; FEATURE_LEN] = [
    FeatureColumn {
        name: "length_m",
        value: |row| row.length_m,
    },
    FeatureColumn {
        name: "base_price",
        value: |row| row.base_price,
    },
    FeatureColumn {
        name: "task_count",
        value: |row| row.task_count as f32,
    },
    FeatureColumn {
        name: "change_request_count",
        value: |row| row.change_request_count as f32,
    },
    FeatureColumn {
        name: "interaction_count",
        value: |row| row.interaction_count as f32,
    },
    FeatureColumn {
        name: "is_custom",
        value: |row| flag(row.is_custom),
    },
    FeatureColumn {
        name: "is_summer_start",
        value: |row| flag(row.is_summer_start),
    },
];

/// Derive the feature row for a project.
///
/// A missing yacht model contributes zero length and price.
pub fn extract(project: &ProjectAggregate) -> FeatureRow {
    let spec = project.yacht.unwrap_or(YachtSpec {
        length_m: 0.0,
        base_price: 0.0,
    });
    FeatureRow {
        length_m: spec.length_m,
        base_price: spec.base_price,
        task_count: project.task_count,
        change_request_count: project.change_request_count,
        interaction_count: project.interaction_count,
        is_custom: is_custom_name(&project.name),
        is_summer_start: is_summer_month(project.planned_start.month()),
        label_delay_days: project
            .actual_end
            .map(|actual| delay_days(project.planned_end, actual)),
    }
}

/// Extract every project, preserving input order.
pub fn extract_all(projects: &[ProjectAggregate]) -> Vec<FeatureRow> {
    projects.iter().map(extract).collect()
}

fn is_custom_name(name: &str) -> bool {
    name.to_lowercase().contains(CUSTOM_MARKER)
}

fn is_summer_month(month: Month) -> bool {
    matches!(
        month,
        Month::June | Month::July | Month::August | Month::September
    )
}

fn delay_days(planned_end: Date, actual_end: Date) -> f32 {
    (actual_end - planned_end).whole_days() as f32
}
