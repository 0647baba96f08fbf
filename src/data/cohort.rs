use crate::data::{
    InvalidFieldSnafu, ValidationResult, deserialize_some, ensure_not_blank, patch_optional,
    patch_required,
};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use time::Date;
use uuid::Uuid;

pub const DEFAULT_TOTAL_HOURS: i32 = 360;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub cohort_slug: Option<String>,
    pub program: Option<String>,
    pub format: Option<String>,
    pub campus: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub in_progress: bool,
    pub program_manager: Option<String>,
    pub lead_teacher: Option<String>,
    pub total_hours: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCohort {
    pub name: String,
    #[serde(default)]
    pub cohort_slug: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub program_manager: Option<String>,
    #[serde(default)]
    pub lead_teacher: Option<String>,
    #[serde(default = "default_total_hours")]
    pub total_hours: i32,
}

const fn default_total_hours() -> i32 {
    DEFAULT_TOTAL_HOURS
}

#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub cohort_slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub program: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub format: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub campus: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub start_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_date: Option<Option<Date>>,
    #[serde(default)]
    pub in_progress: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub program_manager: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub lead_teacher: Option<Option<String>>,
    #[serde(default)]
    pub total_hours: Option<i32>,
}

fn ensure_dates_ordered(start: Option<Date>, end: Option<Date>) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        ensure!(
            start <= end,
            InvalidFieldSnafu {
                field: "endDate",
                reason: format!("{end} is before the start date {start}"),
            }
        );
    }
    Ok(())
}

fn ensure_hours_positive(total_hours: i32) -> ValidationResult<()> {
    ensure!(
        total_hours >= 0,
        InvalidFieldSnafu {
            field: "totalHours",
            reason: "must not be negative"
        }
    );
    Ok(())
}

impl NewCohort {
    pub fn validate(&self) -> ValidationResult<()> {
        ensure_not_blank("name", &self.name)?;
        ensure_dates_ordered(self.start_date, self.end_date)?;
        ensure_hours_positive(self.total_hours)
    }

    pub fn into_cohort(self, id: Uuid) -> Cohort {
        let Self {
            name,
            cohort_slug,
            program,
            format,
            campus,
            start_date,
            end_date,
            in_progress,
            program_manager,
            lead_teacher,
            total_hours,
        } = self;

        Cohort {
            id,
            name,
            cohort_slug,
            program,
            format,
            campus,
            start_date,
            end_date,
            in_progress,
            program_manager,
            lead_teacher,
            total_hours,
        }
    }
}

impl CohortPatch {
    ///checks the fields present in the patch on their own, date order needs the merged record
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            ensure_not_blank("name", name)?;
        }
        if let Some(total_hours) = self.total_hours {
            ensure_hours_positive(total_hours)?;
        }
        Ok(())
    }
}

impl Cohort {
    ///the merged record still has to pass `Cohort::check_dates` before it is written
    pub fn apply(&mut self, patch: CohortPatch) {
        let CohortPatch {
            name,
            cohort_slug,
            program,
            format,
            campus,
            start_date,
            end_date,
            in_progress,
            program_manager,
            lead_teacher,
            total_hours,
        } = patch;

        patch_required(&mut self.name, name);
        patch_optional(&mut self.cohort_slug, cohort_slug);
        patch_optional(&mut self.program, program);
        patch_optional(&mut self.format, format);
        patch_optional(&mut self.campus, campus);
        patch_optional(&mut self.start_date, start_date);
        patch_optional(&mut self.end_date, end_date);
        patch_required(&mut self.in_progress, in_progress);
        patch_optional(&mut self.program_manager, program_manager);
        patch_optional(&mut self.lead_teacher, lead_teacher);
        patch_required(&mut self.total_hours, total_hours);
    }

    pub fn check_dates(&self) -> ValidationResult<()> {
        ensure_dates_ordered(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    fn web_dev() -> Cohort {
        serde_json::from_value::<NewCohort>(json!({
            "name": "Web Dev Jan24",
            "startDate": "2024-01-08",
            "endDate": "2024-04-05",
            "programManager": "Sally"
        }))
        .unwrap()
        .into_cohort(Uuid::new_v4())
    }

    #[test]
    fn new_cohort_fills_in_defaults() {
        let cohort = web_dev();

        assert_eq!(cohort.total_hours, DEFAULT_TOTAL_HOURS);
        assert!(!cohort.in_progress);
        assert_eq!(cohort.start_date, Some(date!(2024 - 01 - 08)));
        assert_eq!(cohort.campus, None);
    }

    #[test]
    fn serialises_with_mongo_style_id_and_camel_case() {
        let cohort = web_dev();
        let value = serde_json::to_value(&cohort).unwrap();

        assert_eq!(value["_id"], json!(cohort.id));
        assert_eq!(value["startDate"], json!("2024-01-08"));
        assert_eq!(value["totalHours"], json!(360));
    }

    #[test]
    fn validation_rejects_blank_names_and_backwards_dates() {
        let blank: NewCohort = serde_json::from_value(json!({"name": "  "})).unwrap();
        assert!(blank.validate().is_err());

        let backwards: NewCohort = serde_json::from_value(json!({
            "name": "Data Mar24",
            "startDate": "2024-03-10",
            "endDate": "2024-03-01"
        }))
        .unwrap();
        assert!(backwards.validate().is_err());

        let negative: NewCohort =
            serde_json::from_value(json!({"name": "UX", "totalHours": -1})).unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn patch_changes_only_given_fields_and_null_clears() {
        let mut cohort = web_dev();
        let before = cohort.clone();

        let patch: CohortPatch = serde_json::from_value(json!({
            "campus": "Berlin",
            "programManager": null
        }))
        .unwrap();
        patch.validate().unwrap();
        cohort.apply(patch);
        cohort.check_dates().unwrap();

        assert_eq!(cohort.campus.as_deref(), Some("Berlin"));
        assert_eq!(cohort.program_manager, None);
        assert_eq!(cohort.name, before.name);
        assert_eq!(cohort.start_date, before.start_date);
        assert_eq!(cohort.id, before.id);
    }

    #[test]
    fn patch_cannot_move_end_before_existing_start() {
        let mut cohort = web_dev();
        let patch: CohortPatch =
            serde_json::from_value(json!({"endDate": "2023-12-01"})).unwrap();

        patch.validate().unwrap();
        cohort.apply(patch);

        let err = cohort.check_dates().unwrap_err();
        assert!(err.to_string().contains("endDate"), "{err}");
    }

    #[test]
    fn patch_moving_start_past_existing_end_fails_once_merged() {
        let mut cohort = web_dev();
        let patch: CohortPatch =
            serde_json::from_value(json!({"startDate": "2024-05-01"})).unwrap();

        patch.validate().unwrap();
        cohort.apply(patch);
        assert!(cohort.check_dates().is_err());
    }
}
