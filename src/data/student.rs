use crate::data::{
    InvalidFieldSnafu, ValidationResult, cohort::Cohort, deserialize_some, ensure_not_blank,
    patch_optional, patch_required,
};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ensure;
use std::collections::HashMap;
use uuid::Uuid;

///a student as stored, with `cohort` holding just the cohort's id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub languages: Vec<String>,
    pub program: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub projects: Vec<Value>,
    pub cohort: Option<Uuid>,
}

///a student as read back, with `cohort` expanded into the full cohort (or `null` if it points nowhere)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedStudent {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub languages: Vec<String>,
    pub program: Option<String>,
    pub background: Option<String>,
    pub image: Option<String>,
    pub projects: Vec<Value>,
    pub cohort: Option<Cohort>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub projects: Vec<Value>,
    #[serde(default)]
    pub cohort: Option<Uuid>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub program: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub background: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(default)]
    pub projects: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub cohort: Option<Option<Uuid>>,
}

fn ensure_email(email: &str) -> ValidationResult<()> {
    ensure!(
        EmailAddress::is_valid(email),
        InvalidFieldSnafu {
            field: "email",
            reason: format!("{email:?} is not a valid email address"),
        }
    );
    Ok(())
}

impl NewStudent {
    pub fn validate(&self) -> ValidationResult<()> {
        ensure_not_blank("firstName", &self.first_name)?;
        ensure_not_blank("lastName", &self.last_name)?;
        ensure_email(&self.email)
    }

    pub fn into_student(self, id: Uuid) -> Student {
        let Self {
            first_name,
            last_name,
            email,
            phone,
            linkedin_url,
            languages,
            program,
            background,
            image,
            projects,
            cohort,
        } = self;

        Student {
            id,
            first_name,
            last_name,
            email,
            phone,
            linkedin_url,
            languages,
            program,
            background,
            image,
            projects,
            cohort,
        }
    }
}

impl StudentPatch {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(first_name) = &self.first_name {
            ensure_not_blank("firstName", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            ensure_not_blank("lastName", last_name)?;
        }
        if let Some(email) = &self.email {
            ensure_email(email)?;
        }
        Ok(())
    }
}

impl Student {
    pub fn apply(&mut self, patch: StudentPatch) {
        let StudentPatch {
            first_name,
            last_name,
            email,
            phone,
            linkedin_url,
            languages,
            program,
            background,
            image,
            projects,
            cohort,
        } = patch;

        patch_required(&mut self.first_name, first_name);
        patch_required(&mut self.last_name, last_name);
        patch_required(&mut self.email, email);
        patch_optional(&mut self.phone, phone);
        patch_optional(&mut self.linkedin_url, linkedin_url);
        patch_required(&mut self.languages, languages);
        patch_optional(&mut self.program, program);
        patch_optional(&mut self.background, background);
        patch_optional(&mut self.image, image);
        patch_required(&mut self.projects, projects);
        patch_optional(&mut self.cohort, cohort);
    }

    pub fn populate(self, cohorts: &HashMap<Uuid, Cohort>) -> PopulatedStudent {
        let Self {
            id,
            first_name,
            last_name,
            email,
            phone,
            linkedin_url,
            languages,
            program,
            background,
            image,
            projects,
            cohort,
        } = self;

        PopulatedStudent {
            id,
            first_name,
            last_name,
            email,
            phone,
            linkedin_url,
            languages,
            program,
            background,
            image,
            projects,
            cohort: cohort.and_then(|id| cohorts.get(&id).cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ana() -> Student {
        serde_json::from_value::<NewStudent>(json!({
            "firstName": "Ana",
            "lastName": "Lee",
            "email": "ana@x.com",
            "phone": "555-0101",
            "languages": ["English", "Korean"]
        }))
        .unwrap()
        .into_student(Uuid::new_v4())
    }

    #[test]
    fn optional_collections_default_to_empty() {
        let student = ana();

        assert!(student.projects.is_empty());
        assert_eq!(student.languages, vec!["English", "Korean"]);
        assert_eq!(student.cohort, None);
    }

    #[test]
    fn missing_required_field_does_not_deserialise() {
        let res = serde_json::from_value::<NewStudent>(json!({
            "firstName": "Ana",
            "email": "ana@x.com"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn validation_checks_names_and_email() {
        let mut new: NewStudent = serde_json::from_value(json!({
            "firstName": "Ana",
            "lastName": "Lee",
            "email": "not-an-email"
        }))
        .unwrap();
        assert!(new.validate().is_err());

        new.email = "ana@x.com".into();
        assert!(new.validate().is_ok());

        new.last_name = String::new();
        assert!(new.validate().is_err());
    }

    #[test]
    fn partial_patch_leaves_other_fields_alone() {
        let mut student = ana();
        let before = student.clone();

        let patch: StudentPatch = serde_json::from_value(json!({"phone": "555-0199"})).unwrap();
        patch.validate().unwrap();
        student.apply(patch);

        assert_eq!(student.phone.as_deref(), Some("555-0199"));
        assert_eq!(
            Student {
                phone: before.phone.clone(),
                ..student.clone()
            },
            before
        );
    }

    #[test]
    fn explicit_null_unassigns_cohort() {
        let mut student = ana();
        student.cohort = Some(Uuid::new_v4());

        let untouched: StudentPatch = serde_json::from_value(json!({})).unwrap();
        student.apply(untouched);
        assert!(student.cohort.is_some());

        let cleared: StudentPatch = serde_json::from_value(json!({"cohort": null})).unwrap();
        student.apply(cleared);
        assert_eq!(student.cohort, None);
    }

    #[test]
    fn populate_expands_known_cohorts_and_nulls_dangling_ones() {
        let cohort = serde_json::from_value::<crate::data::cohort::NewCohort>(
            json!({"name": "Web Dev Jan24"}),
        )
        .unwrap()
        .into_cohort(Uuid::new_v4());
        let cohorts = HashMap::from([(cohort.id, cohort.clone())]);

        let mut assigned = ana();
        assigned.cohort = Some(cohort.id);
        assert_eq!(assigned.populate(&cohorts).cohort, Some(cohort));

        let mut dangling = ana();
        dangling.cohort = Some(Uuid::new_v4());
        let populated = dangling.populate(&cohorts);
        assert_eq!(populated.cohort, None);
        assert_eq!(
            serde_json::to_value(&populated).unwrap()["cohort"],
            Value::Null
        );
    }
}
