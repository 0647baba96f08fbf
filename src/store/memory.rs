use crate::{
    data::{
        cohort::{Cohort, CohortPatch, NewCohort},
        student::{NewStudent, PopulatedStudent, Student, StudentPatch},
    },
    store::{DataStore, DuplicateEmailSnafu, StoreResult},
};
use async_trait::async_trait;
use snafu::ensure;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Collections {
    //kept in insertion order, like a document collection's natural order
    cohorts: Vec<Cohort>,
    students: Vec<Student>,
}

impl Collections {
    fn cohorts_by_id(&self) -> HashMap<Uuid, Cohort> {
        self.cohorts
            .iter()
            .map(|cohort| (cohort.id, cohort.clone()))
            .collect()
    }

    fn ensure_email_free(&self, email: &str, ignoring: Option<Uuid>) -> StoreResult<()> {
        let taken = self
            .students
            .iter()
            .any(|student| student.email == email && Some(student.id) != ignoring);
        ensure!(!taken, DuplicateEmailSnafu { email });
        Ok(())
    }
}

///a process-local store, handy for tests and for running without postgres
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn insert_cohort(&self, to_be_added: NewCohort) -> StoreResult<Cohort> {
        let cohort = to_be_added.into_cohort(Uuid::new_v4());
        self.collections.write().await.cohorts.push(cohort.clone());
        Ok(cohort)
    }

    async fn get_all_cohorts(&self) -> StoreResult<Vec<Cohort>> {
        Ok(self.collections.read().await.cohorts.clone())
    }

    async fn get_cohort_by_id(&self, id: Uuid) -> StoreResult<Option<Cohort>> {
        Ok(self
            .collections
            .read()
            .await
            .cohorts
            .iter()
            .find(|cohort| cohort.id == id)
            .cloned())
    }

    async fn update_cohort(&self, id: Uuid, patch: CohortPatch) -> StoreResult<Option<Cohort>> {
        let mut collections = self.collections.write().await;
        let Some(existing) = collections.cohorts.iter_mut().find(|cohort| cohort.id == id) else {
            return Ok(None);
        };

        let mut updated = existing.clone();
        updated.apply(patch);
        updated.check_dates()?;

        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn remove_cohort(&self, id: Uuid) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let before = collections.cohorts.len();
        collections.cohorts.retain(|cohort| cohort.id != id);
        Ok(collections.cohorts.len() != before)
    }

    async fn insert_student(&self, to_be_added: NewStudent) -> StoreResult<Student> {
        let mut collections = self.collections.write().await;
        collections.ensure_email_free(&to_be_added.email, None)?;

        let student = to_be_added.into_student(Uuid::new_v4());
        collections.students.push(student.clone());
        Ok(student)
    }

    async fn get_all_students(&self) -> StoreResult<Vec<PopulatedStudent>> {
        let collections = self.collections.read().await;
        let cohorts = collections.cohorts_by_id();

        Ok(collections
            .students
            .iter()
            .cloned()
            .map(|student| student.populate(&cohorts))
            .collect())
    }

    async fn get_students_in_cohort(
        &self,
        cohort_id: Uuid,
    ) -> StoreResult<Vec<PopulatedStudent>> {
        let collections = self.collections.read().await;
        let cohorts = collections.cohorts_by_id();

        Ok(collections
            .students
            .iter()
            .filter(|student| student.cohort == Some(cohort_id))
            .cloned()
            .map(|student| student.populate(&cohorts))
            .collect())
    }

    async fn get_student_by_id(&self, id: Uuid) -> StoreResult<Option<PopulatedStudent>> {
        let collections = self.collections.read().await;

        Ok(collections
            .students
            .iter()
            .find(|student| student.id == id)
            .cloned()
            .map(|student| student.populate(&collections.cohorts_by_id())))
    }

    async fn update_student(
        &self,
        id: Uuid,
        patch: StudentPatch,
    ) -> StoreResult<Option<Student>> {
        let mut collections = self.collections.write().await;
        let Some(index) = collections
            .students
            .iter()
            .position(|student| student.id == id)
        else {
            return Ok(None);
        };

        if let Some(email) = &patch.email {
            collections.ensure_email_free(email, Some(id))?;
        }

        let existing = &mut collections.students[index];
        existing.apply(patch);
        Ok(Some(existing.clone()))
    }

    async fn remove_student(&self, id: Uuid) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let before = collections.students.len();
        collections.students.retain(|student| student.id != id);
        Ok(collections.students.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::json;

    fn new_student(email: &str, cohort: Option<Uuid>) -> NewStudent {
        serde_json::from_value(json!({
            "firstName": "Ana",
            "lastName": "Lee",
            "email": email,
            "cohort": cohort,
        }))
        .unwrap()
    }

    fn new_cohort(name: &str) -> NewCohort {
        serde_json::from_value(json!({ "name": name })).unwrap()
    }

    #[tokio::test]
    async fn duplicate_emails_are_refused() {
        let store = MemoryStore::new();
        store
            .insert_student(new_student("ana@x.com", None))
            .await
            .unwrap();

        let err = store
            .insert_student(new_student("ana@x.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail { .. }));
        assert_eq!(store.get_all_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn updating_to_someone_elses_email_is_refused() {
        let store = MemoryStore::new();
        store
            .insert_student(new_student("ana@x.com", None))
            .await
            .unwrap();
        let ben = store
            .insert_student(new_student("ben@x.com", None))
            .await
            .unwrap();

        let patch: StudentPatch = serde_json::from_value(json!({"email": "ana@x.com"})).unwrap();
        assert!(store.update_student(ben.id, patch).await.is_err());

        //re-sending your own email isn't a clash
        let patch: StudentPatch = serde_json::from_value(json!({"email": "ben@x.com"})).unwrap();
        assert!(store.update_student(ben.id, patch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_student_is_missing_even_with_a_taken_email() {
        let store = MemoryStore::new();
        store
            .insert_student(new_student("ana@x.com", None))
            .await
            .unwrap();

        let patch: StudentPatch = serde_json::from_value(json!({"email": "ana@x.com"})).unwrap();
        let updated = store.update_student(Uuid::new_v4(), patch).await.unwrap();
        assert_eq!(updated, None);
    }

    #[tokio::test]
    async fn students_are_filtered_and_populated_by_cohort() {
        let store = MemoryStore::new();
        let web = store.insert_cohort(new_cohort("Web Dev")).await.unwrap();
        let data = store.insert_cohort(new_cohort("Data")).await.unwrap();

        store
            .insert_student(new_student("a@x.com", Some(web.id)))
            .await
            .unwrap();
        store
            .insert_student(new_student("b@x.com", Some(data.id)))
            .await
            .unwrap();
        store
            .insert_student(new_student("c@x.com", None))
            .await
            .unwrap();

        let in_web = store.get_students_in_cohort(web.id).await.unwrap();
        assert_eq!(in_web.len(), 1);
        assert_eq!(in_web[0].email, "a@x.com");
        assert_eq!(in_web[0].cohort.as_ref(), Some(&web));
    }

    #[tokio::test]
    async fn removing_a_cohort_leaves_students_with_a_null_cohort() {
        let store = MemoryStore::new();
        let web = store.insert_cohort(new_cohort("Web Dev")).await.unwrap();
        let ana = store
            .insert_student(new_student("ana@x.com", Some(web.id)))
            .await
            .unwrap();

        assert!(store.remove_cohort(web.id).await.unwrap());
        assert!(!store.remove_cohort(web.id).await.unwrap());

        let ana = store.get_student_by_id(ana.id).await.unwrap().unwrap();
        assert_eq!(ana.cohort, None);
    }

    #[tokio::test]
    async fn rejected_cohort_patch_leaves_the_record_alone() {
        let store = MemoryStore::new();
        let cohort = store
            .insert_cohort(
                serde_json::from_value(json!({
                    "name": "UX",
                    "startDate": "2024-02-01",
                    "endDate": "2024-05-01"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let patch: CohortPatch =
            serde_json::from_value(json!({"name": "UX/UI", "endDate": "2024-01-01"})).unwrap();
        let err = store.update_cohort(cohort.id, patch).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));

        let unchanged = store.get_cohort_by_id(cohort.id).await.unwrap();
        assert_eq!(unchanged, Some(cohort));
    }
}
