use crate::data::{
    ValidationError,
    cohort::{Cohort, CohortPatch, NewCohort},
    student::{NewStudent, PopulatedStudent, Student, StudentPatch},
};
use async_trait::async_trait;
use snafu::Snafu;
use std::fmt::Debug;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error creating collections"))]
    CreateCollections { source: sqlx::migrate::MigrateError },
    #[snafu(display("Error getting db connection"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error commiting SQL transaction"))]
    CommitTransaction { source: sqlx::Error },
    #[snafu(display("A student with email {:?} already exists", email))]
    DuplicateEmail { email: String },
    ///a patch that only breaks the rules once merged onto the stored record
    #[snafu(context(false), display("{}", source))]
    InvalidRecord { source: ValidationError },
}

impl StoreError {
    ///whether the failure was caused by what the client sent rather than by the store itself
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail { .. } | Self::InvalidRecord { .. }
        )
    }
}

///everything the handlers need from wherever students and cohorts live
///
///`None` from a by-id method means no record had that id.
#[async_trait]
pub trait DataStore: Debug + Send + Sync {
    async fn insert_cohort(&self, to_be_added: NewCohort) -> StoreResult<Cohort>;
    async fn get_all_cohorts(&self) -> StoreResult<Vec<Cohort>>;
    async fn get_cohort_by_id(&self, id: Uuid) -> StoreResult<Option<Cohort>>;
    async fn update_cohort(&self, id: Uuid, patch: CohortPatch) -> StoreResult<Option<Cohort>>;
    ///returns whether there was a cohort to remove
    async fn remove_cohort(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_student(&self, to_be_added: NewStudent) -> StoreResult<Student>;
    async fn get_all_students(&self) -> StoreResult<Vec<PopulatedStudent>>;
    async fn get_students_in_cohort(&self, cohort_id: Uuid)
    -> StoreResult<Vec<PopulatedStudent>>;
    async fn get_student_by_id(&self, id: Uuid) -> StoreResult<Option<PopulatedStudent>>;
    async fn update_student(&self, id: Uuid, patch: StudentPatch)
    -> StoreResult<Option<Student>>;
    ///returns whether there was a student to remove
    async fn remove_student(&self, id: Uuid) -> StoreResult<bool>;

    async fn close(&self) {}
}
