use crate::{
    data::{
        cohort::{Cohort, CohortPatch, NewCohort},
        student::{NewStudent, PopulatedStudent, Student, StudentPatch},
    },
    store::{
        CommitTransactionSnafu, CreateCollectionsSnafu, DataStore, GetDatabaseConnectionSnafu,
        MakeQuerySnafu, OpenDatabaseSnafu, StoreError, StoreResult,
    },
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use snafu::ResultExt;
use sqlx::{FromRow, PgConnection, Pool, Postgres, postgres::PgPoolOptions, types::Json};
use std::{collections::HashMap, sync::Arc};
use time::Date;
use tokio::sync::OnceCell;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct CohortRow {
    id: Uuid,
    name: String,
    cohort_slug: Option<String>,
    program: Option<String>,
    format: Option<String>,
    campus: Option<String>,
    start_date: Option<Date>,
    end_date: Option<Date>,
    in_progress: bool,
    program_manager: Option<String>,
    lead_teacher: Option<String>,
    total_hours: i32,
}

impl From<CohortRow> for Cohort {
    fn from(row: CohortRow) -> Self {
        let CohortRow {
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
        } = row;

        Self {
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

#[derive(Debug, FromRow)]
struct StudentRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    linkedin_url: Option<String>,
    languages: Vec<String>,
    program: Option<String>,
    background: Option<String>,
    image: Option<String>,
    projects: Json<Vec<Value>>,
    cohort_id: Option<Uuid>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        let StudentRow {
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
            cohort_id,
        } = row;

        Self {
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
            projects: projects.0,
            cohort: cohort_id,
        }
    }
}

///turns the unique index on `students.email` into something the handlers can report
fn student_write_error(source: sqlx::Error, email: &str) -> StoreError {
    match &source {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail {
            email: email.to_string(),
        },
        _ => StoreError::MakeQuery { source },
    }
}

///postgres-backed store
///
///the pool connects lazily and the tables are created the first time a query gets through, so the
///database can come up after the server does. a failed attempt is retried by the next request.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
    collections_created: Arc<OnceCell<()>>,
}

impl PostgresStore {
    ///only fails if the url can't be parsed, nothing is sent to the database yet
    pub fn connect_lazy(options: PgPoolOptions, url: &SecretString) -> StoreResult<Self> {
        let pool = options
            .connect_lazy(url.expose_secret())
            .context(OpenDatabaseSnafu)?;
        Ok(Self {
            pool,
            collections_created: Arc::new(OnceCell::new()),
        })
    }

    ///runs the migrations once per store, later calls are free
    pub async fn ensure_collections(&self) -> StoreResult<()> {
        self.collections_created
            .get_or_try_init(|| async {
                sqlx::migrate!()
                    .run(&self.pool)
                    .await
                    .context(CreateCollectionsSnafu)
            })
            .await?;
        Ok(())
    }

    async fn pool(&self) -> StoreResult<&Pool<Postgres>> {
        self.ensure_collections().await?;
        Ok(&self.pool)
    }

    async fn populate(&self, students: Vec<StudentRow>) -> StoreResult<Vec<PopulatedStudent>> {
        let mut cohort_ids: Vec<Uuid> = students.iter().filter_map(|row| row.cohort_id).collect();
        cohort_ids.sort_unstable();
        cohort_ids.dedup();

        let cohorts: HashMap<Uuid, Cohort> = if cohort_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, CohortRow>(
                "SELECT id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours FROM cohorts WHERE id = ANY($1)",
            )
            .bind(cohort_ids)
            .fetch_all(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?
            .into_iter()
            .map(|row| (row.id, Cohort::from(row)))
            .collect()
        };

        Ok(students
            .into_iter()
            .map(|row| Student::from(row).populate(&cohorts))
            .collect())
    }

    async fn write_student(student: &Student, conn: &mut PgConnection) -> StoreResult<()> {
        sqlx::query("UPDATE students SET first_name = $2, last_name = $3, email = $4, phone = $5, linkedin_url = $6, languages = $7, program = $8, background = $9, image = $10, projects = $11, cohort_id = $12 WHERE id = $1")
            .bind(student.id)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.email)
            .bind(&student.phone)
            .bind(&student.linkedin_url)
            .bind(&student.languages)
            .bind(&student.program)
            .bind(&student.background)
            .bind(&student.image)
            .bind(Json(&student.projects))
            .bind(student.cohort)
            .execute(conn)
            .await
            .map_err(|e| student_write_error(e, &student.email))?;
        Ok(())
    }

    async fn write_cohort(cohort: &Cohort, conn: &mut PgConnection) -> StoreResult<()> {
        sqlx::query("UPDATE cohorts SET name = $2, cohort_slug = $3, program = $4, format = $5, campus = $6, start_date = $7, end_date = $8, in_progress = $9, program_manager = $10, lead_teacher = $11, total_hours = $12 WHERE id = $1")
            .bind(cohort.id)
            .bind(&cohort.name)
            .bind(&cohort.cohort_slug)
            .bind(&cohort.program)
            .bind(&cohort.format)
            .bind(&cohort.campus)
            .bind(cohort.start_date)
            .bind(cohort.end_date)
            .bind(cohort.in_progress)
            .bind(&cohort.program_manager)
            .bind(&cohort.lead_teacher)
            .bind(cohort.total_hours)
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn insert_cohort(&self, to_be_added: NewCohort) -> StoreResult<Cohort> {
        let NewCohort {
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
        } = to_be_added;

        sqlx::query_as::<_, CohortRow>("INSERT INTO cohorts (id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours")
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(cohort_slug)
            .bind(program)
            .bind(format)
            .bind(campus)
            .bind(start_date)
            .bind(end_date)
            .bind(in_progress)
            .bind(program_manager)
            .bind(lead_teacher)
            .bind(total_hours)
            .fetch_one(self.pool().await?)
            .await
            .context(MakeQuerySnafu)
            .map(Cohort::from)
    }

    async fn get_all_cohorts(&self) -> StoreResult<Vec<Cohort>> {
        Ok(sqlx::query_as::<_, CohortRow>("SELECT id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours FROM cohorts ORDER BY position")
            .fetch_all(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?
            .into_iter()
            .map(Cohort::from)
            .collect())
    }

    async fn get_cohort_by_id(&self, id: Uuid) -> StoreResult<Option<Cohort>> {
        Ok(sqlx::query_as::<_, CohortRow>("SELECT id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours FROM cohorts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?
            .map(Cohort::from))
    }

    async fn update_cohort(&self, id: Uuid, patch: CohortPatch) -> StoreResult<Option<Cohort>> {
        let mut transaction = self
            .pool()
            .await?
            .begin()
            .await
            .context(GetDatabaseConnectionSnafu)?;

        let Some(row) = sqlx::query_as::<_, CohortRow>("SELECT id, name, cohort_slug, program, format, campus, start_date, end_date, in_progress, program_manager, lead_teacher, total_hours FROM cohorts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *transaction)
            .await
            .context(MakeQuerySnafu)?
        else {
            return Ok(None);
        };

        let mut cohort = Cohort::from(row);
        cohort.apply(patch);
        cohort.check_dates()?;

        Self::write_cohort(&cohort, &mut *transaction).await?;
        transaction.commit().await.context(CommitTransactionSnafu)?;

        Ok(Some(cohort))
    }

    async fn remove_cohort(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cohorts WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_student(&self, to_be_added: NewStudent) -> StoreResult<Student> {
        let NewStudent {
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
        } = to_be_added;

        sqlx::query_as::<_, StudentRow>("INSERT INTO students (id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id")
            .bind(Uuid::new_v4())
            .bind(first_name)
            .bind(last_name)
            .bind(&email)
            .bind(phone)
            .bind(linkedin_url)
            .bind(languages)
            .bind(program)
            .bind(background)
            .bind(image)
            .bind(Json(projects))
            .bind(cohort)
            .fetch_one(self.pool().await?)
            .await
            .map_err(|e| student_write_error(e, &email))
            .map(Student::from)
    }

    async fn get_all_students(&self) -> StoreResult<Vec<PopulatedStudent>> {
        let rows = sqlx::query_as::<_, StudentRow>("SELECT id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id FROM students ORDER BY position")
            .fetch_all(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?;
        self.populate(rows).await
    }

    async fn get_students_in_cohort(
        &self,
        cohort_id: Uuid,
    ) -> StoreResult<Vec<PopulatedStudent>> {
        let rows = sqlx::query_as::<_, StudentRow>("SELECT id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id FROM students WHERE cohort_id = $1 ORDER BY position")
            .bind(cohort_id)
            .fetch_all(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?;
        self.populate(rows).await
    }

    async fn get_student_by_id(&self, id: Uuid) -> StoreResult<Option<PopulatedStudent>> {
        let Some(row) = sqlx::query_as::<_, StudentRow>("SELECT id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?
        else {
            return Ok(None);
        };

        Ok(self.populate(vec![row]).await?.pop())
    }

    async fn update_student(
        &self,
        id: Uuid,
        patch: StudentPatch,
    ) -> StoreResult<Option<Student>> {
        let mut transaction = self
            .pool()
            .await?
            .begin()
            .await
            .context(GetDatabaseConnectionSnafu)?;

        let Some(row) = sqlx::query_as::<_, StudentRow>("SELECT id, first_name, last_name, email, phone, linkedin_url, languages, program, background, image, projects, cohort_id FROM students WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *transaction)
            .await
            .context(MakeQuerySnafu)?
        else {
            return Ok(None);
        };

        let mut student = Student::from(row);
        student.apply(patch);

        Self::write_student(&student, &mut *transaction).await?;
        transaction.commit().await.context(CommitTransactionSnafu)?;

        Ok(Some(student))
    }

    async fn remove_student(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await
            .context(MakeQuerySnafu)?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
