use crate::{
    data::student::{NewStudent, PopulatedStudent, Student, StudentPatch},
    error::{CohortToolsResult, MissingStudentSnafu, StoreSnafu},
    extract::{IdPath, Payload},
    state::CohortToolsState,
};
use axum::{Json, extract::State, http::StatusCode};
use snafu::{OptionExt, ResultExt};

pub async fn get_students(
    State(state): State<CohortToolsState>,
) -> CohortToolsResult<Json<Vec<PopulatedStudent>>> {
    let students = state.get_all_students().await.context(StoreSnafu {
        action: "retrieve students",
    })?;
    Ok(Json(students))
}

pub async fn post_student(
    State(state): State<CohortToolsState>,
    Payload(new_student): Payload<NewStudent>,
) -> CohortToolsResult<(StatusCode, Json<Student>)> {
    new_student.validate()?;

    let student = state
        .insert_student(new_student)
        .await
        .context(StoreSnafu {
            action: "create the student",
        })?;
    info!(id = %student.id, "Created student");

    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn get_students_in_cohort(
    State(state): State<CohortToolsState>,
    IdPath(cohort_id): IdPath,
) -> CohortToolsResult<Json<Vec<PopulatedStudent>>> {
    let students = state
        .get_students_in_cohort(cohort_id)
        .await
        .context(StoreSnafu {
            action: "retrieve students for the cohort",
        })?;
    Ok(Json(students))
}

pub async fn get_student(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
) -> CohortToolsResult<Json<PopulatedStudent>> {
    let student = state
        .get_student_by_id(id)
        .await
        .context(StoreSnafu {
            action: "retrieve the student",
        })?
        .context(MissingStudentSnafu { id })?;
    Ok(Json(student))
}

pub async fn put_student(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
    Payload(patch): Payload<StudentPatch>,
) -> CohortToolsResult<Json<Student>> {
    patch.validate()?;

    let student = state
        .update_student(id, patch)
        .await
        .context(StoreSnafu {
            action: "update the student",
        })?
        .context(MissingStudentSnafu { id })?;
    info!(%id, "Updated student");

    Ok(Json(student))
}

pub async fn delete_student(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
) -> CohortToolsResult<StatusCode> {
    let existed = state.remove_student(id).await.context(StoreSnafu {
        action: "delete the student",
    })?;
    info!(%id, existed, "Deleted student");

    Ok(StatusCode::NO_CONTENT)
}
