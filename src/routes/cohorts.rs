use crate::{
    data::cohort::{Cohort, CohortPatch, NewCohort},
    error::{CohortToolsError, CohortToolsResult, MissingCohortSnafu, StoreSnafu},
    extract::{IdPath, Payload},
    state::CohortToolsState,
};
use axum::{Json, extract::State, http::StatusCode};
use snafu::{OptionExt, ResultExt};

pub async fn get_cohorts(
    State(state): State<CohortToolsState>,
) -> CohortToolsResult<Json<Vec<Cohort>>> {
    let cohorts = state.get_all_cohorts().await.context(StoreSnafu {
        action: "retrieve cohorts",
    })?;
    Ok(Json(cohorts))
}

pub async fn post_cohort(
    State(state): State<CohortToolsState>,
    Payload(new_cohort): Payload<NewCohort>,
) -> CohortToolsResult<(StatusCode, Json<Cohort>)> {
    new_cohort.validate()?;

    let cohort = state.insert_cohort(new_cohort).await.context(StoreSnafu {
        action: "create the cohort",
    })?;
    info!(id = %cohort.id, name = %cohort.name, "Created cohort");

    Ok((StatusCode::CREATED, Json(cohort)))
}

pub async fn get_cohort(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
) -> CohortToolsResult<Json<Cohort>> {
    let cohort = state
        .get_cohort_by_id(id)
        .await
        .context(StoreSnafu {
            action: "retrieve the cohort",
        })?
        .context(MissingCohortSnafu { id })?;
    Ok(Json(cohort))
}

pub async fn put_cohort(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
    Payload(patch): Payload<CohortPatch>,
) -> CohortToolsResult<Json<Cohort>> {
    patch.validate()?;

    let cohort = state
        .update_cohort(id, patch)
        .await
        .map_err(|source| CohortToolsError::from_store(source, "update the cohort"))?
        .context(MissingCohortSnafu { id })?;
    info!(%id, "Updated cohort");

    Ok(Json(cohort))
}

///students that pointed at the cohort keep the reference, it just expands to `null` from now on
pub async fn delete_cohort(
    State(state): State<CohortToolsState>,
    IdPath(id): IdPath,
) -> CohortToolsResult<StatusCode> {
    let existed = state.remove_cohort(id).await.context(StoreSnafu {
        action: "delete the cohort",
    })?;
    info!(%id, existed, "Deleted cohort");

    Ok(StatusCode::NO_CONTENT)
}
