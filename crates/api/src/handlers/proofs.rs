//! Handlers for versioned proofs under `/projects/{project_id}/proofs`.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types};
use imprint_core::error::CoreError;
use imprint_core::files::{content_type_for, proof_key, validate_upload, UploadKind};
use imprint_core::permissions::Permission;
use imprint_core::production::{validate_proof_review, ProofStatus};
use imprint_core::signing::SignedUrl;
use imprint_core::types::DbId;
use imprint_db::models::production_project::ProductionProject;
use imprint_db::models::proof_file::{NewProofFile, ProofFile, ReviewProof};
use imprint_db::repositories::{ContactRepo, ProofFileRepo, TenantRepo};
use imprint_mail::templates::{correction_notice, CorrectionNotice};
use serde_json::json;

use super::projects::{download_link, find_project};
use super::upload::read_upload;
use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/proofs
///
/// Multipart upload with `file` and optional `notes`. The proof gets the next
/// version number for the project.
pub async fn upload_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<ProofFile>>)> {
    user.require(Permission::ProductionWrite)?;
    find_project(&state, user.tenant_id, project_id).await?;

    let upload = read_upload(multipart).await?;
    let ext = validate_upload(UploadKind::Proof, &upload.file_name, upload.bytes.len())?;
    let tenant_id = user.tenant_id;

    let proof = ProofFileRepo::create_next_version(&state.pool, tenant_id, project_id, |version| {
        NewProofFile {
            file_name: upload.file_name.clone(),
            storage_key: proof_key(tenant_id, project_id, version, &upload.file_name),
            content_type: content_type_for(&ext).to_string(),
            size_bytes: upload.bytes.len() as i64,
            notes: upload.notes.clone(),
            uploaded_by: Some(user.user_id),
        }
    })
    .await?;

    if let Err(e) = state.file_store.put(&proof.storage_key, &upload.bytes).await {
        if let Err(cleanup) = ProofFileRepo::delete(&state.pool, tenant_id, proof.id).await {
            tracing::error!(proof_id = proof.id, error = %cleanup, "Failed to remove proof row after storage error");
        }
        return Err(e.into());
    }

    tracing::info!(project_id, proof_id = proof.id, version = proof.version, "Proof uploaded");
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPLOAD, entity_types::PROOF_FILE, proof.id).with_details(
            json!({
                "project_id": project_id,
                "version": proof.version,
                "file_name": proof.file_name,
            }),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(proof))))
}

/// GET /api/v1/projects/{project_id}/proofs
///
/// Newest version first.
pub async fn list_proofs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ProofFile>>>> {
    user.require(Permission::ProductionRead)?;
    find_project(&state, user.tenant_id, project_id).await?;

    let proofs = ProofFileRepo::list_for_project(&state.pool, user.tenant_id, project_id).await?;
    Ok(Json(DataResponse::new(proofs)))
}

/// GET /api/v1/projects/{project_id}/proofs/{id}
pub async fn get_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ProofFile>>> {
    user.require(Permission::ProductionRead)?;
    let proof = find_proof(&state, user.tenant_id, project_id, id).await?;
    Ok(Json(DataResponse::new(proof)))
}

/// GET /api/v1/projects/{project_id}/proofs/{id}/url
pub async fn proof_url(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<SignedUrl>>> {
    user.require(Permission::ProductionRead)?;
    let proof = find_proof(&state, user.tenant_id, project_id, id).await?;
    let link = download_link(&state, user.tenant_id, &proof.storage_key)?;
    Ok(Json(DataResponse::new(link)))
}

/// POST /api/v1/projects/{project_id}/proofs/{id}/approve
pub async fn approve_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ProofFile>>> {
    user.require(Permission::ProofsReview)?;

    let proof = find_proof(&state, user.tenant_id, project_id, id).await?;
    validate_proof_review(proof.status)?;

    let reviewed = ProofFileRepo::review(
        &state.pool,
        user.tenant_id,
        project_id,
        id,
        ProofStatus::Approved,
        None,
        user.user_id,
    )
    .await?
    .ok_or_else(|| AppError::stale("Proof"))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::APPROVE, entity_types::PROOF_FILE, id)
            .with_details(json!({ "project_id": project_id, "version": reviewed.version })),
    )
    .await;

    Ok(Json(DataResponse::new(reviewed)))
}

/// POST /api/v1/projects/{project_id}/proofs/{id}/request-corrections
///
/// Requires non-empty `notes`. Emails the project's author when the author
/// contact has an address.
pub async fn request_corrections(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<ReviewProof>,
) -> AppResult<Json<DataResponse<ProofFile>>> {
    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "notes: describe the corrections you need".into(),
            ))
        })?;
    user.require(Permission::ProofsReview)?;

    let project = find_project(&state, user.tenant_id, project_id).await?;
    let proof = find_proof(&state, user.tenant_id, project_id, id).await?;
    validate_proof_review(proof.status)?;

    let reviewed = ProofFileRepo::review(
        &state.pool,
        user.tenant_id,
        project_id,
        id,
        ProofStatus::CorrectionsRequested,
        Some(notes),
        user.user_id,
    )
    .await?
    .ok_or_else(|| AppError::stale("Proof"))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::REQUEST_CORRECTIONS, entity_types::PROOF_FILE, id)
            .with_details(json!({ "project_id": project_id, "version": reviewed.version })),
    )
    .await;

    notify_author(&state, user.tenant_id, &project, &reviewed).await;

    Ok(Json(DataResponse::new(reviewed)))
}

/// Resolve a proof on a live project.
async fn find_proof(
    state: &AppState,
    tenant_id: DbId,
    project_id: DbId,
    id: DbId,
) -> AppResult<ProofFile> {
    find_project(state, tenant_id, project_id).await?;
    ProofFileRepo::find_by_id(&state.pool, tenant_id, project_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Proof", id))
}

/// Send the correction notice to the project's author. Never fails the
/// request; problems are logged.
async fn notify_author(state: &AppState, tenant_id: DbId, project: &ProductionProject, proof: &ProofFile) {
    let Some(author_id) = project.author_contact_id else {
        tracing::debug!(project_id = project.id, "No author on project; skipping correction notice");
        return;
    };

    let lookups = async {
        let author = ContactRepo::find_by_id(&state.pool, tenant_id, author_id).await?;
        let tenant = TenantRepo::find_by_id(&state.pool, tenant_id).await?;
        Ok::<_, sqlx::Error>((author, tenant))
    };
    let (author, tenant) = match lookups.await {
        Ok((Some(author), Some(tenant))) => (author, tenant),
        Ok(_) => return,
        Err(e) => {
            tracing::warn!(project_id = project.id, error = %e, "Could not load correction notice recipients");
            return;
        }
    };
    let Some(email) = author.email.as_deref().filter(|e| !e.is_empty()) else {
        tracing::debug!(contact_id = author_id, "Author has no email; skipping correction notice");
        return;
    };

    let author_name = author.display_name();
    let message = correction_notice(&CorrectionNotice {
        publisher_name: &tenant.name,
        author_email: email,
        author_name: &author_name,
        project_title: &project.title,
        proof_version: proof.version,
        review_notes: proof.review_notes.as_deref(),
    });

    if let Err(e) = state.mailer.send(&message).await {
        tracing::warn!(
            project_id = project.id,
            proof_id = proof.id,
            error = %e,
            "Failed to send correction notice",
        );
    }
}
