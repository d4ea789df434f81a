use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::warn;
use uuid::Uuid;

use scales_db::models::NewFile;
use scales_types::api::{FileEntry, FileUpload, WeightEntry, WeightInput};

use crate::auth::AppStateInner;
use crate::error::ApiError;
use crate::storage::Storage;

/// All records owned by `user_id` in insertion order, files resolved inline.
pub fn list_weights(
    state: &AppStateInner,
    user_id: &str,
    token: &str,
) -> Result<Vec<WeightEntry>, ApiError> {
    state.tokens.authorize(token, user_id)?;

    let rows = state.db.list_weights(user_id)?;
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

    // Batch fetch to avoid a files query per record
    let mut files_by_weight: HashMap<String, Vec<FileEntry>> = HashMap::new();
    for file in state.db.get_files_for_weights(&ids)? {
        files_by_weight
            .entry(file.weight_id.clone())
            .or_default()
            .push(FileEntry {
                id: file.id.into(),
                file: file.name,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| WeightEntry {
            files: files_by_weight.remove(&row.id).unwrap_or_default(),
            id: row.id.into(),
            date: row.date,
            weight: row.weight,
        })
        .collect())
}

/// Create a record with its attachments. Payloads are decoded and written to
/// disk first; a failed write fails the whole add, so no file row ever exists
/// without a successful binary write behind it. The record and its file rows
/// then commit in one transaction.
pub async fn add_weight(
    state: &AppStateInner,
    user_id: &str,
    token: &str,
    data: WeightInput,
    uploads: Vec<FileUpload>,
) -> Result<(), ApiError> {
    state.tokens.authorize(token, user_id)?;

    let date = data.date.ok_or(ApiError::Validation("date"))?;
    let weight = parse_weight(data.weight.as_deref())?;

    let mut linked = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        Storage::validate_name(&upload.name)?;
        let bytes = BASE64
            .decode(upload.payload.as_bytes())
            .map_err(|_| ApiError::Validation("file payload"))?;
        state.storage.save(&upload.name, &bytes).await?;
        linked.push(NewFile {
            id: Uuid::new_v4().to_string(),
            name: upload.name.clone(),
        });
    }

    state
        .db
        .create_weight(&Uuid::new_v4().to_string(), user_id, &date, weight, &linked)?;

    Ok(())
}

/// Delete a record and cascade to its files. The DB side is transactional;
/// disk payloads are removed afterwards, best-effort, and only once no other
/// record references the same name. Leftovers fall to the reconciler.
pub async fn delete_weight(
    state: &AppStateInner,
    user_id: &str,
    token: &str,
    id: &str,
) -> Result<(), ApiError> {
    state.tokens.authorize(token, user_id)?;

    let Some(files) = state.db.delete_weight(id, user_id)? else {
        return Err(ApiError::NotFound("record"));
    };

    for file in files {
        remove_unreferenced_payload(state, &file.name).await;
    }

    Ok(())
}

/// Delete a single attachment. Ownership is checked before the row is
/// removed; unknown and foreign ids both read as not found.
pub async fn delete_file(
    state: &AppStateInner,
    user_id: &str,
    token: &str,
    id: &str,
) -> Result<(), ApiError> {
    state.tokens.authorize(token, user_id)?;

    let Some(row) = state.db.delete_file(id, user_id)? else {
        return Err(ApiError::NotFound("file"));
    };

    remove_unreferenced_payload(state, &row.name).await;

    Ok(())
}

/// Replace a record's date and weight wholesale.
pub fn edit_weight(
    state: &AppStateInner,
    user_id: &str,
    token: &str,
    id: &str,
    date: Option<String>,
    weight: Option<String>,
) -> Result<(), ApiError> {
    state.tokens.authorize(token, user_id)?;

    let date = date.ok_or(ApiError::Validation("date"))?;
    let weight = parse_weight(weight.as_deref())?;

    if !state.db.update_weight(id, user_id, &date, weight)? {
        return Err(ApiError::NotFound("record"));
    }

    Ok(())
}

async fn remove_unreferenced_payload(state: &AppStateInner, name: &str) {
    match state.db.name_in_use(name) {
        Ok(true) => {}
        Ok(false) => {
            if let Err(e) = state.storage.delete(name).await {
                warn!("Failed to remove upload {}: {}", name, e);
            }
        }
        Err(e) => warn!("Reference check for upload {} failed: {}", name, e),
    }
}

fn parse_weight(raw: Option<&str>) -> Result<i64, ApiError> {
    raw.and_then(|w| w.trim().parse().ok())
        .ok_or(ApiError::Validation("weight"))
}
