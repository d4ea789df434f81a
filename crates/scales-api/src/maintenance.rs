use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::{AppState, AppStateInner};

/// Background task that prunes orphaned uploads.
///
/// A crash between the disk write and the DB commit in an add, or a failed
/// disk delete after a record delete, can leave payloads with no file row.
/// This sweeps the uploads directory on an interval and removes them.
pub async fn run_reconcile_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match reconcile_orphans(&state).await {
            Ok(count) => {
                if count > 0 {
                    info!("Reconcile: removed {} orphaned uploads", count);
                }
            }
            Err(e) => {
                warn!("Reconcile error: {}", e);
            }
        }
    }
}

/// Remove every disk payload whose name no longer appears in any file row.
/// Returns how many were removed.
pub async fn reconcile_orphans(state: &AppStateInner) -> anyhow::Result<usize> {
    let referenced: HashSet<String> = state.db.stored_names()?.into_iter().collect();

    let mut removed = 0;
    for name in state.storage.list().await? {
        if !referenced.contains(&name) {
            state.storage.delete(&name).await?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use scales_db::Database;
    use scales_types::api::{FileUpload, WeightInput};

    use crate::auth;
    use crate::records;
    use crate::storage::Storage;
    use crate::token::TokenService;

    #[tokio::test]
    async fn reconcile_removes_orphans_and_keeps_referenced() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(dir.path().join("uploads")).await.unwrap(),
            tokens: TokenService::new("test-secret", 3600),
        });

        auth::register(&state, "alice", "pw1").unwrap();
        let session = auth::login(&state, "alice", "pw1").unwrap();
        let user_id = session.user.id.to_string();

        records::add_weight(
            &state,
            &user_id,
            &session.token,
            WeightInput {
                date: Some("2024-01-01".into()),
                weight: Some("70".into()),
            },
            vec![FileUpload {
                payload: BASE64.encode(b"kept"),
                name: "kept.jpg".into(),
            }],
        )
        .await
        .unwrap();

        // simulate a crash leftover: payload on disk, no file row
        state.storage.save("orphan.jpg", b"stray").await.unwrap();

        let removed = reconcile_orphans(&state).await.unwrap();
        assert_eq!(removed, 1);
        assert!(state.storage.read("orphan.jpg").await.is_err());
        assert_eq!(state.storage.read("kept.jpg").await.unwrap(), b"kept");

        // idempotent once clean
        assert_eq!(reconcile_orphans(&state).await.unwrap(), 0);
    }
}
