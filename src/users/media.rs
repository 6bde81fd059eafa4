use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const AVATAR_PREFIX: &str = "avatars";
pub const COVER_PREFIX: &str = "covers";

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Upload image bytes under a fresh key and return the public URL stored on
/// the user record.
pub async fn upload_image(
    st: &AppState,
    prefix: &str,
    body: Bytes,
    content_type: &str,
) -> ApiResult<String> {
    if body.is_empty() {
        return Err(ApiError::Validation("image file is required".into()));
    }
    let ext = ext_from_mime(content_type)
        .ok_or_else(|| ApiError::Validation(format!("unsupported image type {content_type}")))?;
    let key = format!("{prefix}/{}.{ext}", Uuid::new_v4());
    st.storage
        .put_object(&key, body, content_type)
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?;
    Ok(st.storage.public_url(&key))
}

/// Remove a replaced image. The new reference is already persisted by the
/// time this runs, so a failed delete only leaves an orphan object behind;
/// it is logged and never fails the request.
pub async fn delete_image_best_effort(st: &AppState, url: &str) {
    let Some(key) = st.storage.key_for_url(url) else {
        warn!(url, "old image url does not belong to our bucket, skipping delete");
        return;
    };
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = %e, key, "failed to delete replaced image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{fake_storage::FakeStorage, AppState};
    use std::sync::Arc;

    #[test]
    fn ext_from_mime_known_and_unknown() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/pdf"), None);
    }

    #[tokio::test]
    async fn upload_image_returns_bucket_url() {
        let st = AppState::fake();
        let url = upload_image(&st, AVATAR_PREFIX, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert!(url.starts_with("http://fake.local/test-bucket/avatars/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_image_rejects_empty_body_and_bad_type() {
        let st = AppState::fake();
        let err = upload_image(&st, AVATAR_PREFIX, Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = upload_image(&st, AVATAR_PREFIX, Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_failure_maps_to_upload_error() {
        let mut st = AppState::fake();
        st.storage = Arc::new(FakeStorage {
            fail_put: true,
            ..Default::default()
        });
        let err = upload_image(&st, AVATAR_PREFIX, Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upload(_)));
    }

    #[tokio::test]
    async fn delete_best_effort_swallows_failures() {
        let mut st = AppState::fake();
        st.storage = Arc::new(FakeStorage {
            fail_delete: true,
            ..Default::default()
        });
        // must not panic or error
        delete_image_best_effort(&st, "http://fake.local/test-bucket/avatars/x.png").await;
        delete_image_best_effort(&st, "https://foreign.example/y.png").await;
    }
}
