//! Recorded answer media. The client uploads the audio/video blob it captured;
//! the object key is what gets stored on the answer as `media_url`.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Upper bound on a single recording.
pub const MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024;

/// File extension for an accepted media type. Only audio and video are accepted.
pub fn extension_for(content_type: &str) -> Result<&'static str, AppError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let ext = match essence.as_str() {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" | "video/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        other if other.starts_with("audio/") || other.starts_with("video/") => "bin",
        _ => {
            return Err(AppError::Validation(format!(
                "Unsupported media type '{content_type}'; expected audio/* or video/*"
            )))
        }
    };
    Ok(ext)
}

fn user_prefix(user_id: &str) -> String {
    let safe_user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("media/{safe_user}/")
}

/// Object key for a user's recording.
pub fn media_key(user_id: &str, media_id: Uuid, ext: &str) -> String {
    format!("{}{media_id}.{ext}", user_prefix(user_id))
}

/// Whether a media key was issued to this user by `upload_answer_media`.
pub fn owns_media_key(user_id: &str, key: &str) -> bool {
    key.strip_prefix(&user_prefix(user_id))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}

/// Checks a recording and uploads it. Returns the stored object key.
pub async fn upload_answer_media(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    user_id: &str,
    content_type: &str,
    data: Bytes,
) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded media is empty".to_string()));
    }
    if data.len() > MAX_MEDIA_BYTES {
        return Err(AppError::Validation(format!(
            "Uploaded media exceeds {} MB",
            MAX_MEDIA_BYTES / (1024 * 1024)
        )));
    }
    let ext = extension_for(content_type)?;
    let key = media_key(user_id, Uuid::new_v4(), ext);
    let size = data.len();

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(data))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Media upload failed: {e}")))?;

    info!("Uploaded answer media to s3://{bucket}/{key} ({size} bytes)");
    Ok(key)
}
