use api::ObjectId;
use common::upstream::UpstreamError;
use common::GatewayError;

use crate::state::AppState;

const MAX_ATTEMPTS: u32 = 3;

/// Copies `object_id` into the configured archive channel, retrying up to
/// three times when the upstream is rate-limiting the copy. Public links
/// address the copy's id, never the (possibly ephemeral) source message.
///
/// Any existing link still pointing at `object_id` (from before it was
/// archived, or from a re-upload that replaced the source message) is
/// retagged to the freshly archived id so the link keeps resolving against
/// the stable copy instead of the ephemeral source.
pub async fn copy_to_archive(state: &AppState, object_id: ObjectId) -> Result<ObjectId, GatewayError> {
    let mut attempt = 0u32;

    let archive_id = loop {
        match state
            .upstream
            .copy_to_archive(object_id, state.config.bin_channel)
            .await
        {
            Ok(archive_id) => break archive_id,
            Err(UpstreamError::RateLimited { wait_seconds }) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(GatewayError::UpstreamFlood { wait_secs: wait_seconds });
                }
                tracing::debug!(attempt, wait_seconds, "copy-to-archive rate limited, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(wait_seconds)).await;
            }
            Err(err) => return Err(GatewayError::from(err)),
        }
    };

    for mut record in state.link_store.find_by_object(object_id).await? {
        record.object_id = archive_id;
        state.link_store.put(record).await?;
    }

    Ok(archive_id)
}
