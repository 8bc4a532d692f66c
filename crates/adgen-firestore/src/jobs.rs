//! Typed repository for ad job documents.

use tracing::{info, warn};

use adgen_models::{AdJob, JobId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{fields_to_struct, struct_to_fields};

/// Firestore's per-document size limit is ~1 MiB. Jobs referencing media by
/// URL stay far below this; hitting the guard means raw bytes leaked into the
/// document.
const MAX_DOCUMENT_BYTES: usize = 900 * 1024;

/// Repository for one user's ad jobs.
pub struct AdJobRepository {
    client: FirestoreClient,
    user_id: String,
}

impl AdJobRepository {
    /// Create a new job repository.
    pub fn new(client: FirestoreClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    fn collection(&self) -> String {
        format!("users/{}/ad_jobs", self.user_id)
    }

    /// Upsert the job document. Last writer wins; the orchestrator is the
    /// sole writer per job.
    pub async fn save(&self, job: &AdJob) -> FirestoreResult<()> {
        let serialized = serde_json::to_vec(job)?;
        if serialized.len() > MAX_DOCUMENT_BYTES {
            warn!(
                "Refusing to save oversized job document {} ({} bytes)",
                job.job_id,
                serialized.len()
            );
            return Err(FirestoreError::DocumentTooLarge(serialized.len()));
        }

        let fields = struct_to_fields(job)?;
        self.client
            .upsert_document(&self.collection(), job.job_id.as_str(), fields)
            .await?;
        Ok(())
    }

    /// Load a job by ID.
    pub async fn load(&self, job_id: &JobId) -> FirestoreResult<Option<AdJob>> {
        let doc = self
            .client
            .get_document(&self.collection(), job_id.as_str())
            .await?;

        match doc {
            Some(d) => {
                let fields = d.fields.ok_or_else(|| {
                    FirestoreError::InvalidResponse(format!("job {} has no fields", job_id))
                })?;
                Ok(Some(fields_to_struct(&fields)?))
            }
            None => Ok(None),
        }
    }

    /// List this user's jobs, newest first.
    pub async fn list(&self) -> FirestoreResult<Vec<AdJob>> {
        let docs = self.client.list_documents(&self.collection(), 100).await?;

        let mut jobs = Vec::with_capacity(docs.len());
        for doc in docs {
            let Some(fields) = doc.fields else { continue };
            match fields_to_struct::<AdJob>(&fields) {
                Ok(job) => jobs.push(job),
                Err(e) => warn!("Skipping undecodable job document: {}", e),
            }
        }

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        info!("Listed {} ad jobs for user {}", jobs.len(), self.user_id);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgen_models::Segment;

    #[test]
    fn test_job_survives_field_mapping() {
        let mut job = AdJob::new("user-1", "Buy now.", "Buy now.", "character");
        job.segments = vec![Segment {
            index: 0,
            spoken_text: "Buy now.".into(),
            visual_prompt: "medium shot, kitchen".into(),
        }];
        job.character_image_url = Some("https://store/u/j/character_image.png".into());

        let fields = struct_to_fields(&job).unwrap();
        let back: AdJob = fields_to_struct(&fields).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_size_guard_constant_below_firestore_limit() {
        assert!(MAX_DOCUMENT_BYTES < 1024 * 1024);
    }
}
