//! Proof document storage on an object store.

use axum::body::Bytes;
use opendal::services::{Memory, S3};
use opendal::Operator;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ProofStorageConfig;
use crate::errors::{ApiError, Result};

const PROOF_PREFIX: &str = "fundraiser_proofs";

/// Content types accepted as proof, with the extension they are stored under.
const ACCEPTED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
];

/// One uploaded proof document.
#[derive(Debug, Clone)]
pub struct ProofFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ProofFile {
    fn extension(&self) -> Result<&'static str> {
        let ct = self.content_type.to_ascii_lowercase();
        ACCEPTED_TYPES
            .iter()
            .find(|(mime, _)| *mime == ct)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                ApiError::Validation(format!(
                    "Unsupported proof type {:?} for {}",
                    self.content_type,
                    self.file_name.as_deref().unwrap_or("upload")
                ))
            })
    }
}

#[derive(Clone)]
pub struct ProofStore {
    op: Operator,
    public_base_url: String,
}

impl ProofStore {
    pub fn new(op: Operator, public_base_url: &str) -> Self {
        ProofStore {
            op,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &ProofStorageConfig, public_base_url: &str) -> Result<Self> {
        let op = match cfg {
            ProofStorageConfig::Memory => Operator::new(Memory::default())?.finish(),
            ProofStorageConfig::S3 {
                endpoint,
                bucket,
                region,
                access_key_id,
                secret_access_key,
            } => Operator::new(
                S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .region(region)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key),
            )?
            .finish(),
        };
        Ok(ProofStore::new(op, public_base_url))
    }

    /// Store every file under the fundraiser's prefix and return their
    /// public URLs in upload order.
    ///
    /// All files are type-checked before anything is written. If a write
    /// fails, the objects already written by this call are removed and an
    /// upstream error is returned.
    pub async fn put_all(&self, fundraiser_id: &str, files: Vec<ProofFile>) -> Result<Vec<String>> {
        if files.is_empty() {
            return Err(ApiError::Validation(
                "At least one proof file is required".to_string(),
            ));
        }
        let exts = files
            .iter()
            .map(ProofFile::extension)
            .collect::<Result<Vec<_>>>()?;

        let mut written = Vec::with_capacity(files.len());
        for (file, ext) in files.into_iter().zip(exts) {
            let key = format!("{PROOF_PREFIX}/{fundraiser_id}/{}.{ext}", Uuid::new_v4());
            if let Err(e) = self.op.write(&key, file.bytes).await {
                warn!(fundraiser_id, key = %key, error = %e, "Proof upload failed");
                self.discard(&written).await;
                return Err(ApiError::Upstream("Proof upload failed".to_string()));
            }
            written.push(key);
        }

        info!(fundraiser_id, count = written.len(), "Stored proof documents");
        Ok(written.iter().map(|key| self.public_url(key)).collect())
    }

    /// Read back a stored proof together with its content type.
    pub async fn get(&self, key: &str) -> Result<(Vec<u8>, &'static str)> {
        let ext = key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
        let content_type = ACCEPTED_TYPES
            .iter()
            .find(|(_, e)| *e == ext)
            .map(|(mime, _)| *mime)
            .filter(|_| key.starts_with(PROOF_PREFIX) && !key.contains(".."))
            .ok_or_else(|| ApiError::NotFound("Proof not found".to_string()))?;

        match self.op.read(key).await {
            Ok(buf) => Ok((buf.to_vec(), content_type)),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                Err(ApiError::NotFound("Proof not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.op.delete(key).await {
                warn!(key = %key, error = %e, "Could not remove orphaned proof");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProofStore {
        ProofStore::from_config(&ProofStorageConfig::Memory, "http://files.test/proofs/").unwrap()
    }

    fn file(ct: &str) -> ProofFile {
        ProofFile {
            file_name: Some("doc".to_string()),
            content_type: ct.to_string(),
            bytes: Bytes::from_static(b"proof"),
        }
    }

    #[tokio::test]
    async fn stores_under_fundraiser_prefix() {
        let store = store();
        let urls = store
            .put_all("f1", vec![file("image/png"), file("application/pdf")])
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("http://files.test/proofs/fundraiser_proofs/f1/"));
        assert!(urls[0].ends_with(".png"));
        assert!(urls[1].ends_with(".pdf"));

        let key = urls[0].trim_start_matches("http://files.test/proofs/");
        let (bytes, ct) = store.get(key).await.unwrap();
        assert_eq!(bytes, b"proof");
        assert_eq!(ct, "image/png");
    }

    #[tokio::test]
    async fn rejects_unknown_types_before_writing() {
        let store = store();
        let err = store
            .put_all("f1", vec![file("image/png"), file("text/html")])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let nothing_written = store
            .op
            .list("fundraiser_proofs/f1/")
            .await
            .map(|entries| entries.iter().all(|e| e.path().ends_with('/')))
            .unwrap_or(true);
        assert!(nothing_written);
    }

    #[tokio::test]
    async fn failed_write_removes_objects_already_stored() {
        let (store, objects) = fake_s3::start().await;

        let urls = store.put_all("f1", vec![file("image/png")]).await.unwrap();
        assert_eq!(objects.lock().unwrap().len(), 1);

        let err = store
            .put_all(
                "f1",
                vec![file("image/png"), file("image/webp"), file("application/pdf")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);

        let held: Vec<String> = objects.lock().unwrap().iter().cloned().collect();
        assert_eq!(held.len(), 1);
        assert!(urls[0].ends_with(&held[0]));
    }

    #[tokio::test]
    async fn empty_upload_is_invalid() {
        let err = store().put_all("f1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_or_foreign_keys_are_not_found() {
        let store = store();
        assert!(matches!(
            store.get("fundraiser_proofs/f1/nope.png").await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(store.get("secrets.txt").await, Err(ApiError::NotFound(_))));
    }
}
