//! Database Records
//!
//! Row types for campaigns, documents, version history, sources, chunk
//! embeddings, and audit entries, with `new()` constructors that stamp
//! RFC 3339 timestamps.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Campaign Record
// ============================================================================

/// Campaign database record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CampaignRecord {
    pub id: String,
    pub name: String,
    pub setting: Option<String>,
    /// Provider-side knowledge-base handle, assigned lazily.
    pub remote_brain_id: Option<String>,
    /// Provider-side conversation handle, assigned lazily.
    pub remote_chat_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CampaignRecord {
    pub fn new(name: String, setting: Option<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            setting,
            remote_brain_id: None,
            remote_chat_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Campaign listing row with its source count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CampaignOverview {
    pub id: String,
    pub name: String,
    pub setting: Option<String>,
    pub source_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Document Records
// ============================================================================

/// Lore document record. `content` is the current working text; prior
/// revisions live in `document_history`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRecord {
    pub id: String,
    pub campaign_id: String,
    pub title: String,
    pub content: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentRecord {
    pub fn new(campaign_id: String, title: String, content: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            campaign_id,
            title,
            content,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Immutable snapshot of a document's prior content
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentHistoryRecord {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub version: i64,
    pub created_at: String,
}

/// History listing row (content omitted)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistorySummary {
    pub id: String,
    pub version: i64,
    pub created_at: String,
}

// ============================================================================
// Source Records
// ============================================================================

/// Campaign-scoped source material record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SourceRecord {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    /// Local path of the uploaded binary, if retained.
    pub file_path: Option<String>,
    /// Extracted text, the input to chunking.
    pub text_content: String,
    /// Provider-side file handle usable in prompts and caches.
    pub file_uri: Option<String>,
    pub mime_type: String,
    pub created_at: String,
}

impl SourceRecord {
    pub fn new(
        campaign_id: String,
        name: String,
        text_content: String,
        file_uri: Option<String>,
        mime_type: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            campaign_id,
            name,
            file_path: None,
            text_content,
            file_uri,
            mime_type,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Library-owned source record, assignable to any campaign
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GlobalSourceRecord {
    pub id: String,
    pub name: String,
    pub file_path: Option<String>,
    pub text_content: String,
    pub file_uri: Option<String>,
    pub mime_type: String,
    pub created_at: String,
}

impl GlobalSourceRecord {
    pub fn new(
        name: String,
        text_content: String,
        file_uri: Option<String>,
        mime_type: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            file_path: None,
            text_content,
            file_uri,
            mime_type,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Copy this library source into a campaign. The copy owns its own
    /// row and chunks; only the `file_uri` ties it back to the original.
    pub fn to_campaign_source(&self, campaign_id: String) -> SourceRecord {
        SourceRecord {
            id: Uuid::new_v4().to_string(),
            campaign_id,
            name: self.name.clone(),
            file_path: self.file_path.clone(),
            text_content: self.text_content.clone(),
            file_uri: self.file_uri.clone(),
            mime_type: self.mime_type.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ============================================================================
// Chunk Record
// ============================================================================

/// Embedded text chunk. The embedding is stored as little-endian f32
/// bytes; never shared across sources.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRecord {
    pub id: String,
    pub source_id: String,
    pub content: String,
    pub embedding: Vec<u8>,
    pub created_at: String,
}

impl ChunkRecord {
    pub fn new(source_id: String, content: String, embedding: &[f32]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id,
            content,
            embedding: embedding_to_blob(embedding),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Decode the stored embedding vector.
    pub fn vector(&self) -> Vec<f32> {
        blob_to_embedding(&self.embedding)
    }
}

/// Encode an embedding vector as little-endian f32 bytes.
pub fn embedding_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode little-endian f32 bytes back into a vector. Trailing bytes
/// that do not form a full f32 are ignored.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

// ============================================================================
// Audit Record
// ============================================================================

/// Audited action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DeleteCampaign,
    DeleteSource,
    DeleteGlobalSource,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DeleteCampaign => "delete_campaign",
            AuditAction::DeleteSource => "delete_source",
            AuditAction::DeleteGlobalSource => "delete_global_source",
        }
    }
}

/// Audit log record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditRecord {
    pub id: String,
    pub action: String,
    pub details: Option<String>,
    pub created_at: String,
}

impl AuditRecord {
    pub fn new(action: AuditAction, details: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action: action.as_str().to_string(),
            details: Some(details),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
