use serde::{Deserialize, Serialize};

/// Per-file processing status / 文件处理状态
///
/// Terminal states are Processed and Error. The error message lives next to
/// the status on the record (`FileRecord::error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => ProcessingStatus::Processing,
            "processed" => ProcessingStatus::Processed,
            "error" => ProcessingStatus::Error,
            _ => ProcessingStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Processed | ProcessingStatus::Error)
    }
}

/// One uploaded document / 一个已上传的文档
///
/// Metadata fields are immutable after creation. `content` is empty until
/// extraction succeeds and is overwritten as a whole on re-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique id, generated at upload time (uuid v4) / 上传时生成的唯一ID
    pub id: String,
    /// Original file name / 原始文件名
    pub name: String,
    /// Declared MIME type / 声明的MIME类型
    pub declared_type: String,
    /// Size in bytes / 文件大小（字节）
    pub size: i64,
    /// Source modification time, RFC 3339 / 源文件修改时间
    pub last_modified_at: String,
    /// Ingestion time, RFC 3339 / 入库时间
    pub uploaded_at: String,
    /// Extracted text, empty until extraction completes / 提取出的文本
    pub content: String,
    pub status: ProcessingStatus,
    pub error: Option<String>,
}

/// Upload input before a record exists / 上传输入
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub declared_type: String,
    pub last_modified_at: Option<String>,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Processed,
            ProcessingStatus::Error,
        ] {
            assert_eq!(ProcessingStatus::parse(s.as_str()), s);
        }
        assert_eq!(ProcessingStatus::parse("garbage"), ProcessingStatus::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessingStatus::Processed.is_terminal());
        assert!(ProcessingStatus::Error.is_terminal());
        assert!(!ProcessingStatus::Pending.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
    }
}
