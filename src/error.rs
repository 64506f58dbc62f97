use std::io;
use std::path::PathBuf;

/// 导入流程的结果类型
pub type Result<T> = std::result::Result<T, IngestError>;

/// 导入错误
///
/// 所有错误都直接返回给调用方，引擎内部不做重试
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 未识别的格式标识
    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    /// 打开或读取文件失败
    #[error("读取文件失败 {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 压缩包或结构化标记损坏
    #[error("EPUB 文件损坏: {0}")]
    ArchiveCorrupt(String),

    /// 压缩包可以打开，但缺少容器描述或 OPF 清单
    #[error("缺少必需的描述文件: {0}")]
    MissingDescriptor(String),

    /// 结构合法但所有回退策略之后仍没有章节
    #[error("EPUB 中未找到章节 (manifest={manifest_entries}, spine={spine_entries})")]
    NoChaptersFound {
        manifest_entries: usize,
        spine_entries: usize,
    },
}

impl IngestError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileUnreadable {
            path: path.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ArchiveCorrupt(err.to_string())
    }
}
