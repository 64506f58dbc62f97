//! 书稿导入引擎
//!
//! 把 TXT / Markdown / EPUB 文件切分为连续编号的章节列表。
//! 库本身不安装日志后端，诊断信息通过 `log` 门面输出

pub mod error;
pub mod parser;

use std::path::Path;

pub use error::{IngestError, Result};
pub use parser::{assign_book, Chapter, ChapterSummary, Parser, ParserRouter};

/// 按格式标记导入一个文件
///
/// # 参数
/// - `format`: 格式标记（"txt"、"md"、"markdown"、"epub"，不区分大小写）
/// - `path`: 文件路径
///
/// # 返回
/// 章节列表，`chapter_number` 从 1 开始连续递增
pub fn ingest(format: &str, path: impl AsRef<Path>) -> Result<Vec<Chapter>> {
    let path = path.as_ref();
    let router = ParserRouter::new();

    match router.route(format)?.parse(path) {
        Ok(chapters) => {
            log::info!("导入完成 {} ({}): {} 章", path.display(), format.trim(), chapters.len());
            Ok(chapters)
        }
        Err(e) => {
            log::warn!("导入失败 {} ({}): {}", path.display(), format.trim(), e);
            Err(e)
        }
    }
}
