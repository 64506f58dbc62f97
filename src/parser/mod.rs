use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IngestError, Result};

// 子模块声明
pub mod chapter_detector;
pub mod encoding;
pub mod epub_parser;
pub mod html_text;
pub mod md_parser;
pub mod natural_order;
pub mod txt_parser;

/// 章节数据
///
/// 引擎输出的基本阅读单元。`chapter_number` 在一次导入中从 1 开始连续递增，
/// `volume_chapter_number` 为 0 时表示分卷标记页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 章节 ID（UUID v4）
    pub id: String,
    /// 所属书籍 ID，由调用方分配
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    /// 全书章节序号
    pub chapter_number: u32,
    /// 分卷序号，没有分卷概念的格式固定为 1
    pub volume_number: u32,
    /// 卷内章节序号
    pub volume_chapter_number: u32,
    /// 章节标题
    pub title: String,
    /// 章节正文
    pub content: String,
    /// 字数
    pub word_count: usize,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Chapter {
    /// 创建新章节，自动生成 ID 和创建时间
    pub fn new(
        chapter_number: u32,
        volume_number: u32,
        volume_chapter_number: u32,
        title: impl Into<String>,
        content: impl Into<String>,
        word_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            book_id: None,
            chapter_number,
            volume_number,
            volume_chapter_number,
            title: title.into(),
            content: content.into(),
            word_count,
            created_at: Utc::now(),
        }
    }

    /// 是否为分卷标记页
    pub fn is_volume_marker(&self) -> bool {
        self.volume_chapter_number == 0
    }

    /// 生成不含正文的章节摘要（用于目录列表）
    pub fn summary(&self) -> ChapterSummary {
        ChapterSummary {
            id: self.id.clone(),
            book_id: self.book_id.clone(),
            chapter_number: self.chapter_number,
            volume_number: self.volume_number,
            volume_chapter_number: self.volume_chapter_number,
            title: self.title.clone(),
            word_count: self.word_count,
            created_at: self.created_at,
        }
    }
}

/// 章节摘要
///
/// 与 [`Chapter`] 相同，但不包含正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    pub chapter_number: u32,
    pub volume_number: u32,
    pub volume_chapter_number: u32,
    pub title: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

/// 为尚未归属书籍的章节设置书籍 ID
///
/// 已经带有 `book_id` 的章节保持不变
pub fn assign_book(chapters: &mut [Chapter], book_id: &str) {
    for chapter in chapters.iter_mut().filter(|c| c.book_id.is_none()) {
        chapter.book_id = Some(book_id.to_string());
    }
}

/// 按空白分隔统计词数
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 按 Unicode 码点统计字数
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}

/// Parser trait
///
/// 所有格式解析器必须实现此 trait
pub trait Parser: Send + Sync {
    /// 解析文件
    ///
    /// # 参数
    /// - `file_path`: 要解析的文件路径
    ///
    /// # 返回
    /// 按阅读顺序排列的章节列表，成功时至少包含一个章节
    fn parse(&self, file_path: &Path) -> Result<Vec<Chapter>>;

    /// 获取支持的格式标识列表
    fn supported_formats(&self) -> Vec<&str>;
}

/// Parser 路由器
///
/// 根据格式标识路由到对应的解析器
pub struct ParserRouter {
    /// 格式标识到解析器的映射
    parsers: HashMap<String, Box<dyn Parser>>,
}

impl ParserRouter {
    /// 创建新的路由器实例
    ///
    /// 注册所有可用的解析器
    pub fn new() -> Self {
        let mut parsers: HashMap<String, Box<dyn Parser>> = HashMap::new();

        // 注册 EPUB 解析器
        let epub = Box::new(epub_parser::EpubParser::new());
        for format in epub.supported_formats() {
            parsers.insert(format.to_string(), epub.clone());
        }

        // 注册 TXT 解析器
        let txt = Box::new(txt_parser::TxtParser::new());
        for format in txt.supported_formats() {
            parsers.insert(format.to_string(), txt.clone());
        }

        // 注册 Markdown 解析器
        let md = Box::new(md_parser::MarkdownParser::new());
        for format in md.supported_formats() {
            parsers.insert(format.to_string(), md.clone());
        }

        Self { parsers }
    }

    /// 根据格式标识路由到对应的解析器
    ///
    /// 格式标识忽略大小写和首尾空白
    pub fn route(&self, format: &str) -> Result<&dyn Parser> {
        let key = format.trim().to_lowercase();

        self.parsers
            .get(&key)
            .map(|p| p.as_ref())
            .ok_or_else(|| IngestError::UnsupportedFormat(format.trim().to_string()))
    }

    /// 根据文件扩展名路由到对应的解析器
    pub fn route_path(&self, file_path: &Path) -> Result<&dyn Parser> {
        let ext = file_path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                IngestError::UnsupportedFormat(file_path.display().to_string())
            })?;

        self.route(ext)
    }

    /// 获取所有支持的格式标识
    pub fn supported_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.parsers.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// 检查是否支持指定的格式标识
    pub fn supports(&self, format: &str) -> bool {
        self.parsers.contains_key(&format.trim().to_lowercase())
    }
}

impl Default for ParserRouter {
    fn default() -> Self {
        Self::new()
    }
}
