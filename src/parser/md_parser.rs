use std::fs::File;
use std::io::{BufRead, BufReader};

use super::*;

/// Markdown 解析器
///
/// 以 `#` 开头的行（任意级别）开启新章节，没有分卷概念
#[derive(Clone)]
pub struct MarkdownParser;

impl MarkdownParser {
    /// 创建新的 Markdown 解析器实例
    pub fn new() -> Self {
        Self
    }

    /// 从行读取器中切分章节
    ///
    /// 第一个标题之前的内容被忽略；全文没有标题时，原文整体作为一个章节。
    /// 不做编码检测，非 UTF-8 字节替换为 U+FFFD
    pub fn parse_reader<R: BufRead>(&self, mut reader: R, source: &Path) -> Result<Vec<Chapter>> {
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut current: Option<(String, String)> = None;
        let mut verbatim = String::new();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| IngestError::unreadable(source, e))?;
            if n == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&raw);

            // 还没有遇到标题时保留原文，用于整体回退
            if chapters.is_empty() && current.is_none() {
                verbatim.push_str(&text);
            }

            let line = text.trim_end_matches('\n').trim_end_matches('\r');
            let trimmed = line.trim();

            if trimmed.starts_with('#') {
                if let Some((title, body)) = current.take() {
                    chapters.push(Self::build_chapter(chapters.len(), title, body));
                }
                let title = trimmed.trim_start_matches('#').trim().to_string();
                current = Some((title, String::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push_str(line);
                body.push('\n');
            }
        }

        // 最后一个章节无条件保存，即使正文为空
        if let Some((title, body)) = current.take() {
            chapters.push(Self::build_chapter(chapters.len(), title, body));
        }

        if chapters.is_empty() {
            let word_count = count_words(&verbatim);
            return Ok(vec![Chapter::new(1, 1, 1, "Chapter 1", verbatim, word_count)]);
        }

        Ok(chapters)
    }

    fn build_chapter(index: usize, title: String, body: String) -> Chapter {
        let number = index as u32 + 1;
        let word_count = count_words(&body);
        Chapter::new(number, 1, number, title, body, word_count)
    }
}

impl Parser for MarkdownParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<Chapter>> {
        let file = File::open(file_path).map_err(|e| IngestError::unreadable(file_path, e))?;

        let chapters = self.parse_reader(BufReader::new(file), file_path)?;
        log::info!("{}: Markdown 解析完成，共 {} 章", file_path.display(), chapters.len());

        Ok(chapters)
    }

    fn supported_formats(&self) -> Vec<&str> {
        vec!["md", "markdown"]
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}
