use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};

use super::chapter_detector::{parse_volume_number, ChapterDetector, LineKind};
use super::encoding::{self, DecodingReader};
use super::*;

/// TXT 解析器
///
/// 自动检测编码（UTF-8、GBK、Big5 等），按行识别分卷和章节标题
#[derive(Clone)]
pub struct TxtParser {
    detector: ChapterDetector,
}

impl TxtParser {
    /// 创建新的 TXT 解析器实例
    pub fn new() -> Self {
        Self {
            detector: ChapterDetector::new(),
        }
    }

    /// 从已解码的行读取器中切分章节
    ///
    /// # 参数
    /// - `reader`: UTF-8 行读取器
    /// - `source`: 来源路径，仅用于错误信息
    ///
    /// # 返回
    /// 章节列表，至少包含一个章节
    pub fn parse_reader<R: BufRead>(&self, reader: R, source: &Path) -> Result<Vec<Chapter>> {
        let mut sequence = ChapterSequence::new();

        for line in reader.lines() {
            let line = line.map_err(|e| IngestError::unreadable(source, e))?;

            match self.detector.classify(&line) {
                LineKind::VolumeTitle => sequence.begin_volume(line.trim()),
                LineKind::ChapterTitle => sequence.begin_chapter(line.trim()),
                LineKind::Body => sequence.push_line(&line),
            }
        }

        Ok(sequence.finish())
    }
}

impl Parser for TxtParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<Chapter>> {
        // 1. 打开文件并读取样本
        let mut file = File::open(file_path).map_err(|e| IngestError::unreadable(file_path, e))?;
        let sample = encoding::read_sample(&mut file);

        // 2. 检测编码
        let detected = encoding::detect_encoding(&sample);
        log::debug!("{}: 检测到编码 {}", file_path.display(), detected.name());

        // 3. 回到文件开头，边读边解码
        file.seek(SeekFrom::Start(0))
            .map_err(|e| IngestError::unreadable(file_path, e))?;
        let reader = BufReader::new(DecodingReader::new(file, detected));

        let chapters = self.parse_reader(reader, file_path)?;
        log::info!("{}: TXT 解析完成，共 {} 章", file_path.display(), chapters.len());

        Ok(chapters)
    }

    fn supported_formats(&self) -> Vec<&str> {
        vec!["txt"]
    }
}

impl Default for TxtParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 尚未提交的章节
struct PendingChapter {
    title: String,
    body: String,
}

/// 章节序列构建器
///
/// 章节号在提交时才分配，被丢弃的空章节不会占用编号
struct ChapterSequence {
    chapters: Vec<Chapter>,
    volume_number: u32,
    /// 当前卷内已提交的章节数
    volume_chapter_count: u32,
    pending: Option<PendingChapter>,
    /// 第一个标记之前的文本，只在全文没有任何标记时使用
    preamble: String,
}

impl ChapterSequence {
    fn new() -> Self {
        Self {
            chapters: Vec::new(),
            volume_number: 1,
            volume_chapter_count: 0,
            pending: None,
            preamble: String::new(),
        }
    }

    fn next_chapter_number(&self) -> u32 {
        self.chapters.len() as u32 + 1
    }

    fn begin_volume(&mut self, title: &str) {
        self.flush(false);

        self.volume_number = match parse_volume_number(title) {
            Some(n) => n,
            // 第一个没有卷号的分卷标记默认为第 1 卷
            None if self.chapters.is_empty() && self.volume_number == 1 => 1,
            None => self.volume_number.saturating_add(1),
        };
        self.volume_chapter_count = 0;
        log::debug!("分卷 {}: {}", self.volume_number, title);

        // 分卷页本身也占一个章节号
        let marker = Chapter::new(self.next_chapter_number(), self.volume_number, 0, title, "", 0);
        self.chapters.push(marker);
    }

    fn begin_chapter(&mut self, title: &str) {
        self.flush(false);
        self.pending = Some(PendingChapter {
            title: title.to_string(),
            body: String::new(),
        });
    }

    fn push_line(&mut self, line: &str) {
        let target = match self.pending.as_mut() {
            Some(pending) => &mut pending.body,
            None if self.chapters.is_empty() => &mut self.preamble,
            None => return,
        };
        target.push_str(line);
        target.push('\n');
    }

    /// 提交当前章节
    ///
    /// 非强制提交时，正文为空的章节直接丢弃
    fn flush(&mut self, force: bool) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        if pending.body.trim().is_empty() && !force {
            log::debug!("丢弃空章节: {}", pending.title);
            return;
        }

        self.volume_chapter_count += 1;
        let content = pending.body.trim_end_matches(['\r', '\n']);
        let chapter = Chapter::new(
            self.next_chapter_number(),
            self.volume_number,
            self.volume_chapter_count,
            pending.title,
            content,
            count_words(content),
        );
        self.chapters.push(chapter);
    }

    fn finish(mut self) -> Vec<Chapter> {
        self.flush(true);

        if self.chapters.is_empty() {
            // 没有识别到任何标记，全文作为一个章节
            let word_count = count_words(&self.preamble);
            return vec![Chapter::new(
                1,
                self.volume_number,
                1,
                "Chapter 1",
                self.preamble,
                word_count,
            )];
        }

        self.chapters
    }
}
