use regex::Regex;

/// 分卷标题的最大长度（按码点计），避免把长句误判为分卷标记
pub const MAX_VOLUME_TITLE_CHARS: usize = 50;

/// 英文章节标题前缀（小写比较）
const CHAPTER_PREFIXES: [&str; 4] = ["chapter ", "chapter:", "ch.", "ch "];

/// 行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// 分卷标题，如 "第一卷"、"卷二 风起"、"Volume 3"
    VolumeTitle,
    /// 章节标题，如 "第一章"、"Chapter 1"、"Ch. 5"
    ChapterTitle,
    /// 正文
    Body,
}

/// 章节检测器
///
/// 对纯文本的每一行做分类：先判断分卷标题，再判断章节标题，其余都是正文
#[derive(Debug, Clone)]
pub struct ChapterDetector {
    /// 英文分卷标题模式（匹配小写后的行）
    volume_en: Regex,
    /// 中文分卷标题模式
    volume_zh: Regex,
}

impl ChapterDetector {
    /// 创建新的章节检测器实例
    ///
    /// 初始化分卷标题匹配模式
    pub fn new() -> Self {
        Self {
            volume_en: Regex::new(r"^(volume|vol\.?)\s*\d+(\s+.+)?$")
                .expect("英文分卷模式无效"),
            volume_zh: Regex::new(r"^(第[\p{Han}\d]+卷|卷[\p{Han}\d]+)(\s+.+)?$")
                .expect("中文分卷模式无效"),
        }
    }

    /// 对一行文本分类
    pub fn classify(&self, line: &str) -> LineKind {
        if self.is_volume_title(line) {
            LineKind::VolumeTitle
        } else if self.is_chapter_title(line) {
            LineKind::ChapterTitle
        } else {
            LineKind::Body
        }
    }

    /// 判断是否为分卷标题
    pub fn is_volume_title(&self, line: &str) -> bool {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.chars().count() > MAX_VOLUME_TITLE_CHARS {
            return false;
        }

        self.volume_en.is_match(&trimmed.to_lowercase()) || self.volume_zh.is_match(trimmed)
    }

    /// 判断是否为章节标题
    ///
    /// 中文标题必须同时包含 "第" 和 "章"，这样 "第二天" 之类的短语不会被误判
    pub fn is_chapter_title(&self, line: &str) -> bool {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return false;
        }

        let lower = trimmed.to_lowercase();
        if CHAPTER_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
            return true;
        }

        trimmed.contains('第') && trimmed.contains('章')
    }
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// 从分卷标题中解析卷号
///
/// 先取第一段连续的阿拉伯数字，没有则取第一段中文数字。解析不出正整数时返回 None
pub fn parse_volume_number(line: &str) -> Option<u32> {
    let digits: String = line
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if let Ok(n) = digits.parse::<u32>() {
        if n > 0 {
            return Some(n);
        }
    }

    let numerals: String = line
        .chars()
        .skip_while(|c| !is_chinese_numeral(*c))
        .take_while(|c| is_chinese_numeral(*c))
        .collect();
    match chinese_numeral_to_int(&numerals) {
        0 => None,
        n => Some(n),
    }
}

/// 把简单的中文数字（"一"、"十二"、"一百零三"）转换为整数
///
/// 只处理个位数字和 十/百/千 三个单位，不支持更复杂的写法
pub fn chinese_numeral_to_int(s: &str) -> u32 {
    let chars: Vec<char> = s.chars().collect();
    let mut total: u32 = 0;
    let mut current: u32 = 0;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(digit) = chinese_digit(c) {
            current = digit;
            if i == chars.len() - 1 {
                total = total.saturating_add(current);
            }
            continue;
        }

        if let Some(unit) = chinese_unit(c) {
            if current == 0 {
                current = 1;
            }
            total = total.saturating_add(current * unit);
            current = 0;
        }
    }

    total
}

fn chinese_digit(c: char) -> Option<u32> {
    match c {
        '零' | '〇' => Some(0),
        '一' => Some(1),
        '二' | '两' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        _ => None,
    }
}

fn chinese_unit(c: char) -> Option<u32> {
    match c {
        '十' => Some(10),
        '百' => Some(100),
        '千' => Some(1000),
        _ => None,
    }
}

fn is_chinese_numeral(c: char) -> bool {
    chinese_digit(c).is_some() || chinese_unit(c).is_some()
}
