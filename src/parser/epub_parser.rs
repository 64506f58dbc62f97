use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::html_text::{extract_title, strip_tags};
use super::natural_order::natural_cmp;
use super::*;

/// 容器描述文件的固定路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// 读取条目时按声明大小预分配的上限
const MAX_PREALLOCATED_BYTES: u64 = 1 << 20;

/// 回退扫描时排除的文件名关键字
const EXCLUDED_NAME_PARTS: [&str; 3] = ["nav", "cover", "toc"];

/// EPUB 解析器
///
/// 先按 OPF 的 spine 顺序提取章节；一无所获时再扫描压缩包内所有 HTML 文件
#[derive(Clone)]
pub struct EpubParser;

impl EpubParser {
    /// 创建新的 EPUB 解析器实例
    pub fn new() -> Self {
        Self
    }

    /// 从任意可随机访问的数据源解析 EPUB
    pub fn parse_archive<R: Read + Seek>(&self, reader: R) -> Result<Vec<Chapter>> {
        let mut archive = EpubArchive::new(reader)?;

        // 1. container.xml -> OPF 路径
        let container = archive
            .read_text(CONTAINER_PATH)?
            .ok_or_else(|| IngestError::MissingDescriptor(CONTAINER_PATH.to_string()))?;
        let opf_path = parse_container(&container)
            .map(|path| normalize_path(&path))
            .ok_or_else(|| {
                IngestError::MissingDescriptor(format!("{} 中没有可用的 rootfile", CONTAINER_PATH))
            })?;

        // 2. 解析 OPF，格式错误时交给回退扫描
        let opf = archive
            .read_text(&opf_path)?
            .ok_or_else(|| IngestError::MissingDescriptor(format!("OPF 文件不存在: {}", opf_path)))?;
        let package = parse_package(&opf).unwrap_or_else(|e| {
            log::warn!("OPF 解析失败 {}: {}，改为扫描 HTML 文件", opf_path, e);
            Package::default()
        });
        let base_dir = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

        // 3. 按 spine 顺序提取
        let mut chapters = self.chapters_from_spine(&mut archive, &package, base_dir)?;

        // 4. 回退：扫描所有 HTML 文件
        if chapters.is_empty() {
            log::warn!(
                "spine 中没有可用章节 (manifest={}, spine={})，回退到 HTML 文件扫描",
                package.manifest.len(),
                package.spine.len()
            );
            chapters = self.chapters_from_scan(&mut archive)?;
        }

        if chapters.is_empty() {
            return Err(IngestError::NoChaptersFound {
                manifest_entries: package.manifest.len(),
                spine_entries: package.spine.len(),
            });
        }

        Ok(chapters)
    }

    /// 按 spine 顺序提取章节
    ///
    /// 第一个 spine 条目优先使用书名作为标题
    fn chapters_from_spine<R: Read + Seek>(
        &self,
        archive: &mut EpubArchive<R>,
        package: &Package,
        base_dir: &str,
    ) -> Result<Vec<Chapter>> {
        let items: HashMap<&str, &ManifestItem> = package
            .manifest
            .iter()
            .map(|item| (item.id.as_str(), item))
            .collect();
        let mut chapters = Vec::new();

        for (index, idref) in package.spine.iter().enumerate() {
            let Some(item) = items.get(idref.as_str()) else {
                log::debug!("spine 条目 {} 不在 manifest 中", idref);
                continue;
            };
            if !item.media_type.to_lowercase().contains("html") {
                continue;
            }

            let path = resolve_href(base_dir, &item.href);
            let Some(html) = archive.read_text(&path)? else {
                log::warn!("找不到章节文件: {}", path);
                continue;
            };

            let book_title = if index == 0 { package.title.clone() } else { None };
            if let Some(chapter) = build_chapter(chapters.len(), &html, book_title) {
                chapters.push(chapter);
            }
        }

        Ok(chapters)
    }

    /// 扫描压缩包内所有 HTML 文件，按自然顺序提取章节
    fn chapters_from_scan<R: Read + Seek>(
        &self,
        archive: &mut EpubArchive<R>,
    ) -> Result<Vec<Chapter>> {
        let mut names: Vec<String> = archive
            .names
            .iter()
            .filter(|name| is_candidate_html(name))
            .cloned()
            .collect();
        names.sort_by(|a, b| natural_cmp(&normalize_path(a), &normalize_path(b)));

        let mut chapters = Vec::new();
        for name in &names {
            let html = archive.read_entry_text(name)?;
            if let Some(chapter) = build_chapter(chapters.len(), &html, None) {
                chapters.push(chapter);
            }
        }

        Ok(chapters)
    }
}

impl Parser for EpubParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<Chapter>> {
        // 打开 EPUB 文件
        let file = File::open(file_path).map_err(|e| IngestError::unreadable(file_path, e))?;

        let chapters = self.parse_archive(BufReader::new(file))?;
        log::info!("{}: EPUB 解析完成，共 {} 章", file_path.display(), chapters.len());

        Ok(chapters)
    }

    fn supported_formats(&self) -> Vec<&str> {
        vec!["epub"]
    }
}

impl Default for EpubParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 由一个 HTML 文件生成章节，正文为空时返回 None
///
/// 标题顺序：书名（仅第一个 spine 条目）→ `<title>` → `<h1>` → "Chapter N"
fn build_chapter(index: usize, html: &str, book_title: Option<String>) -> Option<Chapter> {
    let text = strip_tags(html);
    if text.trim().is_empty() {
        return None;
    }

    let number = index as u32 + 1;
    let title = book_title
        .or_else(|| extract_title(html))
        .unwrap_or_else(|| format!("Chapter {}", number));
    let word_count = count_chars(&text);

    Some(Chapter::new(number, 1, number, title, text, word_count))
}

fn is_candidate_html(name: &str) -> bool {
    let lower = name.replace('\\', "/").to_lowercase();
    (lower.ends_with(".html") || lower.ends_with(".xhtml"))
        && !EXCLUDED_NAME_PARTS.iter().any(|part| lower.contains(part))
}

/// 压缩包访问封装
///
/// 条目名匹配时忽略路径分隔符差异和大小写。每次只打开一个条目，读完即释放
struct EpubArchive<R> {
    zip: ZipArchive<R>,
    names: Vec<String>,
    /// 规范化路径 -> 条目下标
    exact: HashMap<String, usize>,
    /// 规范化并转小写的路径 -> 条目下标
    folded: HashMap<String, usize>,
}

impl<R: Read + Seek> EpubArchive<R> {
    fn new(reader: R) -> Result<Self> {
        let zip = ZipArchive::new(reader)?;
        let names: Vec<String> = zip.file_names().map(str::to_string).collect();

        // 同名条目以先出现的为准
        let mut exact = HashMap::with_capacity(names.len());
        let mut folded = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let normalized = normalize_path(name);
            folded.entry(normalized.to_lowercase()).or_insert(index);
            exact.entry(normalized).or_insert(index);
        }

        Ok(Self {
            zip,
            names,
            exact,
            folded,
        })
    }

    /// 查找条目下标，先精确匹配再忽略大小写
    fn find(&self, path: &str) -> Option<usize> {
        let target = normalize_path(path);

        self.exact
            .get(&target)
            .or_else(|| self.folded.get(&target.to_lowercase()))
            .copied()
    }

    /// 读取条目文本，条目不存在时返回 None
    fn read_text(&mut self, path: &str) -> Result<Option<String>> {
        match self.find(path) {
            Some(index) => {
                let name = self.names[index].clone();
                self.read_entry_text(&name).map(Some)
            }
            None => Ok(None),
        }
    }

    fn read_entry_text(&mut self, name: &str) -> Result<String> {
        let mut entry = self.zip.by_name(name)?;
        // 声明的大小来自条目头，可能被篡改，预分配设上限
        let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOCATED_BYTES) as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| IngestError::ArchiveCorrupt(format!("读取 {} 失败: {}", name, e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// 规范化压缩包内路径：统一使用 `/`，去掉 `.` 并处理 `..`
fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// 相对 OPF 所在目录解析 href
fn resolve_href(base_dir: &str, href: &str) -> String {
    if base_dir.is_empty() {
        normalize_path(href)
    } else {
        normalize_path(&format!("{}/{}", base_dir, href))
    }
}

/// 从 container.xml 中取第一个 rootfile 的 full-path
fn parse_container(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path") {
                    if !path.trim().is_empty() {
                        return Some(path.trim().to_string());
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::warn!("container.xml 解析失败: {}", e);
                return None;
            }
            _ => {}
        }
        buf.clear();
    }
}

/// OPF 中的 manifest 条目
#[derive(Debug, Clone)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
}

/// OPF 解析结果
#[derive(Debug, Default)]
struct Package {
    title: Option<String>,
    manifest: Vec<ManifestItem>,
    spine: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Metadata,
    Manifest,
    Spine,
}

/// 解析 OPF：书名、manifest 和 spine
///
/// 只按元素的本地名匹配，不校验命名空间
fn parse_package(xml: &str) -> std::result::Result<Package, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut package = Package::default();
    let mut section = Section::Other;
    let mut in_title = false;
    let mut title = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"metadata" => section = Section::Metadata,
                b"manifest" => section = Section::Manifest,
                b"spine" => section = Section::Spine,
                b"title" if section == Section::Metadata && package.title.is_none() => {
                    in_title = true;
                }
                _ => collect_entry(&e, section, &mut package),
            },
            Event::Empty(e) => collect_entry(&e, section, &mut package),
            Event::Text(e) if in_title => title.push_str(&e.unescape()?),
            Event::CData(e) if in_title => {
                title.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"metadata" | b"manifest" | b"spine" => section = Section::Other,
                b"title" if in_title => {
                    in_title = false;
                    let trimmed = title.trim();
                    if !trimmed.is_empty() {
                        package.title = Some(trimmed.to_string());
                    }
                    title.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(package)
}

fn collect_entry(e: &BytesStart<'_>, section: Section, package: &mut Package) {
    match (section, e.local_name().as_ref()) {
        (Section::Manifest, b"item") => {
            if let (Some(id), Some(href)) = (attribute(e, b"id"), attribute(e, b"href")) {
                package.manifest.push(ManifestItem {
                    id,
                    href,
                    media_type: attribute(e, b"media-type").unwrap_or_default(),
                });
            }
        }
        (Section::Spine, b"itemref") => {
            if let Some(idref) = attribute(e, b"idref") {
                package.spine.push(idref);
            }
        }
        _ => {}
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|value| value.into_owned()))
}
