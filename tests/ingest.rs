use std::io::Write;

use manuscript_ingest::{assign_book, ingest, Chapter, IngestError, ParserRouter};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn assert_dense(chapters: &[Chapter]) {
    assert!(!chapters.is_empty());
    for (i, chapter) in chapters.iter().enumerate() {
        assert_eq!(chapter.chapter_number as usize, i + 1);
    }
}

fn write_epub(path: &std::path::Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let entries = [
        (
            "META-INF/container.xml",
            r#"<?xml version="1.0"?><container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><rootfiles><rootfile full-path="OPS/book.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#,
        ),
        (
            "OPS/book.opf",
            r#"<?xml version="1.0"?><package xmlns="http://www.idpf.org/2007/opf"><metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>测试之书</dc:title></metadata><manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/><item id="b" href="b.xhtml" media-type="application/xhtml+xml"/></manifest><spine><itemref idref="a"/><itemref idref="b"/></spine></package>"#,
        ),
        ("OPS/a.xhtml", "<html><head><title>扉页</title></head><body><p>献给读者</p></body></html>"),
        ("OPS/b.xhtml", "<html><head><title>第一章</title></head><body><p>故事开始</p></body></html>"),
    ];
    for (name, content) in entries {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_ingest_all_formats() {
    let dir = tempfile::tempdir().unwrap();

    let txt = dir.path().join("book.txt");
    std::fs::write(&txt, "第一卷 开端\n第一章 出发\n正文一\n第二章 途中\n正文二\n第二卷\n第一章 归来\n正文三\n").unwrap();
    let chapters = ingest("txt", &txt).unwrap();
    assert_dense(&chapters);
    assert_eq!(chapters.len(), 5);
    assert!(chapters[0].is_volume_marker());
    assert_eq!(chapters[3].volume_number, 2);
    assert_eq!(chapters[4].volume_chapter_number, 1);

    let md = dir.path().join("book.md");
    std::fs::write(&md, "# 序\n前言\n## 第一章\n正文\n").unwrap();
    let chapters = ingest("markdown", &md).unwrap();
    assert_dense(&chapters);
    assert_eq!(chapters[1].title, "第一章");

    let epub = dir.path().join("book.epub");
    write_epub(&epub);
    let chapters = ingest("EPUB", &epub).unwrap();
    assert_dense(&chapters);
    assert_eq!(chapters[0].title, "测试之书");
    assert_eq!(chapters[1].title, "第一章");
    assert!(chapters[1].content.contains("故事开始"));
}

#[test]
fn test_router_dispatch_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.MD");
    std::fs::write(&path, "# 标题\n内容\n").unwrap();

    let router = ParserRouter::new();
    let mut chapters = router.route_path(&path).unwrap().parse(&path).unwrap();
    assign_book(&mut chapters, "book-1");
    assert!(chapters.iter().all(|c| c.book_id.as_deref() == Some("book-1")));
}

#[test]
fn test_ingest_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.txt");
    assert!(matches!(ingest("txt", &missing), Err(IngestError::FileUnreadable { .. })));

    let broken = dir.path().join("broken.epub");
    std::fs::write(&broken, "not a zip").unwrap();
    assert!(matches!(ingest("epub", &broken), Err(IngestError::ArchiveCorrupt(_))));

    assert!(matches!(ingest("docx", &broken), Err(IngestError::UnsupportedFormat(_))));
}
