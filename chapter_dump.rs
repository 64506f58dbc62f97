//! 章节切分检查工具
//!
//! 用法: chapter-dump <format> <path> [--json]
//! 日志级别由 RUST_LOG 控制

use std::path::Path;
use std::process;

use manuscript_ingest::{ingest, Chapter};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    if positional.len() != 2 {
        eprintln!("用法: chapter-dump <format> <path> [--json]");
        process::exit(2);
    }

    let format = positional[0];
    let path = Path::new(positional[1]);

    let chapters = match ingest(format, path) {
        Ok(chapters) => chapters,
        Err(e) => {
            eprintln!("✗ 导入失败: {}", e);
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&chapters) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("✗ 序列化失败: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    print_table(path, &chapters);
}

fn print_table(path: &Path, chapters: &[Chapter]) {
    println!("文件: {:?}", path);
    println!("章节数: {}\n", chapters.len());
    println!("{:>5} {:>4} {:>5} {:>8}  标题", "序号", "卷", "卷内", "字数");

    for chapter in chapters {
        let title = if chapter.is_volume_marker() {
            format!("[{}]", chapter.title)
        } else {
            chapter.title.clone()
        };
        println!(
            "{:>5} {:>4} {:>5} {:>8}  {}",
            chapter.chapter_number,
            chapter.volume_number,
            chapter.volume_chapter_number,
            chapter.word_count,
            title
        );
    }

    let total: usize = chapters.iter().map(|c| c.word_count).sum();
    println!("\n总字数: {}", total);
}
