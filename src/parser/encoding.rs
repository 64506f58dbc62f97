//! 文本编码检测与流式解码
//!
//! 只读取文件开头的一段样本判断编码，剩余内容在按行读取时增量解码，
//! 不会一次性把整个文件读入内存。检测失败时一律回退到 UTF-8

use std::io::{self, Read};

use chardetng::EncodingDetector;
use encoding_rs::{CoderResult, Decoder, Encoding, BIG5, GB18030, UTF_8, WINDOWS_1252};

/// 编码检测读取的样本大小
pub const ENCODING_SAMPLE_SIZE: usize = 4096;

const INPUT_CHUNK: usize = 8 * 1024;
const OUTPUT_CHUNK: usize = 16 * 1024;

/// 检测字节样本的编码
///
/// 1. BOM 优先
/// 2. 合法的 UTF-8（含纯 ASCII）直接返回 UTF-8
/// 3. 统计检测（chardetng）得到候选字符集名称
/// 4. 按名称映射到解码器，未知名称再按标签查找，最后回退 UTF-8
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_length)) = Encoding::for_bom(sample) {
        return encoding;
    }

    // 样本末尾被截断的多字节序列不算错误
    match std::str::from_utf8(sample) {
        Ok(_) => return UTF_8,
        Err(e) if e.error_len().is_none() => return UTF_8,
        Err(_) => {}
    }

    let mut detector = EncodingDetector::new();
    // 样本可能在多字节字符中间被截断，所以不作为最后一块
    detector.feed(sample, false);
    let guess = detector.guess(None, true);

    encoding_from_name(guess.name()).unwrap_or(UTF_8)
}

/// 将常见的字符集名称映射为解码器
///
/// GBK / GB2312 统一按超集 GB18030 解码
pub fn encoding_from_name(name: &str) -> Option<&'static Encoding> {
    match name.trim().to_lowercase().as_str() {
        "utf-8" | "utf8" => Some(UTF_8),
        "big5" | "big5-hkscs" => Some(BIG5),
        "gbk" | "gb2312" | "gb-18030" | "gb18030" | "gb_18030" => Some(GB18030),
        "windows-1252" | "cp1252" => Some(WINDOWS_1252),
        other => Encoding::for_label(other.as_bytes()),
    }
}

/// 从读取器开头读取编码检测样本
///
/// 读取失败时返回已经读到的部分，调用方据此回退 UTF-8
pub fn read_sample<R: Read>(reader: &mut R) -> Vec<u8> {
    let mut sample = Vec::with_capacity(ENCODING_SAMPLE_SIZE);
    if let Err(e) = reader
        .by_ref()
        .take(ENCODING_SAMPLE_SIZE as u64)
        .read_to_end(&mut sample)
    {
        log::warn!("读取编码检测样本失败，按 UTF-8 处理: {}", e);
    }
    sample
}

/// 增量解码读取器
///
/// 把任意编码的字节流转换为 UTF-8 字节流，可以直接包在 `BufReader` 里按行读取。
/// 无法解码的字节替换为 U+FFFD，BOM 会被自动去掉
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    input: Vec<u8>,
    input_pos: usize,
    input_len: usize,
    output: Vec<u8>,
    output_pos: usize,
    output_len: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder(),
            input: vec![0; INPUT_CHUNK],
            input_pos: 0,
            input_len: 0,
            output: vec![0; OUTPUT_CHUNK],
            output_pos: 0,
            output_len: 0,
            eof: false,
            finished: false,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.output_pos < self.output_len {
                let available = &self.output[self.output_pos..self.output_len];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.output_pos += n;
                return Ok(n);
            }

            if self.finished {
                return Ok(0);
            }

            if self.input_pos == self.input_len && !self.eof {
                let n = self.inner.read(&mut self.input)?;
                self.input_pos = 0;
                self.input_len = n;
                self.eof = n == 0;
            }

            let (result, read, written, _had_errors) = self.decoder.decode_to_utf8(
                &self.input[self.input_pos..self.input_len],
                &mut self.output,
                self.eof,
            );
            self.input_pos += read;
            self.output_pos = 0;
            self.output_len = written;

            if self.eof && result == CoderResult::InputEmpty {
                self.finished = true;
            }
        }
    }
}
