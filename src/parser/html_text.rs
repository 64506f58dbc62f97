use std::sync::LazyLock;

use regex::Regex;

/// 去除 HTML 标签，返回可见文本
///
/// 不是校验型解析器：`<` 到 `>` 之间的内容全部丢弃，并在 `>` 处补一个空格，
/// 随后合并连续空白并解码 HTML 实体
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    html_escape::decode_html_entities(&collapsed).into_owned()
}

/// `<title>` 元素；自闭合的 `<title/>` 不匹配
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title(?:\s[^>]*[^/>])?\s*>(.*?)</title\s*>").expect("title 模式无效"));

/// 第一个 `<h1>` 元素
static H1_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1(?:\s[^>]*[^/>])?\s*>(.*?)</h1\s*>").expect("h1 模式无效"));

/// 从 HTML 内容中提取章节标题
///
/// 直接在源文本上匹配，不做 HTML5 解析：XHTML 里的 `<title/>` 在 HTML5 规则下会吞掉整个文档。
/// 优先使用 `<title>`，没有则使用 `<h1>`，两者都为空时返回 None
pub fn extract_title(html: &str) -> Option<String> {
    [&*TITLE_PATTERN, &*H1_PATTERN].iter().find_map(|pattern| {
        let inner = pattern.captures(html)?.get(1)?.as_str();
        let text = strip_tags(inner);
        (!text.is_empty()).then_some(text)
    })
}
