//! 自然排序比较
//!
//! 把名称中连续的数字当作数值比较，避免 `1, 10, 100, 2` 这种字典序问题。
//! 仅用于 EPUB 回退扫描时对 HTML 文件名排序

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// 按自然顺序比较两个字符串
///
/// 两侧当前字符都是数字时，各自读取完整的数字串：长度不同则较短者在前，
/// 长度相同则逐字符比较。其他字符按码点比较；一侧是另一侧的前缀时较短者在前
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let run_a = take_digits(&mut left);
                let run_b = take_digits(&mut right);
                let ordering = run_a
                    .len()
                    .cmp(&run_b.len())
                    .then_with(|| run_a.cmp(&run_b));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                left.next();
                right.next();
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// `a` 是否按自然顺序排在 `b` 之前
pub fn natural_less(a: &str, b: &str) -> bool {
    natural_cmp(a, b) == Ordering::Less
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}
