//! 文本统计
//!
//! 字数按字符计：中文每个汉字算一个字

/// 字数（Unicode 标量值个数）
pub fn word_count(text: &str) -> usize {
    text.chars().count()
}

/// 行数（空文本为 0）
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_cjk() {
        assert_eq!(word_count("他走进了洞穴"), 6);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("ab c"), 4);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("一\n二\n三"), 3);
    }
}
