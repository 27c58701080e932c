//! 搜索替换面板
//!
//! 只在内存中的文本上工作。查询按字面量匹配（特殊字符会被转义），
//! 可选区分大小写。

use regex::{NoExpand, Regex, RegexBuilder};

/// 单个匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// 字节偏移
    pub start: usize,
    /// 字节长度
    pub len: usize,
    /// 字符偏移（用于显示）
    pub char_start: usize,
    pub text: String,
}

impl SearchMatch {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPanel {
    query: String,
    replacement: String,
    case_sensitive: bool,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

impl SearchPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn set_replacement(&mut self, replacement: impl Into<String>) {
        self.replacement = replacement.into();
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }

    fn build_regex(&self) -> Option<Regex> {
        if self.is_blank() {
            return None;
        }
        RegexBuilder::new(&regex::escape(&self.query))
            .case_insensitive(!self.case_sensitive)
            .build()
            .ok()
    }

    /// 重新扫描文本，游标回到第一个匹配
    pub fn search(&mut self, text: &str) -> usize {
        self.matches = match self.build_regex() {
            Some(regex) => regex
                .find_iter(text)
                .map(|m| SearchMatch {
                    start: m.start(),
                    len: m.len(),
                    char_start: text[..m.start()].chars().count(),
                    text: m.as_str().to_string(),
                })
                .collect(),
            None => Vec::new(),
        };
        self.current = if self.matches.is_empty() { None } else { Some(0) };
        self.matches.len()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.current.and_then(|i| self.matches.get(i))
    }

    /// 下一个匹配（越过末尾回到第一个）
    pub fn next(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let len = self.matches.len();
        self.current = Some(self.current.map_or(0, |i| (i + 1) % len));
        self.current()
    }

    /// 上一个匹配（越过开头回到最后一个）
    pub fn prev(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let len = self.matches.len();
        self.current = Some(self.current.map_or(len - 1, |i| (i + len - 1) % len));
        self.current()
    }

    /// 替换当前匹配，返回新的完整文本
    ///
    /// 文本已变化、匹配位置失效时返回 None，调用方需要重新 search
    pub fn replace_current(&self, text: &str) -> Option<String> {
        let m = self.current()?;
        let found = text.get(m.start..m.end())?;
        let still_matches = if self.case_sensitive {
            found == m.text
        } else {
            found.to_lowercase() == m.text.to_lowercase()
        };
        if !still_matches {
            return None;
        }

        let mut replaced = String::with_capacity(text.len() + self.replacement.len());
        replaced.push_str(&text[..m.start]);
        replaced.push_str(&self.replacement);
        replaced.push_str(&text[m.end()..]);
        Some(replaced)
    }

    /// 全部替换，返回新的完整文本
    ///
    /// 空查询返回 None；不会更新匹配列表
    pub fn replace_all(&self, text: &str) -> Option<String> {
        let regex = self.build_regex()?;
        Some(
            regex
                .replace_all(text, NoExpand(&self.replacement))
                .into_owned(),
        )
    }

    /// 计数徽标，如 "2/3"，无匹配时为 "0"
    pub fn summary(&self) -> String {
        match self.current {
            Some(i) if !self.matches.is_empty() => format!("{}/{}", i + 1, self.matches.len()),
            _ => "0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_cjk_offsets_and_wrap() {
        let text = "小龙恐龙龙";
        let mut panel = SearchPanel::new();
        panel.set_query("龙");
        assert_eq!(panel.search(text), 3);

        let starts: Vec<usize> = panel.matches().iter().map(|m| m.char_start).collect();
        assert_eq!(starts, vec![1, 3, 4]);
        let bytes: Vec<usize> = panel.matches().iter().map(|m| m.start).collect();
        assert_eq!(bytes, vec![3, 9, 12]);

        assert_eq!(panel.current_index(), Some(0));
        panel.next();
        panel.next();
        assert_eq!(panel.current_index(), Some(2));
        panel.next();
        assert_eq!(panel.current_index(), Some(0));
        panel.prev();
        assert_eq!(panel.current_index(), Some(2));
        assert_eq!(panel.summary(), "3/3");
    }

    #[test]
    fn test_special_characters_are_literal() {
        let mut panel = SearchPanel::new();
        panel.set_query("a.b");
        assert_eq!(panel.search("a.b axb a.b"), 2);

        panel.set_query("(?i)x");
        assert_eq!(panel.search("(?i)x X"), 1);
    }

    #[test]
    fn test_case_toggle() {
        let mut panel = SearchPanel::new();
        panel.set_query("hero");
        assert_eq!(panel.search("Hero hero HERO"), 3);
        panel.set_case_sensitive(true);
        assert_eq!(panel.search("Hero hero HERO"), 1);
    }

    #[test]
    fn test_replace_current() {
        let text = "龙吟，龙啸";
        let mut panel = SearchPanel::new();
        panel.set_query("龙");
        panel.set_replacement("虎");
        panel.search(text);
        panel.next();

        assert_eq!(panel.replace_current(text).as_deref(), Some("龙吟，虎啸"));
        assert_eq!(panel.replace_current("完全不同的文本"), None);
    }

    #[test]
    fn test_replace_all_edge_cases() {
        let mut panel = SearchPanel::new();
        panel.set_replacement("x");
        assert_eq!(panel.replace_all("abc"), None);

        panel.set_query("   ");
        assert_eq!(panel.replace_all("abc"), None);
        assert_eq!(panel.search("abc"), 0);

        panel.set_query("zzz");
        assert_eq!(panel.replace_all("abc").as_deref(), Some("abc"));

        panel.set_query("A");
        panel.set_replacement("$0-");
        assert_eq!(panel.replace_all("banana").as_deref(), Some("b$0-n$0-n$0-"));
    }

    #[test]
    fn test_empty_panel_navigation() {
        let mut panel = SearchPanel::new();
        assert!(panel.next().is_none());
        assert!(panel.prev().is_none());
        assert_eq!(panel.summary(), "0");
    }
}
