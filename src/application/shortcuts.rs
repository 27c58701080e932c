//! 键盘快捷键分发
//!
//! 按键组合映射到具名动作，交给当前聚焦的编辑器处理。
//! Meta（⌘）与 Ctrl 视为同一个修饰键。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::application::error::ApplicationError;

/// 按键组合
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// 小写按键名，如 "s"、"escape"、"space"
    pub key: String,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            key: normalize_key(&key.into()),
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            ctrl: true,
            ..Self::new(key)
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// 显示形式，如 `⌘/Ctrl+Shift+Z`
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.ctrl {
            parts.push("⌘/Ctrl".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        parts.push(display_key(&self.key));
        parts.join("+")
    }
}

fn normalize_key(key: &str) -> String {
    match key {
        " " => "space".to_string(),
        "esc" | "Esc" => "escape".to_string(),
        other => other.trim().to_lowercase(),
    }
}

fn display_key(key: &str) -> String {
    match key {
        "escape" => "Esc".to_string(),
        "space" => "Space".to_string(),
        k if k.chars().count() == 1 => k.to_uppercase(),
        k => {
            let mut chars = k.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

impl FromStr for KeyChord {
    type Err = ApplicationError;

    /// 解析 "ctrl+shift+z"、"meta+s"、"escape" 之类的字符串
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == " " {
            return Ok(KeyChord::new(" "));
        }

        let mut chord = KeyChord::new("");
        let mut key: Option<String> = None;
        for part in s.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" | "meta" | "cmd" | "⌘" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                "" => {
                    return Err(ApplicationError::validation(format!(
                        "无效的快捷键: {}",
                        s
                    )))
                }
                _ if key.is_some() => {
                    return Err(ApplicationError::validation(format!(
                        "快捷键只能有一个主键: {}",
                        s
                    )))
                }
                _ => key = Some(normalize_key(part)),
            }
        }

        chord.key = key
            .ok_or_else(|| ApplicationError::validation(format!("快捷键缺少主键: {}", s)))?;
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// 编辑器动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShortcutAction {
    Save,
    Undo,
    Redo,
    Search,
    Replace,
    Generate,
    Bold,
    Italic,
    Close,
}

impl ShortcutAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortcutAction::Save => "save",
            ShortcutAction::Undo => "undo",
            ShortcutAction::Redo => "redo",
            ShortcutAction::Search => "search",
            ShortcutAction::Replace => "replace",
            ShortcutAction::Generate => "generate",
            ShortcutAction::Bold => "bold",
            ShortcutAction::Italic => "italic",
            ShortcutAction::Close => "close",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ShortcutAction::Save => "保存",
            ShortcutAction::Undo => "撤销",
            ShortcutAction::Redo => "重做",
            ShortcutAction::Search => "搜索",
            ShortcutAction::Replace => "替换",
            ShortcutAction::Generate => "AI 生成",
            ShortcutAction::Bold => "加粗",
            ShortcutAction::Italic => "斜体",
            ShortcutAction::Close => "关闭面板",
        }
    }
}

/// 当前聚焦的编辑器
pub trait ShortcutHandler {
    /// 返回 true 表示动作已被处理
    fn handle(&mut self, action: ShortcutAction) -> bool;
}

/// 快捷键分发器
pub struct ShortcutDispatcher {
    bindings: HashMap<KeyChord, ShortcutAction>,
}

impl ShortcutDispatcher {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// 默认快捷键表
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.bind(KeyChord::ctrl("s"), ShortcutAction::Save);
        dispatcher.bind(KeyChord::ctrl("z"), ShortcutAction::Undo);
        dispatcher.bind(KeyChord::ctrl("z").with_shift(), ShortcutAction::Redo);
        dispatcher.bind(KeyChord::ctrl("y"), ShortcutAction::Redo);
        dispatcher.bind(KeyChord::ctrl("f"), ShortcutAction::Search);
        dispatcher.bind(KeyChord::ctrl("h"), ShortcutAction::Replace);
        dispatcher.bind(KeyChord::ctrl("g"), ShortcutAction::Generate);
        dispatcher.bind(KeyChord::ctrl("b"), ShortcutAction::Bold);
        dispatcher.bind(KeyChord::ctrl("i"), ShortcutAction::Italic);
        dispatcher.bind(KeyChord::new("escape"), ShortcutAction::Close);
        dispatcher
    }

    /// 绑定（覆盖同一按键组合的旧绑定）
    pub fn bind(&mut self, chord: KeyChord, action: ShortcutAction) {
        self.bindings.insert(chord, action);
    }

    pub fn unbind(&mut self, chord: &KeyChord) -> Option<ShortcutAction> {
        self.bindings.remove(chord)
    }

    pub fn resolve(&self, chord: &KeyChord) -> Option<ShortcutAction> {
        self.bindings.get(chord).copied()
    }

    /// 快捷键列表（显示形式, 动作），按显示形式排序
    pub fn list(&self) -> Vec<(String, ShortcutAction)> {
        let mut list: Vec<(String, ShortcutAction)> = self
            .bindings
            .iter()
            .map(|(chord, action)| (chord.display(), *action))
            .collect();
        list.sort();
        list
    }

    /// 分发按键，只有处理器认领了动作才算消费
    pub fn dispatch(&self, chord: &KeyChord, handler: &mut impl ShortcutHandler) -> bool {
        match self.resolve(chord) {
            Some(action) => {
                let handled = handler.handle(action);
                tracing::trace!(action = action.as_str(), handled, "Shortcut dispatched");
                handled
            }
            None => false,
        }
    }
}

impl Default for ShortcutDispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
