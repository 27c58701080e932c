//! Worldbook Context - 设定卡片

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::CardError;

/// 卡片 ID（服务端分配，可能是数字也可能是字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => CardId(n.to_string()),
            RawId::Str(s) => CardId(s),
        })
    }
}

/// 卡片类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardType {
    #[default]
    Character,
    Location,
    Item,
    /// 设定 / 概念
    Lore,
    Event,
}

impl CardType {
    pub const ALL: [CardType; 5] = [
        CardType::Character,
        CardType::Location,
        CardType::Item,
        CardType::Lore,
        CardType::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Character => "character",
            CardType::Location => "location",
            CardType::Item => "item",
            CardType::Lore => "lore",
            CardType::Event => "event",
        }
    }

    /// 大小写不敏感；concept 视为 lore
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" => Some(CardType::Character),
            "location" => Some(CardType::Location),
            "item" => Some(CardType::Item),
            "lore" | "concept" => Some(CardType::Lore),
            "event" => Some(CardType::Event),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardType::Character => "角色",
            CardType::Location => "地点",
            CardType::Item => "物品",
            CardType::Lore => "设定",
            CardType::Event => "事件",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardType {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardType::parse(s).ok_or_else(|| CardError::UnknownType(s.to_string()))
    }
}

impl Serialize for CardType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CardType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // 未知类别归入设定，避免整张列表解析失败
        Ok(CardType::parse(&raw).unwrap_or(CardType::Lore))
    }
}

/// 设定卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "category")]
    pub card_type: CardType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 待创建/更新的卡片内容（不含 ID）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CardDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "category")]
    pub card_type: CardType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CardDraft {
    pub fn new(name: impl Into<String>, card_type: CardType) -> Self {
        Self {
            name: name.into(),
            card_type,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// 名称不能为空
    pub fn validate(&self) -> Result<(), CardError> {
        if self.name.trim().is_empty() {
            return Err(CardError::EmptyName);
        }
        Ok(())
    }

    pub fn into_card(self, id: CardId) -> Card {
        Card {
            id,
            name: self.name,
            card_type: self.card_type,
            description: self.description,
            content: self.content,
            tags: self.tags,
        }
    }
}

impl From<Card> for CardDraft {
    fn from(card: Card) -> Self {
        Self {
            name: card.name,
            card_type: card.card_type,
            description: card.description,
            content: card.content,
            tags: card.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_parse() {
        assert_eq!(CardType::parse("Character"), Some(CardType::Character));
        assert_eq!(CardType::parse("concept"), Some(CardType::Lore));
        assert_eq!(CardType::parse("spaceship"), None);
        assert!("spaceship".parse::<CardType>().is_err());
    }

    #[test]
    fn test_card_deserialize_backend_shapes() {
        let json = r#"{"id": 7, "name": "萧炎", "category": "CHARACTER", "tags": ["主角"]}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.id.as_str(), "7");
        assert_eq!(card.card_type, CardType::Character);
        assert_eq!(card.content, "");

        let json = r#"{"id": "c-1", "name": "天云宗", "card_type": "concept"}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.card_type, CardType::Lore);
    }

    #[test]
    fn test_card_serializes_lowercase_type() {
        let draft = CardDraft::new("玄铁剑", CardType::Item);
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["card_type"], "item");
    }

    #[test]
    fn test_draft_validation() {
        assert!(matches!(
            CardDraft::new("  ", CardType::Item).validate(),
            Err(CardError::EmptyName)
        ));
        assert!(CardDraft::new("玄铁剑", CardType::Item).validate().is_ok());
    }
}
