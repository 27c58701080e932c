//! Worldbook Context - 客户端过滤
//!
//! 类别过滤与关键字过滤按逻辑与组合

use std::collections::HashMap;

use super::{Card, CardType};

/// 类别过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CardType),
}

impl CategoryFilter {
    /// "all" 或具体类别名
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(CategoryFilter::All);
        }
        CardType::parse(s).map(CategoryFilter::Only)
    }

    pub fn matches(&self, card_type: CardType) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(t) => *t == card_type,
        }
    }
}

/// 卡片过滤条件
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub category: CategoryFilter,
    pub query: String,
}

impl CardFilter {
    pub fn new(category: CategoryFilter, query: impl Into<String>) -> Self {
        Self {
            category,
            query: query.into(),
        }
    }

    /// 关键字大小写不敏感，匹配名称、内容、标签
    pub fn matches(&self, card: &Card) -> bool {
        if !self.category.matches(card.card_type) {
            return false;
        }

        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();

        card.name.to_lowercase().contains(&query)
            || card.content.to_lowercase().contains(&query)
            || card.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    pub fn apply<'a>(&self, cards: &'a [Card]) -> Vec<&'a Card> {
        cards.iter().filter(|c| self.matches(c)).collect()
    }
}

/// 各类别计数（None 键表示全部）
pub fn category_counts(cards: &[Card]) -> HashMap<Option<CardType>, usize> {
    let mut counts = HashMap::new();
    counts.insert(None, cards.len());
    for card_type in CardType::ALL {
        counts.insert(
            Some(card_type),
            cards.iter().filter(|c| c.card_type == card_type).count(),
        );
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::worldbook::CardId;

    fn card(id: &str, name: &str, card_type: CardType, content: &str, tags: &[&str]) -> Card {
        Card {
            id: CardId::new(id),
            name: name.to_string(),
            card_type,
            description: String::new(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn cards() -> Vec<Card> {
        vec![
            card("1", "Lin Feng", CardType::Character, "少年剑客", &["主角"]),
            card("2", "青云山", CardType::Location, "Lin Feng 的师门", &[]),
            card("3", "玄铁剑", CardType::Item, "重剑无锋", &["Weapon"]),
        ]
    }

    #[test]
    fn test_category_and_query_compose_as_and() {
        let cards = cards();
        let filter = CardFilter::new(CategoryFilter::All, "lin feng");
        assert_eq!(filter.apply(&cards).len(), 2);

        let filter = CardFilter::new(CategoryFilter::Only(CardType::Location), "lin feng");
        let visible = filter.apply(&cards);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "青云山");
    }

    #[test]
    fn test_query_matches_tags_case_insensitive() {
        let cards = cards();
        let filter = CardFilter::new(CategoryFilter::All, "WEAPON");
        assert_eq!(filter.apply(&cards)[0].id.as_str(), "3");
    }

    #[test]
    fn test_blank_query_matches_category_only() {
        let cards = cards();
        let filter = CardFilter::new(CategoryFilter::Only(CardType::Item), "  ");
        assert_eq!(filter.apply(&cards).len(), 1);
        assert_eq!(CardFilter::default().apply(&cards).len(), 3);
    }

    #[test]
    fn test_category_counts() {
        let counts = category_counts(&cards());
        assert_eq!(counts[&None], 3);
        assert_eq!(counts[&Some(CardType::Character)], 1);
        assert_eq!(counts[&Some(CardType::Event)], 0);
    }

    #[test]
    fn test_parse_category_filter() {
        assert_eq!(CategoryFilter::parse("ALL"), Some(CategoryFilter::All));
        assert_eq!(
            CategoryFilter::parse("concept"),
            Some(CategoryFilter::Only(CardType::Lore))
        );
        assert_eq!(CategoryFilter::parse("x"), None);
    }
}
