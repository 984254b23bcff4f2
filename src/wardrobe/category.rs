use std::fmt;

/// The ten fixed clothing categories. Each one owns a storage folder named
/// after its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Top,
    Bottom,
    Outerwear,
    Dress,
    Shoes,
    Bag,
    Hat,
    Socks,
    Accessory,
    Special,
}

impl Category {
    /// Keyword match order. `Special` is last and doubles as the fallback.
    pub const ALL: [Category; 10] = [
        Category::Top,
        Category::Bottom,
        Category::Outerwear,
        Category::Dress,
        Category::Shoes,
        Category::Bag,
        Category::Hat,
        Category::Socks,
        Category::Accessory,
        Category::Special,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Top => "上衣",
            Category::Bottom => "下身",
            Category::Outerwear => "外套",
            Category::Dress => "洋裝",
            Category::Shoes => "鞋子",
            Category::Bag => "包包",
            Category::Hat => "帽子",
            Category::Socks => "襪子",
            Category::Accessory => "飾品",
            Category::Special => "特殊",
        }
    }

    /// Folder name under the wardrobe root.
    pub fn folder(self) -> &'static str {
        self.label()
    }

    pub fn from_label(label: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Turns a classifier's free-text answer into a [`Category`].
pub trait CategoryLabeler: Send + Sync {
    fn label_to_category(&self, text: &str) -> Category;
}

/// First declared keyword contained in the text wins; no match means `Special`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordLabeler;

impl CategoryLabeler for KeywordLabeler {
    fn label_to_category(&self, text: &str) -> Category {
        route(text)
    }
}

pub fn route(text: &str) -> Category {
    Category::ALL
        .into_iter()
        .find(|c| text.contains(c.label()))
        .unwrap_or(Category::Special)
}
