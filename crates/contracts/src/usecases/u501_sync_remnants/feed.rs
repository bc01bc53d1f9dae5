use serde::{Deserialize, Serialize};

/// Строка прайс-листа поставщика (одна позиция товара)
///
/// Поля хранятся в том виде, в каком пришли из файла: разбор количества
/// и цены выполняется при сверке с каталогом маркетплейса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRow {
    /// Код товара (совпадает с артикулом продавца на площадке)
    pub code: String,
    /// Остаток как в файле: число, ">10" и т.п.
    pub quantity_label: String,
    /// Цена как в файле, например "5'990.00 руб."
    pub price_label: String,
}

impl FeedRow {
    /// Код может прийти числом из таблицы, поэтому принимается все, что приводится к строке
    pub fn new(
        code: impl ToString,
        quantity_label: impl Into<String>,
        price_label: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            quantity_label: quantity_label.into(),
            price_label: price_label.into(),
        }
    }
}
