use crate::shared::error::{SyncError, SyncResult};

/// Приводит цену из прайс-листа к целому числу рублей в виде строки
///
/// Берется часть до первой точки, из нее удаляется все, кроме цифр.
/// Копейки отбрасываются без округления: `"5'990.00 руб."` -> `"5990"`.
/// Запятая дробной частью не считается, ее цифры остаются в результате:
/// `"5990,50 руб."` -> `"599050"`. Так прайс-лист поставщика размечен всегда,
/// поведение сохранено намеренно.
pub fn normalize_price(label: &str) -> String {
    let integer_part = label.split('.').next().unwrap_or_default();
    integer_part.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// То же, что `normalize_price`, но сразу в число
pub fn parse_price(label: &str) -> SyncResult<u64> {
    let digits = normalize_price(label);
    if digits.is_empty() {
        return Err(SyncError::Parse(format!(
            "price '{}' contains no digits",
            label
        )));
    }
    digits
        .parse::<u64>()
        .map_err(|e| SyncError::Parse(format!("price '{}': {}", label, e)))
}
