/// Форматирует число с разделителями тысяч (точками)
///
/// # Примеры
/// ```ignore
/// assert_eq!(format_number(1234567), "1.234.567");
/// assert_eq!(format_number(42), "42");
/// ```
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Первые 500 символов тела ответа для логов
pub fn preview(body: &str) -> String {
    let preview: String = body.chars().take(500).collect();
    if preview.len() < body.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1.000");
        assert_eq!(format_number(1234567), "1.234.567");
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let body = "x".repeat(600);
        assert_eq!(preview(&body).len(), 503);
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("остатки"), "остатки");
    }
}
