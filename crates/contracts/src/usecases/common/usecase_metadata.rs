/// Метаданные UseCase для идентификации в логах и отчетах
pub trait UseCaseMetadata {
    /// Индекс UseCase (например, "u501")
    fn usecase_index() -> &'static str;

    /// Техническое имя (например, "sync_remnants")
    fn usecase_name() -> &'static str;

    /// Отображаемое имя (например, "Выгрузка остатков и цен")
    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// Полное имя вида "u501_sync_remnants"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
