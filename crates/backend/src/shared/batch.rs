use super::error::{SyncError, SyncResult};

/// Разбивает список на пакеты не длиннее `size` с сохранением порядка
///
/// Пакеты выдаются лениво; последний может быть короче. Пустой список дает ноль пакетов.
///
/// # Примеры
/// ```ignore
/// let batches: Vec<&[i32]> = divide(&[1, 2, 3, 4, 5], 2)?.collect();
/// assert_eq!(batches, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
/// ```
pub fn divide<T>(items: &[T], size: usize) -> SyncResult<std::slice::Chunks<'_, T>> {
    if size == 0 {
        return Err(SyncError::InvalidArgument(
            "batch size must be greater than zero".to_string(),
        ));
    }
    Ok(items.chunks(size))
}

/// Количество пакетов, которое даст `divide` для `len` элементов
pub fn batch_count(len: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    len.div_ceil(size)
}
