use async_trait::async_trait;
use calamine::{Data, Range, Reader};
use contracts::usecases::u501_sync_remnants::FeedRow;
use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

use crate::shared::error::{SyncError, SyncResult};

/// Сколько строк в начале файла просматривается в поисках заголовка таблицы
const HEADER_SEARCH_ROWS: usize = 100;

/// Сигнатура ZIP-архива (и книг .xlsx)
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Сигнатура составного документа OLE (книги .xls)
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Файл, по которому ZIP-пакет опознается как книга .xlsx
const XLSX_MARKER: &str = "[Content_Types].xml";

/// Поддерживаемые форматы файла внутри архива
const FEED_EXTENSIONS: [&str; 3] = [".xls", ".xlsx", ".csv"];

/// Источник строк прайс-листа
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed_rows(&self) -> SyncResult<Vec<FeedRow>>;
}

/// Разметка выгрузки остатков поставщика
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLayout {
    /// Имя файла внутри архива; если не задано, берется первый .xls/.xlsx/.csv
    pub entry: Option<String>,
    /// Номер строки заголовка (с нуля, считая от начала листа);
    /// если не задан, заголовок ищется по названиям колонок
    pub header_row: Option<usize>,
    /// Разделитель для CSV
    pub delimiter: u8,
    pub code_column: String,
    pub quantity_column: String,
    pub price_column: String,
}

impl Default for FeedLayout {
    fn default() -> Self {
        Self {
            entry: Some("ostatki.xls".to_string()),
            header_row: Some(17),
            delimiter: b';',
            code_column: "Код".to_string(),
            quantity_column: "Количество".to_string(),
            price_column: "Цена".to_string(),
        }
    }
}

/// Скачивает архив с остатками по HTTP
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
    layout: FeedLayout,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, layout: FeedLayout, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::FeedUnavailable(format!("cannot create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            layout,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed_rows(&self) -> SyncResult<Vec<FeedRow>> {
        tracing::info!("Downloading feed from {}", self.url);

        let unavailable =
            |e: reqwest::Error| SyncError::FeedUnavailable(format!("{}: {}", self.url, e));
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;
        let bytes = response.bytes().await.map_err(unavailable)?;

        tracing::info!("Feed downloaded: {} bytes", bytes.len());
        parse_feed_bytes(&bytes, &self.layout)
    }
}

/// Читает выгрузку (.xls, .xlsx, .csv или .zip с одним из них) с диска
pub struct FileFeedSource {
    path: PathBuf,
    layout: FeedLayout,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>, layout: FeedLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch_feed_rows(&self) -> SyncResult<Vec<FeedRow>> {
        tracing::info!("Reading feed from {}", self.path.display());
        let bytes = std::fs::read(&self.path).map_err(|e| {
            SyncError::FeedUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        parse_feed_bytes(&bytes, &self.layout)
    }
}

/// Разбирает выгрузку: архив распаковывается, книга Excel или CSV читается как есть
pub fn parse_feed_bytes(bytes: &[u8], layout: &FeedLayout) -> SyncResult<Vec<FeedRow>> {
    if bytes.starts_with(ZIP_MAGIC) && !is_xlsx_package(bytes) {
        let data = extract_entry(bytes, layout.entry.as_deref())?;
        parse_feed_document(&data, layout)
    } else {
        parse_feed_document(bytes, layout)
    }
}

fn parse_feed_document(data: &[u8], layout: &FeedLayout) -> SyncResult<Vec<FeedRow>> {
    if data.starts_with(OLE_MAGIC) || (data.starts_with(ZIP_MAGIC) && is_xlsx_package(data)) {
        parse_feed_workbook(data, layout)
    } else {
        parse_feed_csv(data, layout)
    }
}

fn is_xlsx_package(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.index_for_name(XLSX_MARKER).is_some())
        .unwrap_or(false)
}

fn extract_entry(bytes: &[u8], entry: Option<&str>) -> SyncResult<Vec<u8>> {
    let archive_error =
        |e: zip::result::ZipError| SyncError::FeedUnavailable(format!("bad feed archive: {}", e));
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;

    let name = match entry {
        Some(name) => name.to_string(),
        None => archive
            .file_names()
            .find(|n| {
                let n = n.to_lowercase();
                FEED_EXTENSIONS.iter().any(|ext| n.ends_with(ext))
            })
            .map(str::to_string)
            .ok_or_else(|| {
                SyncError::FeedUnavailable("no spreadsheet or CSV in feed archive".to_string())
            })?,
    };

    let mut file = archive.by_name(&name).map_err(|e| {
        SyncError::FeedUnavailable(format!("bad feed archive: '{}': {}", name, e))
    })?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(|e| {
        SyncError::FeedUnavailable(format!("cannot read '{}' from archive: {}", name, e))
    })?;

    tracing::debug!("Extracted '{}' from feed archive: {} bytes", name, data.len());
    Ok(data)
}

/// Читает первый лист книги Excel (.xls или .xlsx)
pub fn parse_feed_workbook(data: &[u8], layout: &FeedLayout) -> SyncResult<Vec<FeedRow>> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data)).map_err(|e| {
        SyncError::FeedUnavailable(format!("cannot open feed spreadsheet: {}", e))
    })?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SyncError::FeedUnavailable("feed spreadsheet has no sheets".to_string()))?
        .map_err(|e| SyncError::FeedUnavailable(format!("cannot read feed sheet: {}", e)))?;

    parse_feed_sheet(&sheet, layout)
}

/// Переводит ячейки листа в строки прайс-листа
///
/// Числовые ячейки приводятся к тексту: код 69791.0 становится "69791".
pub fn parse_feed_sheet(sheet: &Range<Data>, layout: &FeedLayout) -> SyncResult<Vec<FeedRow>> {
    // Диапазон начинается с первой непустой ячейки, номера строк считаются от начала листа
    let first_row = sheet.start().map(|(row, _)| row as usize).unwrap_or(0);
    let records = sheet
        .rows()
        .enumerate()
        .map(|(i, cells)| -> SyncResult<(usize, Vec<String>)> {
            Ok((first_row + i, cells.iter().map(|cell| cell.to_string()).collect()))
        });
    collect_rows(records, layout)
}

/// Разбирает CSV-выгрузку листа с остатками
///
/// Кодировка: UTF-8 (BOM допускается), иначе windows-1251, как сохраняет Excel.
pub fn parse_feed_csv(data: &[u8], layout: &FeedLayout) -> SyncResult<Vec<FeedRow>> {
    let text = decode_feed_text(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(layout.delimiter)
        .from_reader(text.as_bytes());

    let records = reader
        .records()
        .map(|record| -> SyncResult<(usize, Vec<String>)> {
            let record = record
                .map_err(|e| SyncError::FeedUnavailable(format!("malformed feed CSV: {}", e)))?;
            // Пустые строки csv пропускает, поэтому номер берется из позиции записи
            let line = record.position().map(|p| p.line() as usize).unwrap_or(1);
            Ok((line.saturating_sub(1), record.iter().map(str::to_string).collect()))
        });
    collect_rows(records, layout)
}

fn decode_feed_text(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("Feed is not UTF-8, decoding as windows-1251");
            encoding_rs::WINDOWS_1251.decode_without_bom_handling(data).0
        }
    }
}

/// Находит заголовок и собирает строки таблицы
///
/// Строки без кода товара (итоги, группы) пропускаются.
fn collect_rows<I>(mut records: I, layout: &FeedLayout) -> SyncResult<Vec<FeedRow>>
where
    I: Iterator<Item = SyncResult<(usize, Vec<String>)>>,
{
    let (code_idx, quantity_idx, price_idx) = find_header(&mut records, layout)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        let (_, cells) = record?;
        let field = |i: usize| cells.get(i).map(|s| s.trim()).unwrap_or_default();

        let code = field(code_idx);
        if code.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(FeedRow::new(code, field(quantity_idx), field(price_idx)));
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} feed rows without product code", skipped);
    }
    tracing::info!("Feed parsed: {} rows", rows.len());

    Ok(rows)
}

fn find_header<I>(records: &mut I, layout: &FeedLayout) -> SyncResult<(usize, usize, usize)>
where
    I: Iterator<Item = SyncResult<(usize, Vec<String>)>>,
{
    match layout.header_row {
        Some(header_row) => {
            for record in records.by_ref() {
                let (idx, cells) = record?;
                if idx < header_row {
                    continue;
                }
                if idx == header_row {
                    if let Some(columns) = header_columns(&cells, layout) {
                        return Ok(columns);
                    }
                }
                break;
            }
            Err(SyncError::FeedUnavailable(format!(
                "feed row {} is not a header with columns '{}', '{}', '{}'",
                header_row, layout.code_column, layout.quantity_column, layout.price_column
            )))
        }
        None => {
            for record in records.by_ref().take(HEADER_SEARCH_ROWS) {
                let (idx, cells) = record?;
                if let Some(columns) = header_columns(&cells, layout) {
                    tracing::debug!("Feed header found at row {}", idx);
                    return Ok(columns);
                }
            }
            Err(SyncError::FeedUnavailable(format!(
                "feed header with columns '{}', '{}', '{}' not found",
                layout.code_column, layout.quantity_column, layout.price_column
            )))
        }
    }
}

fn header_columns(cells: &[String], layout: &FeedLayout) -> Option<(usize, usize, usize)> {
    let position = |name: &str| cells.iter().position(|h| h.trim() == name);
    Some((
        position(&layout.code_column)?,
        position(&layout.quantity_column)?,
        position(&layout.price_column)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const FEED_CSV: &str = "\u{FEFF}Остатки товаров на складе;;;\n\
        Склад: Основной;;;\n\
        ;;;\n\
        Наименование;Код;Количество;Цена\n\
        Часы;;;\n\
        Casio MTP-1302;69791;>10;5'990.00 руб.\n\
        Casio G-Shock; 70000 ;1;550.00 руб.\n\
        Итого;;;\n";

    fn csv_layout() -> FeedLayout {
        FeedLayout {
            entry: Some("ostatki.csv".to_string()),
            header_row: None,
            ..FeedLayout::default()
        }
    }

    fn zipped(name: &str, content: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(name, options).unwrap();
        writer.write_all(content).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Лист как в выгрузке поставщика: шапка отчета, заголовок в строке 17, числовые коды
    fn supplier_sheet() -> Range<Data> {
        let mut sheet = Range::new((2, 0), (21, 3));
        sheet.set_value((2, 0), Data::String("Остатки товаров на складе".to_string()));
        sheet.set_value((4, 0), Data::String("Склад: Основной".to_string()));
        // Строка с теми же названиями выше заголовка не должна его подменять
        sheet.set_value((10, 1), Data::String("Код".to_string()));
        for (col, title) in ["Наименование", "Код", "Количество", "Цена"].iter().enumerate() {
            sheet.set_value((17, col as u32), Data::String(title.to_string()));
        }
        sheet.set_value((18, 0), Data::String("Часы".to_string()));
        sheet.set_value((19, 0), Data::String("Casio MTP-1302".to_string()));
        sheet.set_value((19, 1), Data::Float(69791.0));
        sheet.set_value((19, 2), Data::String(">10".to_string()));
        sheet.set_value((19, 3), Data::String("5'990.00 руб.".to_string()));
        sheet.set_value((20, 0), Data::String("Casio G-Shock".to_string()));
        sheet.set_value((20, 1), Data::Int(70000));
        sheet.set_value((20, 2), Data::Float(1.0));
        sheet.set_value((20, 3), Data::Float(550.0));
        sheet.set_value((21, 0), Data::String("Итого".to_string()));
        sheet
    }

    #[test]
    fn test_parse_sheet_with_fixed_header_row() {
        let rows = parse_feed_sheet(&supplier_sheet(), &FeedLayout::default()).unwrap();
        assert_eq!(
            rows,
            vec![
                FeedRow::new("69791", ">10", "5'990.00 руб."),
                FeedRow::new("70000", "1", "550"),
            ]
        );
    }

    #[test]
    fn test_parse_sheet_wrong_header_row() {
        let layout = FeedLayout {
            header_row: Some(16),
            ..FeedLayout::default()
        };
        let err = parse_feed_sheet(&supplier_sheet(), &layout).unwrap_err();
        assert!(matches!(err, SyncError::FeedUnavailable(_)));
    }

    #[test]
    fn test_supplier_archive_routes_xls_entry_to_spreadsheet_reader() {
        // Архив с сайта содержит ostatki.xls; битая книга должна дойти до чтения листа
        let archive = zipped("ostatki.xls", b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1broken");
        let err = parse_feed_bytes(&archive, &FeedLayout::default()).unwrap_err();
        match err {
            SyncError::FeedUnavailable(msg) => {
                assert!(msg.contains("spreadsheet"), "{}", msg)
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let layout = FeedLayout {
            entry: None,
            ..FeedLayout::default()
        };
        let err = parse_feed_bytes(&archive, &layout).unwrap_err();
        assert!(matches!(err, SyncError::FeedUnavailable(msg) if msg.contains("spreadsheet")));
    }

    #[test]
    fn test_parse_csv_with_preamble() {
        let rows = parse_feed_csv(FEED_CSV.as_bytes(), &csv_layout()).unwrap();
        assert_eq!(
            rows,
            vec![
                FeedRow::new("69791", ">10", "5'990.00 руб."),
                FeedRow::new("70000", "1", "550.00 руб."),
            ]
        );
    }

    #[test]
    fn test_parse_csv_with_fixed_header_row() {
        let layout = FeedLayout {
            header_row: Some(3),
            ..csv_layout()
        };
        let rows = parse_feed_csv(FEED_CSV.as_bytes(), &layout).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_windows_1251_csv() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Код;Количество;Цена\n1;5;10.00\n");
        assert!(std::str::from_utf8(&bytes).is_err());

        let layout = FeedLayout {
            header_row: Some(0),
            ..csv_layout()
        };
        let rows = parse_feed_bytes(&bytes, &layout).unwrap();
        assert_eq!(rows, vec![FeedRow::new("1", "5", "10.00")]);
    }

    #[test]
    fn test_parse_zip_archive() {
        let archive = zipped("ostatki.csv", FEED_CSV.as_bytes());
        let rows = parse_feed_bytes(&archive, &csv_layout()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "69791");
    }

    #[test]
    fn test_zip_entry_autodetect() {
        let archive = zipped("export_2024.CSV", FEED_CSV.as_bytes());
        let layout = FeedLayout {
            entry: None,
            ..csv_layout()
        };
        assert_eq!(parse_feed_bytes(&archive, &layout).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_zip_entry() {
        let archive = zipped("other.csv", FEED_CSV.as_bytes());
        let err = parse_feed_bytes(&archive, &csv_layout()).unwrap_err();
        assert!(matches!(err, SyncError::FeedUnavailable(_)));
    }

    #[test]
    fn test_missing_column() {
        let csv = "Код;Количество\n69791;5\n";
        let err = parse_feed_csv(csv.as_bytes(), &csv_layout()).unwrap_err();
        assert!(matches!(err, SyncError::FeedUnavailable(_)));
    }

    #[test]
    fn test_comma_delimiter() {
        let csv = "Код,Количество,Цена\n69791,5,\"1,000.00 руб.\"\n";
        let layout = FeedLayout {
            delimiter: b',',
            ..csv_layout()
        };
        let rows = parse_feed_csv(csv.as_bytes(), &layout).unwrap();
        assert_eq!(rows, vec![FeedRow::new("69791", "5", "1,000.00 руб.")]);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileFeedSource::new("/nonexistent/ostatki.zip", FeedLayout::default());
        let err = source.fetch_feed_rows().await.unwrap_err();
        assert!(matches!(err, SyncError::FeedUnavailable(_)));
    }
}
