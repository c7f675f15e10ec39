use crate::{
    error::ServiceError,
    file::csv::{error::FileError, settings::CsvSettings},
    offset,
    service::PagedQueryService,
};
use async_trait::async_trait;
use csv::StringRecord;
use model::{
    core::value::{FieldValue, Value},
    pagination::{cursor::Cursor, page::Page, page_size::PageSize},
    query::QuerySpec,
    records::{key::RecordKey, row::RowData},
};
use std::{
    cell::Cell,
    fs::File,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, warn};

/// Query service over a single CSV file with a header row.
///
/// The file is one entity, named after the file stem unless overridden. Every page
/// fetch re-reads the file, so the cursor token is simply the number of matching rows
/// already delivered.
#[derive(Debug, Clone)]
pub struct CsvQueryService {
    path: PathBuf,
    entity: String,
    settings: CsvSettings,
}

impl CsvQueryService {
    pub fn new(path: impl AsRef<Path>, settings: CsvSettings) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(FileError::NotFound(path.display().to_string()));
        }
        if !settings.delimiter.is_ascii() {
            return Err(FileError::InvalidFormat(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                settings.delimiter
            )));
        }

        let entity = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("records")
            .to_string();

        Ok(CsvQueryService {
            path,
            entity,
            settings,
        })
    }

    pub fn with_entity(mut self, entity: &str) -> Self {
        self.entity = entity.to_string();
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// An unfiltered query over this file's entity.
    pub fn query(&self) -> QuerySpec {
        QuerySpec::new(&self.entity)
    }

    fn open(&self) -> Result<csv::Reader<File>, FileError> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.settings.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        Ok(reader)
    }

    fn check_fields(&self, headers: &StringRecord, query: &QuerySpec) -> Result<(), FileError> {
        let referenced = query
            .filters
            .iter()
            .map(|p| p.field.as_str())
            .chain(query.order_by.iter().map(|k| k.field.as_str()));

        for column in referenced {
            if !headers.iter().any(|h| h.trim().eq_ignore_ascii_case(column)) {
                return Err(FileError::UnknownField {
                    file: self.path.display().to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn to_row(&self, headers: &StringRecord, record: &StringRecord) -> RowData {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(ordinal, header)| FieldValue {
                name: header.trim().to_string(),
                value: record.get(ordinal).map_or(Value::Null, Value::infer),
            })
            .collect();
        RowData::new(&self.entity, fields)
    }

    fn key_for(&self, line: usize, row: &RowData) -> RecordKey {
        let id = self
            .settings
            .key_column
            .as_deref()
            .and_then(|column| row.get(column))
            .filter(|f| !f.value.is_null())
            .map(|f| f.value.to_string())
            .unwrap_or_else(|| line.to_string());
        RecordKey::new(&row.entity, id)
    }

    /// Reads one page of matching rows, each paired with its 1-based data line number.
    fn read_page(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        from: usize,
    ) -> Result<Page<(usize, RowData)>, FileError> {
        let start = Instant::now();
        if query.entity != self.entity {
            debug!(entity = %query.entity, file = %self.path.display(), "Entity not in file.");
            return Ok(Page::empty());
        }

        let mut reader = self.open()?;
        let headers = reader.headers()?.clone();
        self.check_fields(&headers, query)?;

        let ragged = Cell::new(0usize);
        let matching = reader.records().enumerate().filter_map(|(idx, record)| {
            match record {
                Ok(record) => {
                    if record.len() != headers.len() {
                        ragged.set(ragged.get() + 1);
                    }
                    let row = self.to_row(&headers, &record);
                    query.matches(&row).then_some(Ok((idx + 1, row)))
                }
                Err(e) => Some(Err(FileError::from(e))),
            }
        });

        let (items, more) = if query.is_ordered() {
            let mut all = matching.collect::<Result<Vec<_>, _>>()?;
            query.sort_by_row(&mut all, |(_, row)| row);
            let more = all.len() > from.saturating_add(page_size.get());
            let items: Vec<_> = all.into_iter().skip(from).take(page_size.get()).collect();
            (items, more)
        } else {
            let mut skipped = 0;
            let mut more = false;
            let mut items = Vec::with_capacity(page_size.get());
            for entry in matching {
                let entry = entry?;
                if skipped < from {
                    skipped += 1;
                    continue;
                }
                if items.len() == page_size.get() {
                    more = true;
                    break;
                }
                items.push(entry);
            }
            (items, more)
        };

        if ragged.get() > 0 {
            warn!(
                file = %self.path.display(),
                rows = ragged.get(),
                expected = headers.len(),
                "Rows differ in width from the header; missing cells are read as NULL."
            );
        }

        debug!(
            file = %self.path.display(),
            from,
            returned = items.len(),
            more,
            "Read CSV page."
        );

        let next = offset::encode(from + items.len());
        Ok(Page::new(items, next, more).with_took_ms(start.elapsed().as_millis()))
    }
}

#[async_trait]
impl PagedQueryService for CsvQueryService {
    type Query = QuerySpec;
    type Record = RowData;
    type Key = RecordKey;
    type Error = ServiceError;

    async fn fetch_keys(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<RecordKey>, ServiceError> {
        let from = offset::decode(&cursor)?;
        let page = self.read_page(query, page_size, from)?;
        Ok(page.map(|(line, row)| self.key_for(line, &row)))
    }

    async fn fetch_records(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<RowData>, ServiceError> {
        let from = offset::decode(&cursor)?;
        let page = self.read_page(query, page_size, from)?;
        Ok(page.map(|(_, row)| row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::query::{Comparator, Direction};
    use std::io::Write;
    use tempfile::{TempDir, tempdir};
    use tracing_test::traced_test;

    const USERS_CSV: &str = "\
id,name,country_code,age
1,Ada,UK,36
2,Linus,FI,54
3,Grace,US,85
4,Alan,UK,41
5,Barbara,US,
";

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn size(n: usize) -> PageSize {
        PageSize::new(n).unwrap()
    }

    #[test]
    fn test_missing_file() {
        let err = CsvQueryService::new("/definitely/not/here.csv", CsvSettings::default());
        assert!(matches!(err, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_entity_from_file_stem() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();
        assert_eq!(service.entity(), "users");

        let page = service
            .fetch_records(&service.query(), size(10), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(page.len(), 5);
        assert!(!page.more);
        assert_eq!(page.items[0].get_value("name"), Value::from("Ada"));
        assert_eq!(page.items[4].get_value("age"), Value::Null);
    }

    #[tokio::test]
    async fn test_filtered_pages_and_cursor() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();
        let query = service.query().filter("country_code", Comparator::Ne, "FI");

        let first = service
            .fetch_records(&query, size(3), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.more);
        assert_eq!(first.next_cursor, Cursor::token("3"));

        let second = service
            .fetch_records(&query, size(3), first.next_cursor)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second.more);
        assert_eq!(second.items[0].get_value("name"), Value::from("Barbara"));
    }

    #[tokio::test]
    async fn test_exact_page_boundary_reports_no_more() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();

        let page = service
            .fetch_keys(&service.query(), size(5), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(page.len(), 5);
        assert!(!page.more);
        assert_eq!(page.items[2], RecordKey::new("users", "3"));
    }

    #[tokio::test]
    async fn test_ordered_query() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();
        let query = service.query().order_by("age", Direction::Desc);

        let page = service
            .fetch_records(&query, size(2), Cursor::Start)
            .await
            .unwrap();
        let names: Vec<Value> = page.items.iter().map(|r| r.get_value("name")).collect();
        assert_eq!(names, vec![Value::from("Grace"), Value::from("Linus")]);
        assert!(page.more);
    }

    #[tokio::test]
    async fn test_keys_fall_back_to_line_number() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "events.csv", "kind;at\nlogin;1\nlogout;2\n");
        let settings = CsvSettings {
            delimiter: ';',
            key_column: None,
        };
        let service = CsvQueryService::new(&path, settings).unwrap();

        let page = service
            .fetch_keys(&service.query(), size(10), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(
            page.items,
            vec![RecordKey::new("events", "1"), RecordKey::new("events", "2")]
        );
    }

    #[tokio::test]
    async fn test_unknown_column_is_an_error() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();
        let query = service.query().filter("email", Comparator::Eq, "x");

        let result = service.fetch_records(&query, size(10), Cursor::Start).await;
        assert!(matches!(
            result,
            Err(ServiceError::File(FileError::UnknownField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cells_keep_their_text() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            &dir,
            "accounts.csv",
            "id,zip,country_code\n12345678901234567890,02134, UK \n12345678901234567891,10001,US\n",
        );
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();

        let query = service.query().filter("country_code", Comparator::Eq, "UK");
        let page = service
            .fetch_records(&query, size(10), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.items[0].get_value("zip"), Value::from("02134"));

        let keys = service
            .fetch_keys(&service.query(), size(10), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(
            keys.items,
            vec![
                RecordKey::new("accounts", "12345678901234567890"),
                RecordKey::new("accounts", "12345678901234567891"),
            ]
        );
    }

    #[tokio::test]
    async fn test_entity_name_is_matched_exactly() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", USERS_CSV);
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();

        let page = service
            .fetch_keys(&QuerySpec::new("Users"), size(10), Cursor::Start)
            .await
            .unwrap();
        assert!(page.is_empty());
        assert!(!page.more);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_ragged_rows_warn_once_per_fetch() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "users.csv", "id,name,age\n1,Ada\n2,Linus\n3,Grace,85\n");
        let service = CsvQueryService::new(&path, CsvSettings::default()).unwrap();

        let page = service
            .fetch_records(&service.query(), size(10), Cursor::Start)
            .await
            .unwrap();
        assert_eq!(page.items[0].get_value("age"), Value::Null);
        assert_eq!(page.items[2].get_value("age"), Value::Int(85));

        logs_assert(|lines: &[&str]| {
            let warnings: Vec<&&str> = lines
                .iter()
                .filter(|line| line.contains("differ in width"))
                .collect();
            match warnings.as_slice() {
                [line] if line.contains("rows=2") => Ok(()),
                other => Err(format!("expected one warning for 2 rows, got {other:?}")),
            }
        });
    }
}
