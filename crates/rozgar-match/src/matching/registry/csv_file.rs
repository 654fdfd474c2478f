use std::io::Read;
use std::path::{Path, PathBuf};

use super::super::domain::{Job, LanguageCode, Worker};
use super::records::{partition, JobRow, WorkerRow};
use super::{JobRegistry, RegistryError, RegistrySnapshot, WorkerRegistry};

/// Job registry backed by a CSV export. The file is re-read on every call so each sweep
/// sees the current postings.
#[derive(Debug, Clone)]
pub struct CsvJobRegistry {
    path: PathBuf,
}

impl CsvJobRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RegistrySnapshot<Job>, RegistryError> {
        let rows = read_rows::<JobRow, _>(reader)?;
        let (jobs, rejected) = partition(rows.into_iter().enumerate(), |(position, row)| {
            let fallback = row.clone();
            row.validate()
                .map_err(|error| fallback.reject(position, error))
        });

        Ok(RegistrySnapshot {
            records: jobs.into_iter().filter(Job::is_active).collect(),
            rejected,
        })
    }
}

impl JobRegistry for CsvJobRegistry {
    fn list_active(&self) -> Result<RegistrySnapshot<Job>, RegistryError> {
        let file = std::fs::File::open(&self.path)?;
        Self::from_reader(file)
    }
}

/// Worker registry backed by a CSV export.
#[derive(Debug, Clone)]
pub struct CsvWorkerRegistry {
    path: PathBuf,
    default_language: LanguageCode,
}

impl CsvWorkerRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_language: LanguageCode::default(),
        }
    }

    /// Language given to rows that leave `language` empty.
    pub fn with_default_language(mut self, language: LanguageCode) -> Self {
        self.default_language = language;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RegistrySnapshot<Worker>, RegistryError> {
        Self::read_snapshot(reader, &LanguageCode::default())
    }

    fn read_snapshot<R: Read>(
        reader: R,
        default_language: &LanguageCode,
    ) -> Result<RegistrySnapshot<Worker>, RegistryError> {
        let rows = read_rows::<WorkerRow, _>(reader)?;
        let (records, rejected) = partition(rows.into_iter().enumerate(), |(position, row)| {
            let fallback = row.clone();
            row.validate_with(default_language)
                .map_err(|error| fallback.reject(position, error))
        });

        Ok(RegistrySnapshot { records, rejected })
    }
}

impl WorkerRegistry for CsvWorkerRegistry {
    fn list_all(&self) -> Result<RegistrySnapshot<Worker>, RegistryError> {
        let file = std::fs::File::open(&self.path)?;
        Self::read_snapshot(file, &self.default_language)
    }
}

fn read_rows<T, R>(reader: R) -> Result<Vec<T>, RegistryError>
where
    T: serde::de::DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::registry::RecordError;
    use std::io::Cursor;

    #[test]
    fn job_csv_keeps_active_rows_and_reports_malformed_ones() {
        let csv = "job_id,employer_id,title,job_type,village,district,state,daily_wage_offered,contact_number,status,created_at\n\
j-1,e-1,Wall repair,Mason,Kiraoli,Agra,UP,500,9876500000,active,2025-01-10\n\
j-2,e-1,Old posting,Mason,Kiraoli,Agra,UP,450,9876500000,closed,2025-01-01\n\
j-3,e-2,No district,Plumber,Etmadpur,,UP,400,9876500001,active,2025-01-11\n";

        let snapshot = CsvJobRegistry::from_reader(Cursor::new(csv)).expect("csv parses");

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].id.as_str(), "j-1");
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].reference, "j-3");
        assert_eq!(
            snapshot.rejected[0].error,
            RecordError::MissingField("district")
        );
    }

    #[test]
    fn worker_csv_tolerates_missing_optional_columns() {
        let csv = "worker_id,user_id,name,district,state,job_type,expected_daily_wage\n\
w-1,u-1,Raj,Agra,UP,Mason,500\n\
w-2,u-2,Sita,Agra,UP,Mason,not-a-number\n";

        let snapshot = CsvWorkerRegistry::from_reader(Cursor::new(csv)).expect("csv parses");

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].language.as_str(), "hi");
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].reference, "w-2");
    }

    #[test]
    fn missing_language_takes_the_configured_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("workers.csv");
        std::fs::write(
            &path,
            "worker_id,user_id,name,district,state,job_type,expected_daily_wage,language\n\
w-1,u-1,Raj,Agra,UP,Mason,500,\n\
w-2,u-2,Sita,Agra,UP,Mason,480,ta\n",
        )
        .expect("seed csv");

        let snapshot = CsvWorkerRegistry::new(&path)
            .with_default_language(LanguageCode::new("en"))
            .list_all()
            .expect("csv parses");

        let languages: Vec<&str> = snapshot
            .records
            .iter()
            .map(|worker| worker.language.as_str())
            .collect();
        assert_eq!(languages, vec!["en", "ta"]);
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let registry = CsvJobRegistry::new("./does-not-exist.csv");
        match registry.list_active() {
            Err(RegistryError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
