//! Imports transactions in bulk from CSV files.
//!
//! The import runs in one pass over the source: records are parsed and
//! buffered until the end of the input, the categories they need are resolved
//! with one lookup and one bulk insert, and then all transactions are saved in
//! one batch. Unlike [LedgerWriter](crate::transaction::LedgerWriter), imports
//! do not check that outcomes are covered by the balance, so imported outcomes
//! may make it negative.

use std::{collections::HashSet, fs, fs::File, io::Read, path::Path};

use rust_decimal::Decimal;

use crate::{
    Error,
    category::{Category, CategoryTitle},
    csv_import::csv::{CsvRecord, complete_records, parse_records},
    stores::{CategoryStore, TransactionStore},
    transaction::{NewTransaction, Transaction, TransactionType, core::parse_value},
};

/// The result of importing a CSV file.
#[derive(Debug, PartialEq)]
pub struct ImportReport {
    /// The imported transactions in the order they appeared in the file.
    pub transactions: Vec<Transaction>,
    /// Set if the file could not be deleted after the import.
    ///
    /// The transactions were still imported.
    pub cleanup_error: Option<Error>,
}

/// Imports transactions from CSV files with the columns `title, type, value, category`.
#[derive(Debug, Clone)]
pub struct TransactionImporter<C, T> {
    category_store: C,
    transaction_store: T,
}

impl<C, T> TransactionImporter<C, T>
where
    C: CategoryStore,
    T: TransactionStore,
{
    /// Create an importer that saves categories to `category_store` and
    /// transactions to `transaction_store`.
    pub fn new(category_store: C, transaction_store: T) -> Self {
        Self {
            category_store,
            transaction_store,
        }
    }

    /// Import the CSV file at `path` and delete the file once its
    /// transactions have been saved.
    ///
    /// The file is left in place if the import fails.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if
    /// [TransactionImporter::import_from_reader] fails. A failure to delete
    /// the file is not an error, it is reported in [ImportReport::cleanup_error].
    pub fn import_file(&self, path: &Path) -> Result<ImportReport, Error> {
        let file = File::open(path)?;
        let transactions = self.import_from_reader(file)?;

        let cleanup_error = fs::remove_file(path).err().map(|error| {
            tracing::warn!(
                "Imported {} transactions but could not delete {}: {error}",
                transactions.len(),
                path.display()
            );
            Error::CleanupFailed {
                path: path.display().to_string(),
                reason: error.to_string(),
            }
        });

        Ok(ImportReport {
            transactions,
            cleanup_error,
        })
    }

    /// Import transactions from CSV text read from `source`.
    ///
    /// The first line is skipped as a header. Rows missing a title, type or
    /// value are skipped. Nothing is saved until all of `source` has been read.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Io] if `source` cannot be read,
    /// - [Error::InvalidCSVRow] if a complete row has an invalid type or value,
    ///   or would push the income or outcome sum past the largest decimal,
    ///   in which case nothing is saved,
    /// - or any error from the stores unchanged.
    ///
    /// Unlike incomplete rows, which are skipped, a complete row that cannot be
    /// stored fails the whole import with a validation error, so a file is never
    /// half imported.
    pub fn import_from_reader<R: Read>(&self, source: R) -> Result<Vec<Transaction>, Error> {
        let start_time = std::time::Instant::now();

        let batch = Batch::accumulate(complete_records(parse_records(source)))?;

        if batch.candidates.is_empty() {
            tracing::debug!("CSV import found no complete rows, nothing to import");
            return Ok(Vec::new());
        }

        let candidates = batch
            .candidates
            .into_iter()
            .map(Candidate::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        self.check_balance_fits(&candidates)?;

        let categories = self.resolve_categories(&batch.category_titles)?;
        let new_transactions = materialize(candidates, &categories)?;
        let transactions = self.transaction_store.import(new_transactions)?;

        tracing::info!(
            "Imported {} transactions in {:.1}ms",
            transactions.len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok(transactions)
    }

    /// Check that the stored balance plus every candidate still fits in a decimal.
    ///
    /// Imports do not check that outcomes are covered by the balance.
    fn check_balance_fits(&self, candidates: &[Candidate]) -> Result<(), Error> {
        let mut balance = self.transaction_store.get_balance()?;

        for candidate in candidates {
            balance
                .record(candidate.transaction_type, candidate.value)
                .map_err(|error| Error::InvalidCSVRow {
                    line: candidate.line,
                    reason: error.to_string(),
                })?;
        }

        Ok(())
    }

    /// Find or create a category for every title in `titles` with one lookup
    /// and at most one bulk insert.
    fn resolve_categories(&self, titles: &[CategoryTitle]) -> Result<Vec<Category>, Error> {
        let unique_titles = unique_in_order(titles);

        let existing_categories = self.category_store.get_by_titles(&unique_titles)?;
        let existing_titles: HashSet<&CategoryTitle> = existing_categories
            .iter()
            .map(|category| &category.title)
            .collect();

        let new_titles: Vec<CategoryTitle> = unique_titles
            .iter()
            .filter(|title| !existing_titles.contains(title))
            .cloned()
            .collect();

        let mut categories = if new_titles.is_empty() {
            Vec::new()
        } else {
            tracing::debug!("Creating {} new categories", new_titles.len());
            self.category_store.create_many(new_titles)?
        };

        categories.extend(existing_categories);

        Ok(categories)
    }
}

/// The rows read from a CSV file before anything is saved.
#[derive(Debug, Default)]
struct Batch {
    candidates: Vec<CsvRecord>,
    /// The category of every candidate in order, duplicates included.
    category_titles: Vec<CategoryTitle>,
}

impl Batch {
    /// Drain `records` into a batch.
    ///
    /// Returns only once `records` is exhausted, or on the first error.
    fn accumulate<I>(records: I) -> Result<Self, Error>
    where
        I: Iterator<Item = Result<CsvRecord, Error>>,
    {
        let mut batch = Self::default();

        for record in records {
            let record = record?;

            batch
                .category_titles
                .push(CategoryTitle::or_uncategorized(&record.category));
            batch.candidates.push(record);
        }

        Ok(batch)
    }
}

/// A CSV row whose type and value have been checked.
#[derive(Debug)]
struct Candidate {
    line: u64,
    title: String,
    value: Decimal,
    transaction_type: TransactionType,
    category: CategoryTitle,
}

impl TryFrom<CsvRecord> for Candidate {
    type Error = Error;

    fn try_from(record: CsvRecord) -> Result<Self, Self::Error> {
        let line = record.line;
        let invalid_row = |error: Error| Error::InvalidCSVRow {
            line,
            reason: error.to_string(),
        };

        Ok(Self {
            line,
            transaction_type: record.transaction_type.parse().map_err(invalid_row)?,
            value: parse_value(&record.value).map_err(invalid_row)?,
            category: CategoryTitle::or_uncategorized(&record.category),
            title: record.title,
        })
    }
}

/// Attach the category with the matching title to each candidate, keeping the
/// order of `candidates`.
fn materialize(
    candidates: Vec<Candidate>,
    categories: &[Category],
) -> Result<Vec<NewTransaction>, Error> {
    candidates
        .into_iter()
        .map(|candidate| {
            let category = categories
                .iter()
                .find(|category| category.title == candidate.category)
                .ok_or_else(|| Error::UnresolvedCategory(candidate.category.to_string()))?;

            NewTransaction::new(
                &candidate.title,
                candidate.value,
                candidate.transaction_type,
                category.clone(),
            )
        })
        .collect()
}

/// Remove duplicates from `titles`, keeping the first occurrence of each.
fn unique_in_order(titles: &[CategoryTitle]) -> Vec<CategoryTitle> {
    let mut seen = HashSet::new();

    titles
        .iter()
        .filter(|title| seen.insert(*title))
        .cloned()
        .collect()
}

#[cfg(test)]
mod import_transactions_tests {
    use std::{
        fs,
        io::{self, Read},
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        balance::Balance,
        category::{CategoryTitle, UNCATEGORIZED},
        database_id::TransactionId,
        db::initialize,
        stores::{
            CategoryStore, TransactionStore,
            sqlite::{SQLiteCategoryStore, SQLiteTransactionStore},
        },
        transaction::{NewTransaction, Transaction, TransactionType},
    };

    use super::{TransactionImporter, unique_in_order};

    type TestImporter = TransactionImporter<SQLiteCategoryStore, SQLiteTransactionStore>;

    fn get_test_stores() -> (SQLiteCategoryStore, SQLiteTransactionStore) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));

        (
            SQLiteCategoryStore::new(connection.clone()),
            SQLiteTransactionStore::new(connection),
        )
    }

    fn get_test_importer() -> (TestImporter, SQLiteCategoryStore, SQLiteTransactionStore) {
        let (categories, transactions) = get_test_stores();

        (
            TransactionImporter::new(categories.clone(), transactions.clone()),
            categories,
            transactions,
        )
    }

    fn titles(transactions: &[Transaction]) -> Vec<&str> {
        transactions
            .iter()
            .map(|transaction| transaction.title.as_str())
            .collect()
    }

    fn category_titles(store: &SQLiteCategoryStore) -> Vec<String> {
        store
            .get_all()
            .expect("Could not get categories")
            .into_iter()
            .map(|category| category.title.to_string())
            .collect()
    }

    const EXAMPLE_CSV: &str = "title, type, value, category\n\
        Salary, income, 5000, Job\n\
        Rent, outcome, 1200, Housing\n\
        , outcome, 50, Misc";

    #[test]
    fn imports_example_file() {
        let (importer, categories, transactions) = get_test_importer();

        let imported = importer
            .import_from_reader(EXAMPLE_CSV.as_bytes())
            .expect("Could not import transactions");

        assert_eq!(titles(&imported), vec!["Salary", "Rent"]);
        assert_eq!(category_titles(&categories), vec!["Housing", "Job"]);
        assert_eq!(transactions.get_balance().unwrap().total, dec!(3800));
        assert_eq!(transactions.get_all(), Ok(imported));
    }

    #[test]
    fn skips_row_with_blank_value_and_keeps_order() {
        let (importer, _, _) = get_test_importer();
        let csv = "title,type,value,category\n\
            First,income,10,A\n\
            Second,income,,A\n\
            Third,outcome,5,B\n\
            Fourth,income,1.5,C";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(titles(&imported), vec!["First", "Third", "Fourth"]);
    }

    #[test]
    fn rows_sharing_a_new_category_create_it_once() {
        let (importer, categories, _) = get_test_importer();
        let csv = "title,type,value,category\n\
            Groceries,outcome,80,Food\n\
            Takeaway,outcome,25,Food";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(category_titles(&categories), vec!["Food"]);
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].category, imported[1].category);
    }

    #[test]
    fn reuses_existing_categories() {
        let (importer, categories, _) = get_test_importer();
        let food = categories
            .create(CategoryTitle::new_unchecked("Food"))
            .unwrap();
        let csv = "title,type,value,category\n\
            Salary,income,5000,Job\n\
            Groceries,outcome,80,Food";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(imported[1].category, food);
        assert_eq!(category_titles(&categories), vec!["Food", "Job"]);
    }

    #[test]
    fn new_categories_are_created_in_order_of_first_use() {
        let (importer, _, _) = get_test_importer();
        let csv = "title,type,value,category\n\
            A,income,1,Zeta\n\
            B,income,1,Alpha\n\
            C,income,1,Zeta";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert!(imported[0].category.id < imported[1].category.id);
        assert_eq!(imported[0].category, imported[2].category);
    }

    #[test]
    fn empty_category_is_uncategorized() {
        let (importer, categories, _) = get_test_importer();
        let csv = "title,type,value,category\n\
            Gift,income,20,\n\
            Found money,income,5";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(imported[0].category.title.as_ref(), UNCATEGORIZED);
        assert_eq!(imported[0].category, imported[1].category);
        assert_eq!(category_titles(&categories), vec![UNCATEGORIZED]);
    }

    #[test]
    fn import_does_not_check_balance() {
        let (importer, _, transactions) = get_test_importer();
        let csv = "title,type,value,category\nRent,outcome,1200,Housing";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(transactions.get_balance().unwrap().total, dec!(-1200));
    }

    #[test]
    fn invalid_type_fails_before_anything_is_saved() {
        let (importer, categories, transactions) = get_test_importer();
        let csv = "title,type,value,category\n\
            Salary,income,5000,Job\n\
            Rent,expense,1200,Housing";

        let result = importer.import_from_reader(csv.as_bytes());

        assert!(
            matches!(result, Err(Error::InvalidCSVRow { line: 3, .. })),
            "got {result:?}"
        );
        assert_eq!(categories.get_all(), Ok(vec![]));
        assert_eq!(transactions.get_all(), Ok(vec![]));
    }

    #[test]
    fn invalid_value_fails_before_anything_is_saved() {
        let (importer, categories, _) = get_test_importer();
        let csv = "title,type,value,category\nSalary,income,lots,Job";

        let result = importer.import_from_reader(csv.as_bytes());

        assert!(
            matches!(result, Err(Error::InvalidCSVRow { line: 2, .. })),
            "got {result:?}"
        );
        assert_eq!(categories.get_all(), Ok(vec![]));
    }

    #[test]
    fn rows_that_overflow_the_balance_fail_before_anything_is_saved() {
        let (importer, categories, transactions) = get_test_importer();
        let csv = format!(
            "title,type,value,category\n\
            A,income,{max},X\n\
            B,income,{max},X",
            max = Decimal::MAX
        );

        let result = importer.import_from_reader(csv.as_bytes());

        assert!(
            matches!(result, Err(Error::InvalidCSVRow { line: 3, .. })),
            "got {result:?}"
        );
        assert_eq!(categories.get_all(), Ok(vec![]));
        assert_eq!(transactions.get_all(), Ok(vec![]));
        assert_eq!(transactions.get_balance(), Ok(Balance::default()));
    }

    #[test]
    fn rows_that_overflow_the_stored_balance_are_rejected() {
        let (importer, _, transactions) = get_test_importer();
        importer
            .import_from_reader(format!("h1,h2,h3,h4\nA,outcome,{},X", Decimal::MAX).as_bytes())
            .expect("Could not import first file");

        let result = importer.import_from_reader("h1,h2,h3,h4\nB,outcome,1,X".as_bytes());

        assert!(
            matches!(result, Err(Error::InvalidCSVRow { line: 2, .. })),
            "got {result:?}"
        );
        assert_eq!(transactions.get_all().unwrap().len(), 1);
        assert!(transactions.get_balance().is_ok());
    }

    #[test]
    fn header_only_imports_nothing() {
        let (importer, categories, _) = get_test_importer();

        let imported = importer
            .import_from_reader("title,type,value,category".as_bytes())
            .unwrap();

        assert_eq!(imported, vec![]);
        assert_eq!(categories.get_all(), Ok(vec![]));
    }

    struct BrokenReader {
        sent_header: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent_header {
                return Err(io::Error::other("connection reset"));
            }

            let data = b"title,type,value,category\nSalary,income,5000,Job\n";
            buf[..data.len()].copy_from_slice(data);
            self.sent_header = true;

            Ok(data.len())
        }
    }

    #[test]
    fn read_failure_saves_nothing() {
        let (importer, categories, transactions) = get_test_importer();

        let result = importer.import_from_reader(BrokenReader { sent_header: false });

        assert_eq!(result, Err(Error::Io("connection reset".to_owned())));
        assert_eq!(categories.get_all(), Ok(vec![]));
        assert_eq!(transactions.get_all(), Ok(vec![]));
    }

    #[test]
    fn unique_in_order_keeps_first_occurrence() {
        let titles = ["B", "A", "B", "C", "A"].map(CategoryTitle::new_unchecked);

        let unique = unique_in_order(&titles);

        assert_eq!(unique, ["B", "A", "C"].map(CategoryTitle::new_unchecked));
    }

    /// Wraps a real store and runs `before_import` at the start of every import.
    struct FaultyTransactionStore<F> {
        inner: SQLiteTransactionStore,
        before_import: F,
    }

    impl<F> TransactionStore for FaultyTransactionStore<F>
    where
        F: Fn() -> Result<(), Error>,
    {
        fn create(&self, new_transaction: NewTransaction) -> Result<Transaction, Error> {
            self.inner.create(new_transaction)
        }

        fn import(
            &self,
            new_transactions: Vec<NewTransaction>,
        ) -> Result<Vec<Transaction>, Error> {
            (self.before_import)()?;
            self.inner.import(new_transactions)
        }

        fn get(&self, id: TransactionId) -> Result<Transaction, Error> {
            self.inner.get(id)
        }

        fn get_all(&self) -> Result<Vec<Transaction>, Error> {
            self.inner.get_all()
        }

        fn get_balance(&self) -> Result<Balance, Error> {
            self.inner.get_balance()
        }
    }

    fn write_csv(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("import.csv");
        fs::write(&path, text).expect("Could not write test CSV");
        path
    }

    #[test]
    fn import_file_deletes_file_after_import() {
        let (importer, _, _) = get_test_importer();
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, EXAMPLE_CSV);

        let report = importer.import_file(&path).expect("Could not import file");

        assert_eq!(titles(&report.transactions), vec!["Salary", "Rent"]);
        assert_eq!(report.cleanup_error, None);
        assert!(!path.exists(), "import file should have been deleted");
    }

    #[test]
    fn import_file_deletes_file_even_if_every_row_is_skipped() {
        let (importer, _, _) = get_test_importer();
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "title,type,value,category\n,income,5,Job");

        let report = importer.import_file(&path).unwrap();

        assert_eq!(report.transactions, vec![]);
        assert!(!path.exists());
    }

    #[test]
    fn import_file_keeps_file_when_persist_fails() {
        let (categories, transactions) = get_test_stores();
        let importer = TransactionImporter::new(
            categories,
            FaultyTransactionStore {
                inner: transactions.clone(),
                before_import: || -> Result<(), Error> { Err(Error::DatabaseLockError) },
            },
        );
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, EXAMPLE_CSV);

        let result = importer.import_file(&path);

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert!(path.exists(), "import file should not be deleted on failure");
        assert_eq!(transactions.get_all(), Ok(vec![]));
    }

    #[test]
    fn import_file_missing_file_is_io_error() {
        let (importer, _, _) = get_test_importer();
        let dir = tempfile::tempdir().unwrap();

        let result = importer.import_file(&dir.path().join("missing.csv"));

        assert!(matches!(result, Err(Error::Io(_))), "got {result:?}");
    }

    #[test]
    fn cleanup_failure_is_reported_without_losing_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, EXAMPLE_CSV);
        let path_to_remove = path.clone();
        let (categories, transactions) = get_test_stores();
        let importer = TransactionImporter::new(
            categories,
            FaultyTransactionStore {
                inner: transactions.clone(),
                // Deleting the file here makes the cleanup step fail.
                before_import: move || {
                    fs::remove_file(&path_to_remove).map_err(Error::from)
                },
            },
        );

        let report = importer.import_file(&path).expect("Import should succeed");

        assert_eq!(titles(&report.transactions), vec!["Salary", "Rent"]);
        assert!(
            matches!(report.cleanup_error, Some(Error::CleanupFailed { .. })),
            "got {:?}",
            report.cleanup_error
        );
        assert_eq!(transactions.get_all(), Ok(report.transactions));
    }

    #[test]
    fn balance_matches_independent_sum_after_import() {
        let (importer, _, transactions) = get_test_importer();
        let csv = "title,type,value,category\n\
            A,income,100.10,X\n\
            B,outcome,20.05,Y\n\
            C,income,0.01,X\n\
            D,outcome,50,Y";

        let imported = importer.import_from_reader(csv.as_bytes()).unwrap();

        let want = Balance::from_entries(
            imported
                .iter()
                .map(|transaction| (transaction.transaction_type, transaction.value)),
        )
        .unwrap();
        assert_eq!(transactions.get_balance(), Ok(want));
        assert_eq!(want.total, dec!(30.06));
        assert_eq!(
            imported
                .iter()
                .filter(|transaction| transaction.transaction_type == TransactionType::Income)
                .count(),
            2
        );
    }
}
