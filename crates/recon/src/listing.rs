//! File-store listings: paged traversal, folder filtering, and the on-disk
//! listing formats the CLI reads.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::SyncError;
use crate::model::{Entry, SourceFile};
use crate::registry::collapse_whitespace;

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// One page of a listing. `cursor` is present when more pages follow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A listing served in pages: one call for the first page, then one per
/// continuation cursor.
pub trait PageSource {
    type Error;

    fn first_page(&mut self) -> Result<Page, Self::Error>;
    fn next_page(&mut self, cursor: &str) -> Result<Page, Self::Error>;
}

impl<S: PageSource + ?Sized> PageSource for &mut S {
    type Error = S::Error;

    fn first_page(&mut self) -> Result<Page, Self::Error> {
        (**self).first_page()
    }

    fn next_page(&mut self, cursor: &str) -> Result<Page, Self::Error> {
        (**self).next_page(cursor)
    }
}

/// Pages already fetched and stored in order, e.g. in a snapshot. Page
/// `n + 1` continues the cursor of page `n`.
#[derive(Debug, Clone)]
pub struct PageList<'a> {
    pages: &'a [Page],
    served: usize,
}

impl<'a> PageList<'a> {
    pub fn new(pages: &'a [Page]) -> Self {
        Self { pages, served: 0 }
    }
}

impl PageSource for PageList<'_> {
    type Error = SyncError;

    fn first_page(&mut self) -> Result<Page, SyncError> {
        self.served = 1;
        Ok(self.pages.first().cloned().unwrap_or_default())
    }

    fn next_page(&mut self, cursor: &str) -> Result<Page, SyncError> {
        let previous = self.served.checked_sub(1).and_then(|i| self.pages.get(i));
        let continues = previous.and_then(|p| p.cursor.as_deref()) == Some(cursor);
        match self.pages.get(self.served) {
            Some(page) if continues => {
                self.served += 1;
                Ok(page.clone())
            }
            _ => Err(SyncError::SnapshotParse(format!(
                "listing cursor '{cursor}' has no following page"
            ))),
        }
    }
}

/// Lazy single pass over every entry of every page.
///
/// Pages are fetched on demand. The first fetch error is yielded once and
/// ends the iteration.
pub fn paginate<S: PageSource>(source: S) -> Paginate<S> {
    Paginate {
        source,
        buffer: VecDeque::new(),
        cursor: None,
        started: false,
        done: false,
    }
}

pub struct Paginate<S> {
    source: S,
    buffer: VecDeque<Entry>,
    cursor: Option<String>,
    started: bool,
    done: bool,
}

impl<S: PageSource> Iterator for Paginate<S> {
    type Item = Result<Entry, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }

            let fetched = if !self.started {
                self.started = true;
                self.source.first_page()
            } else if let Some(cursor) = self.cursor.take() {
                self.source.next_page(&cursor)
            } else {
                self.done = true;
                return None;
            };

            match fetched {
                Ok(page) => {
                    self.buffer.extend(page.entries);
                    self.cursor = page.cursor;
                    if self.cursor.is_none() {
                        self.done = true;
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Partition a listing into files and folder names, keeping order.
pub fn split_entries(entries: impl IntoIterator<Item = Entry>) -> (Vec<SourceFile>, Vec<String>) {
    let mut files = Vec::new();
    let mut folders = Vec::new();
    for entry in entries {
        match entry {
            Entry::File(file) => files.push(file),
            Entry::Folder { name } => folders.push(name),
        }
    }
    (files, folders)
}

// ---------------------------------------------------------------------------
// Folder filter
// ---------------------------------------------------------------------------

/// Which folders a run processes.
///
/// A folder passes when it is not ignored and, if an allowed list is set,
/// appears on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderFilter {
    ignore: BTreeSet<String>,
    allowed: BTreeSet<String>,
}

impl FolderFilter {
    pub fn from_lists(ignore: &str, allowed: &str) -> Self {
        Self {
            ignore: parse_folder_list(ignore),
            allowed: parse_folder_list(allowed),
        }
    }

    /// Load both lists. A list that cannot be read is treated as empty.
    pub fn load(ignore: Option<&Path>, allowed: Option<&Path>) -> Self {
        Self {
            ignore: ignore.map(load_folder_list).unwrap_or_default(),
            allowed: allowed.map(load_folder_list).unwrap_or_default(),
        }
    }

    pub fn allows(&self, folder: &str) -> bool {
        let key = collapse_whitespace(folder);
        !self.ignore.contains(&key) && (self.allowed.is_empty() || self.allowed.contains(&key))
    }

    /// Split `folders` into (kept, skipped), both in input order.
    pub fn apply<'a>(&self, folders: impl IntoIterator<Item = &'a str>) -> (Vec<&'a str>, Vec<&'a str>) {
        folders.into_iter().partition(|f| self.allows(f))
    }

    pub fn is_empty(&self) -> bool {
        self.ignore.is_empty() && self.allowed.is_empty()
    }
}

/// One folder per line. Blank lines are skipped; a line holding a path
/// separator names a path, not a folder, and is dropped.
pub fn parse_folder_list(text: &str) -> BTreeSet<String> {
    let mut folders = BTreeSet::new();
    for (n, line) in text.lines().enumerate() {
        let name = collapse_whitespace(line);
        if name.is_empty() {
            continue;
        }
        if name.contains('/') || name.contains('\\') {
            tracing::warn!(line = n + 1, entry = %name, "folder list entry contains a path separator, ignored");
            continue;
        }
        folders.insert(name);
    }
    folders
}

fn load_folder_list(path: &Path) -> BTreeSet<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_folder_list(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "folder list not loaded, using empty list");
            BTreeSet::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Listing formats
// ---------------------------------------------------------------------------

/// Parse a source listing: CSV with a `name` column and an optional
/// `modified` column.
pub fn parse_source_listing_csv(csv_data: &str) -> Result<Vec<SourceFile>, SyncError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SyncError::ListingParse {
            line: 1,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let name_idx = headers
        .iter()
        .position(|h| h == "name")
        .ok_or_else(|| SyncError::ListingParse {
            line: 1,
            message: "missing 'name' column".into(),
        })?;
    let modified_idx = headers.iter().position(|h| h == "modified");

    let mut files = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SyncError::ListingParse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let name = record.get(name_idx).unwrap_or("");
        if name.is_empty() {
            return Err(SyncError::ListingParse {
                line,
                message: "empty file name".into(),
            });
        }

        let modified = match modified_idx.and_then(|i| record.get(i)) {
            None | Some("") => None,
            Some(value) => Some(parse_modified(value).ok_or_else(|| SyncError::DateParse {
                file: name.into(),
                value: value.into(),
            })?),
        };

        files.push(SourceFile {
            name: name.to_string(),
            modified,
        });
    }

    Ok(files)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or `YYYY-MM-DD` (midnight UTC).
pub fn parse_modified(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse a target listing: one file name per line, blank lines skipped.
pub fn parse_target_listing(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;

    fn file(name: &str) -> Entry {
        Entry::File(SourceFile {
            name: name.into(),
            modified: None,
        })
    }

    fn folder(name: &str) -> Entry {
        Entry::Folder { name: name.into() }
    }

    /// Pages keyed by cursor; fails on a cursor named "boom".
    struct Pages {
        pages: Vec<Page>,
        calls: usize,
    }

    impl PageSource for Pages {
        type Error = String;

        fn first_page(&mut self) -> Result<Page, String> {
            self.calls += 1;
            Ok(self.pages[0].clone())
        }

        fn next_page(&mut self, cursor: &str) -> Result<Page, String> {
            self.calls += 1;
            if cursor == "boom" {
                return Err("listing failed".into());
            }
            let idx: usize = cursor.parse().map_err(|_| "bad cursor".to_string())?;
            Ok(self.pages[idx].clone())
        }
    }

    #[test]
    fn paginate_walks_all_pages_in_order() {
        let source = Pages {
            pages: vec![
                Page { entries: vec![file("a.pdf"), folder("Smith, John")], cursor: Some("1".into()) },
                Page { entries: vec![], cursor: Some("2".into()) },
                Page { entries: vec![file("b.pdf")], cursor: None },
            ],
            calls: 0,
        };
        let names: Vec<String> = paginate(source)
            .map(|e| e.unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "Smith, John", "b.pdf"]);
    }

    #[test]
    fn paginate_is_lazy() {
        let mut source = Pages {
            pages: vec![
                Page { entries: vec![file("a.pdf")], cursor: Some("1".into()) },
                Page { entries: vec![file("b.pdf")], cursor: None },
            ],
            calls: 0,
        };
        {
            let mut iter = paginate(&mut source);
            assert!(iter.next().is_some());
        }
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn paginate_stops_after_error() {
        let source = Pages {
            pages: vec![Page { entries: vec![file("a.pdf")], cursor: Some("boom".into()) }],
            calls: 0,
        };
        let items: Vec<Result<Entry, String>> = paginate(source).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err(), "listing failed");
    }

    #[test]
    fn page_list_follows_cursors() {
        let pages: Vec<Page> = serde_json::from_str(
            r#"[
                {"entries": [{"kind": "file", "name": "App.pdf", "modified": "2023-06-01T10:00:00Z"}], "cursor": "c1"},
                {"entries": [{"kind": "folder", "name": "Scans"}, {"kind": "file", "name": "DL.jpeg"}]}
            ]"#,
        )
        .unwrap();
        let entries: Vec<Entry> = paginate(PageList::new(&pages)).collect::<Result<_, _>>().unwrap();
        let (files, folders) = split_entries(entries);
        assert_eq!(files.len(), 2);
        assert!(files[0].modified.is_some());
        assert_eq!(folders, vec!["Scans"]);
    }

    #[test]
    fn page_list_dangling_cursor_is_an_error() {
        let pages = vec![Page { entries: vec![file("a.pdf")], cursor: Some("more".into()) }];
        let items: Vec<Result<Entry, SyncError>> = paginate(PageList::new(&pages)).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(SyncError::SnapshotParse(_))));
    }

    #[test]
    fn page_list_empty() {
        assert_eq!(paginate(PageList::new(&[])).count(), 0);
    }

    #[test]
    fn split_entries_partitions() {
        let (files, folders) = split_entries(vec![file("a.pdf"), folder("X"), file("b.pdf")]);
        assert_eq!(files.len(), 2);
        assert_eq!(folders, vec!["X"]);
    }

    #[test]
    fn folder_filter_ignore_and_allowed() {
        let filter = FolderFilter::from_lists("Old Client\n\nArchive/2020\n", "");
        assert!(!filter.allows("Old Client"));
        assert!(!filter.allows("  Old   Client "));
        assert!(filter.allows("Smith, John"));

        let filter = FolderFilter::from_lists("Old Client", "Smith, John\nOld Client");
        assert!(filter.allows("Smith, John"));
        assert!(!filter.allows("Old Client"));
        assert!(!filter.allows("Doe, Jane"));

        let (kept, skipped) = filter.apply(["Doe, Jane", "Smith, John"]);
        assert_eq!(kept, vec!["Smith, John"]);
        assert_eq!(skipped, vec!["Doe, Jane"]);
    }

    #[test]
    fn path_entries_are_rejected() {
        let list = parse_folder_list("a/b\nc\\d\nSmith, John");
        assert_eq!(list.len(), 1);
        assert!(list.contains("Smith, John"));
    }

    #[test]
    fn folder_filter_load_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut allowed = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        writeln!(allowed, "Smith, John").unwrap();

        let filter = FolderFilter::load(Some(&dir.path().join("absent.txt")), Some(allowed.path()));
        assert!(filter.allows("Smith, John"));
        assert!(!filter.allows("Doe, Jane"));

        assert!(FolderFilter::load(None, None).is_empty());
    }

    #[test]
    fn source_listing_formats() {
        let csv = "name,modified\n\
                   App.pdf,2023-06-01T10:00:00Z\n\
                   DL.jpeg,2023-06-02 08:15:00\n\
                   Scan.png,2023-06-03\n\
                   notes.txt,\n";
        let files = parse_source_listing_csv(csv).unwrap();
        assert_eq!(files.len(), 4);
        let m0 = files[0].modified.unwrap();
        assert_eq!((m0.year(), m0.month(), m0.day(), m0.hour()), (2023, 6, 1, 10));
        assert_eq!(files[1].modified.unwrap().minute(), 15);
        assert_eq!(files[2].modified.unwrap().day(), 3);
        assert!(files[3].modified.is_none());
    }

    #[test]
    fn source_listing_name_only() {
        let files = parse_source_listing_csv("name\nApp.pdf\n").unwrap();
        assert_eq!(files[0].name, "App.pdf");
        assert!(files[0].modified.is_none());
    }

    #[test]
    fn source_listing_quoted_commas() {
        let files = parse_source_listing_csv("name,modified\n\"Smith, John.pdf\",2024-01-15\n").unwrap();
        assert_eq!(files[0].name, "Smith, John.pdf");
    }

    #[test]
    fn source_listing_errors() {
        let err = parse_source_listing_csv("file,modified\nApp.pdf,\n").unwrap_err();
        assert!(err.to_string().contains("missing 'name' column"));

        let err = parse_source_listing_csv("name,modified\nApp.pdf,June 1st\n").unwrap_err();
        assert!(matches!(err, SyncError::DateParse { .. }));
        assert!(err.to_string().contains("June 1st"));

        let err = parse_source_listing_csv("name,modified\n,2023-06-01\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn target_listing_lines() {
        let names = parse_target_listing("1. 230601 App.pdf [PDF]\n\n  230602 DL.jpeg [IMG]  \n");
        assert_eq!(names, vec!["1. 230601 App.pdf [PDF]", "230602 DL.jpeg [IMG]"]);
    }
}
