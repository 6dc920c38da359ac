use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref SPREADSHEET_NAME: Regex = Regex::new(r"\.xlsx?$").unwrap();
}

pub const SPREADSHEET_ICON: &str = "/icons/icon-excel.png";
pub const GENERIC_ICON: &str = "/icons/file-icon.png";

/// A file picked by the user.
///
/// Identity is positional: two entries with the same name and contents are still two entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        SelectedFile {
            name: name.into(),
            contents,
        }
    }

    /// Read a file from disk, keeping only its file name for display.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(SelectedFile { name, contents })
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn icon(&self) -> FileIcon {
        FileIcon::for_name(&self.name)
    }
}

/// Icon shown next to a selected file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileIcon {
    Spreadsheet,
    Generic,
}

impl FileIcon {
    pub fn for_name(name: &str) -> Self {
        if SPREADSHEET_NAME.is_match(name) {
            FileIcon::Spreadsheet
        } else {
            FileIcon::Generic
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            FileIcon::Spreadsheet => SPREADSHEET_ICON,
            FileIcon::Generic => GENERIC_ICON,
        }
    }
}

/// Ordered multi-file selection. Insertion order is display order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileList {
    files: Vec<SelectedFile>,
}

impl FileList {
    /// Append picked files to the end of the list
    ///
    /// Nothing is deduplicated: picking the same file twice lists it twice.
    ///
    /// # Arguments
    /// * `files` - Files in the order they were picked
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::{FileList, SelectedFile};
    ///
    /// let mut list = FileList::default();
    /// list.add_files([SelectedFile::new("a.xlsx", vec![]), SelectedFile::new("b.xlsx", vec![])]);
    /// list.add_files([SelectedFile::new("c.xlsx", vec![])]);
    /// let names: Vec<&str> = list.files().iter().map(|f| f.name.as_str()).collect();
    /// assert_eq!(names, ["a.xlsx", "b.xlsx", "c.xlsx"]);
    /// ```
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        self.files.extend(files);
    }

    /// Remove the entry at `index`, shifting later entries down
    ///
    /// # Arguments
    /// * `index` - Position in display order; out of range indexes are ignored
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::{FileList, SelectedFile};
    ///
    /// let mut list = FileList::default();
    /// list.add_files(["a", "b", "c"].map(|n| SelectedFile::new(n, vec![])));
    /// list.remove_at(1);
    /// list.remove_at(7);
    /// let names: Vec<&str> = list.files().iter().map(|f| f.name.as_str()).collect();
    /// assert_eq!(names, ["a", "c"]);
    /// ```
    pub fn remove_at(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
        }
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Single-file selection slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSlot {
    file: Option<SelectedFile>,
}

impl FileSlot {
    /// Replace the slot with the first picked file
    ///
    /// # Arguments
    /// * `files` - The pick; only its first file is kept, an empty pick leaves the slot alone
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::{FileSlot, SelectedFile};
    ///
    /// let mut slot = FileSlot::default();
    /// slot.add_files([SelectedFile::new("old.xlsx", vec![])]);
    /// slot.add_files([SelectedFile::new("new.xlsx", vec![]), SelectedFile::new("extra.xlsx", vec![])]);
    /// slot.add_files(Vec::new());
    /// assert_eq!(slot.file().map(|f| f.name.as_str()), Some("new.xlsx"));
    /// ```
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        if let Some(first) = files.into_iter().next() {
            self.file = Some(first);
        }
    }

    /// Empty the slot
    pub fn clear_single(&mut self) {
        self.file = None;
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn is_filled(&self) -> bool {
        self.file.is_some()
    }
}

/// Everything one upload form has selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormSelection {
    /// One input file plus the tracker.
    Single { input: FileSlot, tracker: FileSlot },
    /// Any number of input files plus the tracker.
    Batch { inputs: FileList, tracker: FileSlot },
}

impl FormSelection {
    pub fn single() -> Self {
        FormSelection::Single {
            input: FileSlot::default(),
            tracker: FileSlot::default(),
        }
    }

    pub fn batch() -> Self {
        FormSelection::Batch {
            inputs: FileList::default(),
            tracker: FileSlot::default(),
        }
    }

    /// Add input files to the form
    ///
    /// # Arguments
    /// * `files` - Appended for a batch form; for a single form the first one replaces the slot
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::{FormSelection, SelectedFile};
    ///
    /// let mut latest = FormSelection::single();
    /// latest.add_inputs([SelectedFile::new("mon.xlsx", vec![])]);
    /// latest.add_inputs([SelectedFile::new("tue.xlsx", vec![])]);
    /// assert_eq!(latest.inputs().len(), 1);
    ///
    /// let mut backlog = FormSelection::batch();
    /// backlog.add_inputs([SelectedFile::new("mon.xlsx", vec![])]);
    /// backlog.add_inputs([SelectedFile::new("tue.xlsx", vec![])]);
    /// assert_eq!(backlog.inputs().len(), 2);
    /// ```
    pub fn add_inputs(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        match self {
            FormSelection::Single { input, .. } => input.add_files(files),
            FormSelection::Batch { inputs, .. } => inputs.add_files(files),
        }
    }

    /// Put the tracker file in its slot, replacing any earlier one
    pub fn add_tracker(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        self.tracker_mut().add_files(files);
    }

    /// Remove a batch input by position. The single form's input slot is index 0.
    pub fn remove_input(&mut self, index: usize) {
        match self {
            FormSelection::Single { input, .. } if index == 0 => input.clear_single(),
            FormSelection::Single { .. } => {}
            FormSelection::Batch { inputs, .. } => inputs.remove_at(index),
        }
    }

    pub fn clear_tracker(&mut self) {
        self.tracker_mut().clear_single();
    }

    pub fn inputs(&self) -> Vec<&SelectedFile> {
        match self {
            FormSelection::Single { input, .. } => input.file().into_iter().collect(),
            FormSelection::Batch { inputs, .. } => inputs.files().iter().collect(),
        }
    }

    pub fn tracker(&self) -> Option<&SelectedFile> {
        match self {
            FormSelection::Single { tracker, .. } | FormSelection::Batch { tracker, .. } => {
                tracker.file()
            }
        }
    }

    fn tracker_mut(&mut self) -> &mut FileSlot {
        match self {
            FormSelection::Single { tracker, .. } | FormSelection::Batch { tracker, .. } => {
                tracker
            }
        }
    }

    /// True once every required file is present.
    pub fn is_complete(&self) -> bool {
        !self.inputs().is_empty() && self.tracker().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> SelectedFile {
        SelectedFile::new(name, name.as_bytes().to_vec())
    }

    fn names(list: &FileList) -> Vec<&str> {
        list.files().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn add_files_appends_in_order() {
        let mut list = FileList::default();
        list.add_files([file("A"), file("B")]);
        list.add_files([file("C")]);
        assert_eq!(names(&list), ["A", "B", "C"]);
    }

    #[test]
    fn remove_at_shifts_later_entries() {
        let mut list = FileList::default();
        list.add_files([file("A"), file("B"), file("C")]);
        list.remove_at(1);
        assert_eq!(names(&list), ["A", "C"]);
    }

    #[test]
    fn remove_at_out_of_range_is_a_no_op() {
        let mut list = FileList::default();
        list.add_files([file("A")]);
        list.remove_at(5);
        assert_eq!(names(&list), ["A"]);
    }

    #[test]
    fn duplicates_are_distinct_entries() {
        let mut list = FileList::default();
        list.add_files([file("same.xlsx"), file("same.xlsx")]);
        assert_eq!(list.len(), 2);
        list.remove_at(0);
        assert_eq!(names(&list), ["same.xlsx"]);
    }

    #[test]
    fn slot_keeps_first_of_pick_and_ignores_empty_pick() {
        let mut slot = FileSlot::default();
        slot.add_files([file("one"), file("two")]);
        assert_eq!(slot.file().map(|f| f.name.as_str()), Some("one"));

        slot.add_files(Vec::new());
        assert!(slot.is_filled());

        slot.add_files([file("three")]);
        assert_eq!(slot.file().map(|f| f.name.as_str()), Some("three"));

        slot.clear_single();
        assert!(!slot.is_filled());
    }

    #[test]
    fn completeness_requires_input_and_tracker() {
        let mut batch = FormSelection::batch();
        assert!(!batch.is_complete());
        batch.add_tracker([file("tracker.xlsx")]);
        assert!(!batch.is_complete());
        batch.add_inputs([file("a.xlsx")]);
        assert!(batch.is_complete());
        batch.remove_input(0);
        assert!(!batch.is_complete());

        let mut single = FormSelection::single();
        single.add_inputs([file("a.xlsx")]);
        assert!(!single.is_complete());
        single.add_tracker([file("t.xlsx")]);
        assert!(single.is_complete());
        single.clear_tracker();
        assert!(!single.is_complete());
    }

    #[test]
    fn icons_follow_extension() {
        assert_eq!(FileIcon::for_name("report.xlsx"), FileIcon::Spreadsheet);
        assert_eq!(FileIcon::for_name("legacy.xls"), FileIcon::Spreadsheet);
        assert_eq!(FileIcon::for_name("notes.txt"), FileIcon::Generic);
        assert_eq!(FileIcon::for_name("report.xlsx.bak").path(), GENERIC_ICON);
    }
}
