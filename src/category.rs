/// File categorization table for routing files by extension.
///
/// This module provides the two-level category/subcategory lookup used to
/// decide where a file belongs. The table maps file extensions (lowercase,
/// leading dot) to a `(category, subcategory)` pair; anything unmatched
/// falls back to the implicit default category.
///
/// # Examples
///
/// ```
/// use dirsift::category::CategoryMap;
///
/// let map = CategoryMap::standard();
/// assert_eq!(map.classify(".pdf"), ("Documents", "PDF_Docs"));
/// assert_eq!(map.classify(".JPG"), ("Images", "JPG_Photos"));
/// assert_eq!(map.classify(".xyz"), ("Others", ""));
/// ```

/// Name of the fallback category for extensions with no explicit mapping.
pub const DEFAULT_CATEGORY: &str = "Others";

/// A subcategory bucket: its directory name and the extensions it claims.
#[derive(Debug, Clone)]
pub struct Subcategory {
    /// Directory name of this subcategory (e.g. "PDF_Docs").
    pub name: String,
    /// Claimed extensions, lowercase with leading dot (e.g. ".pdf").
    pub extensions: Vec<String>,
}

/// A top-level category and its ordered subcategories.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    /// Directory name of this category (e.g. "Documents").
    pub name: String,
    pub subcategories: Vec<Subcategory>,
}

/// Ordered extension-to-(category, subcategory) lookup table.
///
/// The table is constructed once (optionally extended from configuration)
/// and treated as immutable for the rest of the run; the engine receives it
/// by reference. Lookup is a linear scan in declaration order, so when an
/// extension were ever listed twice the earlier entry wins.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    entries: Vec<CategoryEntry>,
}

impl CategoryMap {
    /// Creates the standard category table.
    pub fn standard() -> Self {
        let mut map = Self {
            entries: Vec::new(),
        };

        map.add_mapping("Documents", "PDF_Docs", &[".pdf"]);
        map.add_mapping("Documents", "Word_Docs", &[".doc", ".docx"]);
        map.add_mapping("Documents", "Excel_Sheets", &[".xls", ".xlsx", ".csv"]);
        map.add_mapping("Documents", "PowerPoints", &[".ppt", ".pptx"]);
        map.add_mapping("Documents", "Text_Files", &[".txt", ".rtf"]);
        map.add_mapping("Documents", "Ebooks", &[".epub", ".mobi"]);

        map.add_mapping("Images", "JPG_Photos", &[".jpg", ".jpeg"]);
        map.add_mapping("Images", "PNG_Images", &[".png"]);
        map.add_mapping("Images", "Vector_SVG", &[".svg"]);
        map.add_mapping("Images", "Other_Images", &[".gif", ".bmp", ".webp"]);

        map.add_mapping("Media", "Video", &[".mp4", ".mkv", ".mov", ".avi"]);
        map.add_mapping("Media", "Audio", &[".mp3", ".wav", ".flac", ".m4a"]);

        map.add_mapping("Archives", "Compressed", &[".zip", ".rar", ".7z", ".tar", ".gz"]);

        map
    }

    /// Adds extensions to a category/subcategory bucket, creating either
    /// level if it does not exist yet. Extensions are normalized to
    /// lowercase with a leading dot.
    pub fn add_mapping(&mut self, category: &str, subcategory: &str, extensions: &[&str]) {
        let entry_idx = match self.entries.iter().position(|e| e.name == category) {
            Some(idx) => idx,
            None => {
                self.entries.push(CategoryEntry {
                    name: category.to_string(),
                    subcategories: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[entry_idx];

        let sub_idx = match entry
            .subcategories
            .iter()
            .position(|s| s.name == subcategory)
        {
            Some(idx) => idx,
            None => {
                entry.subcategories.push(Subcategory {
                    name: subcategory.to_string(),
                    extensions: Vec::new(),
                });
                entry.subcategories.len() - 1
            }
        };
        let sub = &mut entry.subcategories[sub_idx];

        for ext in extensions {
            let normalized = normalize_extension(ext);
            if !sub.extensions.contains(&normalized) {
                sub.extensions.push(normalized);
            }
        }
    }

    /// Classifies an extension into a `(category, subcategory)` pair.
    ///
    /// The extension is lowercased (leading dot included) before the linear
    /// lookup. Returns `("Others", "")` when no entry matches, including for
    /// empty extensions.
    pub fn classify(&self, extension: &str) -> (&str, &str) {
        let ext = extension.to_lowercase();
        for entry in &self.entries {
            for sub in &entry.subcategories {
                if sub.extensions.iter().any(|e| *e == ext) {
                    return (&entry.name, &sub.name);
                }
            }
        }
        (DEFAULT_CATEGORY, "")
    }

    /// Returns the top-level categories in declaration order.
    pub fn categories(&self) -> &[CategoryEntry] {
        &self.entries
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// Lowercases an extension and ensures it carries a leading dot.
fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}
