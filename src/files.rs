use memchr::memmem;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

// Файл из обходимого дерева. Нижний регистр считается один раз при создании,
// фильтр сравнивает без аллокаций.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
    pub size: u64,
    lower_name: String,
    lower_extension: String,
}

impl FileEntry {
    // Размер берётся из метаданных; если файл недоступен, то 0
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
        Self::with_size(path, size)
    }

    pub fn with_size(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Расширение с точкой: ".txt"
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Self {
            lower_name: name.to_lowercase(),
            lower_extension: extension.to_lowercase(),
            path,
            name,
            extension,
            size,
        }
    }

    // Аргументы должны быть уже в нижнем регистре.
    // Пустая или пробельная строка совпадает со всем.
    pub fn matches(&self, name: &str, extension: &str) -> bool {
        contains_needle(&self.lower_name, name) && contains_needle(&self.lower_extension, extension)
    }

    #[inline]
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }
}

#[inline]
fn contains_needle(haystack: &str, needle: &str) -> bool {
    needle.trim().is_empty() || memmem::find(haystack.as_bytes(), needle.as_bytes()).is_some()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    name: String,
    extension: String,
}

impl FileQuery {
    pub fn new(name: &str, extension: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            extension: extension.to_lowercase(),
        }
    }

    #[inline]
    pub fn matches(&self, entry: &FileEntry) -> bool {
        entry.matches(&self.name, &self.extension)
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.extension.trim().is_empty()
    }

    pub fn into_predicate(self) -> impl Fn(&FileEntry) -> bool + Send + Sync + 'static {
        move |entry: &FileEntry| self.matches(entry)
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes > GB {
        format!("{}GB", bytes / GB)
    } else if bytes > MB {
        format!("{}MB", bytes / MB)
    } else if bytes > KB {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes}B")
    }
}

// Ленивый обход в глубину: сначала файлы каталога, потом его подкаталоги,
// внутри каталога порядок по имени. Недоступные записи пропускаются.
// Ссылки не раскрываются; ссылка попадает в выдачу, только если ведёт на файл.
pub struct WalkFiles {
    inner: walkdir::IntoIter,
}

pub fn walk_files(root: impl AsRef<Path>) -> WalkFiles {
    let inner = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| {
            (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
        })
        .into_iter();
    WalkFiles { inner }
}

fn is_walked_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    // Битая ссылка или ссылка на каталог файлом не считается
    file_type.is_symlink() && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
}

impl Iterator for WalkFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) if is_walked_file(&entry) => return Some(entry.into_path()),
                Ok(_) => continue,
                Err(err) => {
                    tracing::debug!(error = %err, "walk entry skipped");
                }
            }
        }
    }
}
