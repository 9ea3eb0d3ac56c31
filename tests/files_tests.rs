#[cfg(test)]
mod tests {
    use virtual_window::{
        BulkLoader,
        VirtualWindow,
        WindowConfig,
        files::{FileEntry, FileQuery, walk_files},
        scroll::{ScrollPosition, ScrollStager},
    };
    use std::{fs, path::Path};
    use tempfile::TempDir;

    fn create_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b.log"), b"log line").unwrap();
        fs::write(root.join("a.txt"), vec![0u8; 2048]).unwrap();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("sub/c.txt"), b"c").unwrap();
        fs::write(root.join("sub/deeper/d.TXT"), b"d").unwrap();
        fs::create_dir(root.join("z")).unwrap();
        fs::write(root.join("z/e.md"), b"# e").unwrap();
        dir
    }

    fn relative(root: &Path, path: &Path) -> String {
        path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_walk_order() {
        let dir = create_tree();
        let walked: Vec<String> = walk_files(dir.path())
            .map(|path| relative(dir.path(), &path))
            .collect();
        assert_eq!(walked, vec!["a.txt", "b.log", "sub/c.txt", "sub/deeper/d.TXT", "z/e.md"]);
    }

    #[test]
    fn test_walk_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(walk_files(dir.path().join("missing")).count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_directory_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/x.txt"), b"x").unwrap();
        symlink(root.join("real"), root.join("link")).unwrap();
        symlink(root.join("real/x.txt"), root.join("alias.txt")).unwrap();
        symlink(root.join("missing"), root.join("broken")).unwrap();

        let walked: Vec<String> = walk_files(root)
            .map(|path| relative(root, &path))
            .collect();
        assert_eq!(walked, vec!["alias.txt", "real/x.txt"]);
    }

    #[test]
    fn test_entry_reads_size() {
        let dir = create_tree();
        let entry = FileEntry::from_path(dir.path().join("a.txt"));
        assert_eq!(entry.size, 2048);
        assert_eq!(entry.formatted_size(), "2KB");
        let missing = FileEntry::from_path(dir.path().join("nope.bin"));
        assert_eq!(missing.size, 0);
        assert_eq!(missing.formatted_size(), "0B");
    }

    #[test]
    fn test_browse_directory() {
        println!("== Browse directory ==");
        let dir = create_tree();
        let loader = BulkLoader::new();
        let task = loader.start(walk_files(dir.path()).map(FileEntry::from_path)).unwrap().unwrap();
        let window = VirtualWindow::new(loader.accumulator(), WindowConfig::new(2));
        loader.block_until(2);
        task.join().unwrap();

        window.set_filter(FileQuery::new("", "TXT").into_predicate());
        window.reset().wait().unwrap();
        let names: Vec<String> = window.items().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
        assert_eq!(window.proxy_size(), 3);
        assert_eq!(window.source_size(), 5);

        let stager = ScrollStager::default();
        let up = ScrollPosition { offset: 100.0, viewport: 100.0, extent: 200.0, delta: 120.0 };
        assert!(!stager.on_scroll(&up, &window));
        let down = ScrollPosition { delta: -120.0, ..up };
        assert!(stager.on_scroll(&down, &window));
        assert!(!stager.on_scroll(&down, &window));
        let names: Vec<String> = window.items().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt", "d.TXT"]);
    }
}
