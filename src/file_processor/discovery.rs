//! Template discovery.

use crate::config::GlobalConfig;
use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use std::path::Path;
use thiserror::Error;

pub const TEMPLATE_EXTENSION: &str = "haml";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Collect the templates to lint.
///
/// Directories are walked for `*.haml` files, honoring the include and
/// exclude patterns and, if enabled, ignore files. Explicitly named files are
/// taken as they are unless an exclude pattern matches them.
pub fn find_haml_files(paths: &[String], global: &GlobalConfig) -> Result<Vec<String>, DiscoveryError> {
    let paths: Vec<String> = if paths.is_empty() {
        vec![".".to_string()]
    } else {
        paths.to_vec()
    };

    let excludes = build_overrides(&[], &global.exclude)?;
    let include_patterns = if global.include.is_empty() {
        vec![format!("*.{TEMPLATE_EXTENSION}")]
    } else {
        global.include.clone()
    };
    let walk_overrides = build_overrides(&include_patterns, &global.exclude)?;

    let mut file_paths = Vec::new();
    let mut directories = Vec::new();
    for path_str in &paths {
        let path = Path::new(path_str);
        if !path.exists() {
            return Err(DiscoveryError::NotFound(path_str.clone()));
        }
        if path.is_file() {
            let cleaned = clean_path(path_str);
            if is_excluded(&excludes, Path::new(&cleaned)) {
                log::warn!("{cleaned} ignored because of an exclude pattern");
            } else {
                file_paths.push(cleaned);
            }
        } else {
            directories.push(path_str.clone());
        }
    }

    if let Some((first, rest)) = directories.split_first() {
        let mut walk_builder = WalkBuilder::new(first);
        for path in rest {
            walk_builder.add(path);
        }
        walk_builder.overrides(walk_overrides);

        let use_gitignore = global.respect_gitignore;
        walk_builder.ignore(use_gitignore);
        walk_builder.git_ignore(use_gitignore);
        walk_builder.git_global(use_gitignore);
        walk_builder.git_exclude(use_gitignore);
        walk_builder.parents(use_gitignore);
        walk_builder.hidden(false);
        walk_builder.require_git(false);
        walk_builder.add_custom_ignore_filename(".hamlintignore");

        for result in walk_builder.build() {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
                        file_paths.push(clean_path(&path.to_string_lossy()));
                    }
                }
                Err(err) => log::warn!("Error walking directory: {err}"),
            }
        }
    }

    file_paths.sort();
    file_paths.dedup();
    Ok(file_paths)
}

fn build_overrides(includes: &[String], excludes: &[String]) -> Result<Override, DiscoveryError> {
    let mut builder = OverrideBuilder::new(".");
    for pattern in includes {
        builder.add(pattern).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }
    for pattern in excludes {
        // Override globs are whitelists unless negated
        let rule = if pattern.starts_with('!') {
            pattern.clone()
        } else {
            format!("!{pattern}")
        };
        builder.add(&rule).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }
    builder.build().map_err(|e| DiscoveryError::InvalidPattern {
        pattern: excludes.join(","),
        message: e.to_string(),
    })
}

/// Whether the file or any of its parent directories matches an exclude.
fn is_excluded(excludes: &Override, path: &Path) -> bool {
    path.ancestors()
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .any(|ancestor| excludes.matched(ancestor, ancestor != path).is_ignore())
}

fn clean_path(path: &str) -> String {
    path.strip_prefix("./").unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> tempfile::TempDir {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("app/views/users")).unwrap();
        fs::create_dir_all(root.join("vendor/gems")).unwrap();
        fs::write(root.join("app/views/users/show.haml"), "%p\n").unwrap();
        fs::write(root.join("app/views/index.haml"), "%p\n").unwrap();
        fs::write(root.join("app/views/index.erb"), "<p></p>\n").unwrap();
        fs::write(root.join("vendor/gems/lib.haml"), "%p\n").unwrap();
        temp_dir
    }

    fn relative(files: Vec<String>, root: &Path) -> Vec<String> {
        files
            .into_iter()
            .map(|f| {
                Path::new(&f)
                    .strip_prefix(root)
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or(f)
            })
            .collect()
    }

    #[test]
    fn test_walk_finds_haml_files() {
        let temp_dir = setup();
        let root = temp_dir.path();
        let files = find_haml_files(&[root.to_string_lossy().to_string()], &GlobalConfig::default()).unwrap();
        assert_eq!(
            relative(files, root),
            vec!["app/views/index.haml", "app/views/users/show.haml", "vendor/gems/lib.haml"]
        );
    }

    #[test]
    fn test_exclude_pattern() {
        let temp_dir = setup();
        let root = temp_dir.path();
        let global = GlobalConfig {
            exclude: vec!["vendor".to_string()],
            ..Default::default()
        };
        let files = find_haml_files(&[root.to_string_lossy().to_string()], &global).unwrap();
        assert_eq!(
            relative(files, root),
            vec!["app/views/index.haml", "app/views/users/show.haml"]
        );
    }

    #[test]
    fn test_gitignore_respected() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::write(root.join(".gitignore"), "users/\n").unwrap();
        let dir = root.to_string_lossy().to_string();

        let files = find_haml_files(std::slice::from_ref(&dir), &GlobalConfig::default()).unwrap();
        assert!(!files.iter().any(|f| f.contains("users")));

        let global = GlobalConfig {
            respect_gitignore: false,
            ..Default::default()
        };
        let files = find_haml_files(&[dir], &global).unwrap();
        assert!(files.iter().any(|f| f.contains("users")));
    }

    #[test]
    fn test_explicit_file_and_missing_path() {
        let temp_dir = setup();
        let root = temp_dir.path();
        let erb = root.join("app/views/index.erb").to_string_lossy().to_string();
        let files = find_haml_files(std::slice::from_ref(&erb), &GlobalConfig::default()).unwrap();
        assert_eq!(files, vec![erb]);

        let missing = root.join("nope.haml").to_string_lossy().to_string();
        assert!(matches!(
            find_haml_files(&[missing], &GlobalConfig::default()),
            Err(DiscoveryError::NotFound(_))
        ));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./a/b.haml"), "a/b.haml");
        assert_eq!(clean_path("a/b.haml"), "a/b.haml");
    }
}
