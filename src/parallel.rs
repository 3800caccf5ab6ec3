/// File-level parallel execution of template processing.
///
/// Each file runs its own extraction session, so files are independent and
/// are spread over the rayon thread pool.
use crate::file_processor::FileOutcome;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Configuration for parallel execution
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable/disable parallel execution
    pub enabled: bool,
    /// Number of threads to use (None = auto-detect)
    pub thread_count: Option<usize>,
    /// Minimum number of files to enable parallel execution
    pub min_file_count: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            thread_count: None,
            min_file_count: 2,
        }
    }
}

pub struct FileParallelProcessor {
    config: ParallelConfig,
}

impl FileParallelProcessor {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(ParallelConfig::default())
    }

    /// Run `process` on every file. Outcomes keep the order of `files`.
    pub fn process_files<F>(&self, files: &[String], process: F) -> Vec<FileOutcome>
    where
        F: Fn(&str) -> FileOutcome + Send + Sync,
    {
        if !self.should_use_parallel(files) {
            return files.iter().map(|path| process(path)).collect();
        }

        #[cfg(feature = "parallel")]
        {
            if let Some(thread_count) = self.config.thread_count
                && let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(thread_count).build_global()
            {
                log::warn!("Failed to set thread pool size to {thread_count}: {e}");
            }
            files.par_iter().map(|path| process(path)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            files.iter().map(|path| process(path)).collect()
        }
    }

    /// Determine if file-level parallel processing should be used
    pub fn should_use_parallel(&self, files: &[String]) -> bool {
        if !self.config.enabled || files.len() < self.config.min_file_count {
            return false;
        }

        #[cfg(feature = "parallel")]
        {
            rayon::current_num_threads() > 1
        }

        #[cfg(not(feature = "parallel"))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(path: &str) -> FileOutcome {
        FileOutcome {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_is_sequential() {
        let processor = FileParallelProcessor::new(ParallelConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!processor.should_use_parallel(&["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_single_file_is_sequential() {
        let processor = FileParallelProcessor::with_default_config();
        assert!(!processor.should_use_parallel(&["a".to_string()]));
    }

    #[test]
    fn test_order_is_preserved() {
        let files: Vec<String> = (0..50).map(|i| format!("views/{i}.haml")).collect();
        let processor = FileParallelProcessor::with_default_config();
        let outcomes = processor.process_files(&files, outcome);
        let paths: Vec<&str> = outcomes.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, files.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
