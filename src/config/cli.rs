use crate::utils::error::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Where the rendered settings go: a file, or stdout when no path is set.
#[derive(Debug, Clone, Default)]
pub struct OutputTarget {
    path: Option<PathBuf>,
}

impl OutputTarget {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn write(&self, data: &str) -> Result<String> {
        match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, data)?;
                Ok(path.display().to_string())
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(data.as_bytes())?;
                if !data.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
                Ok("<stdout>".to_string())
            }
        }
    }
}
