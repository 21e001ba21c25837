//! Small string and file helpers shared across the net/constraint parsers and the
//! accelerator driver.

/// String processing utilities
pub mod string {
    /// Rewrite the characters that are forbidden in both SMT-LIB identifiers and this
    /// tool's own `.net` convention: `{`/`}` (bracing some identifiers) are dropped,
    /// `#`/`,` (comment/separator characters elsewhere in the format) become `.` —
    /// matching `original_source/reductron/ptio/ptnet.py::parse_net`'s
    /// `line.replace('#', '.').replace(',', '.')` plus its brace-stripping on id tokens.
    pub fn sanitize_identifier(s: &str) -> String {
        s.chars()
            .filter_map(|c| match c {
                '{' | '}' => None,
                '#' | ',' => Some('.'),
                other => Some(other),
            })
            .collect()
    }

    /// Replace non-alphanumeric characters with underscores, for use in filenames
    /// handed to the external accelerator pipeline.
    pub fn sanitize_filename(s: &str) -> String {
        s.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }
}

/// File and directory utilities
pub mod file {
    use std::fs;
    use std::path::Path;

    /// Ensure a directory exists, creating it and any parents if necessary.
    pub fn ensure_dir_exists(path: &Path) -> std::io::Result<()> {
        fs::create_dir_all(path)
    }
}
