use std::fmt::Display;
use std::path::PathBuf;

// Marker for the error kinds that can be wrapped with a location
pub trait ErrorType: std::error::Error + PartialEq {}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Location { file: file.into(), line: 0 }
    }

    pub fn line(file: impl Into<PathBuf>, line: usize) -> Self {
        Location { file: file.into(), line }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Error<T: ErrorType> {
    pub location: Location,
    pub error: T,
}

impl<T: ErrorType> Error<T> {
    pub fn at(location: Location, error: T) -> Self {
        Error { location, error }
    }
}

impl<T: ErrorType> Display for Error<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.location, self.error)
    }
}

impl<T: ErrorType + 'static> std::error::Error for Error<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Errors<T> = Vec<Error<T>>;

// Terminal rendering used by the command line: location in red, message bold
pub fn paint<T: ErrorType>(error: &Error<T>) -> String {
    format!("\x1b[31;49;1m[{}]\x1b[39;49;1m  {}\x1b[0m", error.location, error.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("broken")]
    struct Broken;

    impl ErrorType for Broken {}

    #[test]
    fn location_without_line_shows_only_file() {
        assert_eq!(Location::file("g.txt").to_string(), "g.txt");
        assert_eq!(Location::line("g.txt", 4).to_string(), "g.txt:4");
    }

    #[test]
    fn located_error_display() {
        let error = Error::at(Location::line("g.txt", 2), Broken);
        assert_eq!(error.to_string(), "[g.txt:2] broken");
        assert!(paint(&error).contains("g.txt:2"));
    }
}
