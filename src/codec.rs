//! Reversible, collision-resistant names for objects inside a trash root.
//!
//! A token has the shape `<base>__<dir>__<stamp>#<counter>`:
//!
//! * `base` is the original file name, kept readable,
//! * `dir` is the parent directory in unpadded base64 over an alphabet
//!   without `/` or `_`, so it can neither split a path nor fake a delimiter,
//! * `stamp` is the source modification time in nanoseconds since the epoch,
//! * `counter` separates tokens that would otherwise be identical.
//!
//! Decoding splits from the right, so base names containing `__` survive.

use crate::errors::{CoreError, Result};
use crate::helpers::{absolutize, unix_nanos};
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::NO_PAD;
use base64::engine::GeneralPurpose;
use base64::Engine as _;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Separator between the three token segments.
pub const SEGMENT_DELIMITER: &str = "__";

/// Separator in front of the disambiguation counter.
pub const COUNTER_DELIMITER: char = '#';

const DIR_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+-") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("directory alphabet must hold 64 unique printable symbols"),
    };

const DIR_ENGINE: GeneralPurpose = GeneralPurpose::new(&DIR_ALPHABET, NO_PAD);

/// Decoded form of an encoded trash name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    base_name: String,
    dir: PathBuf,
    stamp: u128,
    counter: u32,
}

impl Token {
    /// Builds a token for an absolute path with an explicit stamp.
    pub fn new(absolute: &Path, stamp: u128) -> Result<Self> {
        let base_name = absolute
            .file_name()
            .ok_or_else(|| CoreError::InvalidPath(format!("{} has no file name", absolute.display())))?
            .to_str()
            .ok_or_else(|| CoreError::InvalidPath(format!("{} is not valid UTF-8", absolute.display())))?
            .to_string();
        let dir = absolute.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        if dir.to_str().is_none() {
            return Err(CoreError::InvalidPath(format!("{} is not valid UTF-8", dir.display())));
        }

        Ok(Self {
            base_name,
            dir,
            stamp,
            counter: 0,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stamp(&self) -> u128 {
        self.stamp
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Location the token was derived from.
    pub fn original_path(&self) -> PathBuf {
        self.dir.join(&self.base_name)
    }

    /// Bumps the counter until `exists` no longer reports the rendered name as taken.
    pub fn disambiguate(mut self, exists: impl Fn(&str) -> bool) -> Self {
        while exists(&self.to_string()) {
            self.counter += 1;
        }
        self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `Token::new` rejects non UTF-8 directories.
        let dir = self.dir.to_string_lossy();
        write!(
            f,
            "{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}{COUNTER_DELIMITER}{}",
            self.base_name,
            DIR_ENGINE.encode(dir.as_bytes()),
            self.stamp,
            self.counter
        )
    }
}

/// Encodes `path`, stamping it with the source's modification time.
///
/// A missing source falls back to the current time; any other stat failure
/// (typically a permission problem on an ancestor) is a resolution error.
pub fn encode(path: &Path) -> Result<Token> {
    let absolute = absolutize(path)?;
    let stamp = match fs::symlink_metadata(&absolute) {
        Ok(meta) => meta.modified().map(unix_nanos).unwrap_or_else(|_| unix_nanos(SystemTime::now())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => unix_nanos(SystemTime::now()),
        Err(err) => return Err(CoreError::PathResolution(absolute, err)),
    };
    Token::new(&absolute, stamp)
}

pub fn decode(token: &str) -> Result<Token> {
    let invalid = || CoreError::invalid_token(token);

    let (rest, suffix) = token.rsplit_once(SEGMENT_DELIMITER).ok_or_else(invalid)?;
    let (base_name, encoded_dir) = rest.rsplit_once(SEGMENT_DELIMITER).ok_or_else(invalid)?;
    if base_name.is_empty() || encoded_dir.is_empty() {
        return Err(invalid());
    }

    let (stamp, counter) = match suffix.split_once(COUNTER_DELIMITER) {
        Some((stamp, counter)) => (stamp, parse_digits::<u32>(counter).ok_or_else(invalid)?),
        None => (suffix, 0),
    };
    let stamp = parse_digits::<u128>(stamp).ok_or_else(invalid)?;

    let dir_bytes = DIR_ENGINE.decode(encoded_dir).map_err(|_| invalid())?;
    let dir = String::from_utf8(dir_bytes).map_err(|_| invalid())?;
    if !Path::new(&dir).is_absolute() {
        return Err(invalid());
    }

    Ok(Token {
        base_name: base_name.to_string(),
        dir: PathBuf::from(dir),
        stamp,
        counter,
    })
}

/// Human-facing name for an encoded entry, falling back to the raw name.
pub fn display_name(encoded: &str) -> String {
    decode(encoded)
        .map(|token| token.base_name)
        .unwrap_or_else(|_| encoded.to_string())
}

fn parse_digits<T: std::str::FromStr>(value: &str) -> Option<T> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn round_trip_restores_directory_and_name() {
        let token = Token::new(Path::new("/home/u/report.txt"), 1_700_000_000_123_456_789).unwrap();
        let rendered = token.to_string();
        assert!(rendered.starts_with("report.txt__"));
        assert!(rendered.ends_with("__1700000000123456789#0"));

        let decoded = decode(&rendered).unwrap();
        assert_eq!(decoded, token);
        assert_eq!(decoded.original_path(), PathBuf::from("/home/u/report.txt"));
    }

    #[test]
    fn base_names_with_delimiters_survive() {
        for name in ["a__b", "trailing_", "__lead", "x___y", "with space.txt"] {
            let path = PathBuf::from("/srv/some_dir__x").join(name);
            let token = Token::new(&path, 7).unwrap();
            let decoded = decode(&token.to_string()).unwrap();
            assert_eq!(decoded.original_path(), path, "name {name}");
        }
    }

    #[test]
    fn encoded_directory_is_filesystem_safe() {
        // Bytes that map to `/` and `_` in the standard alphabets.
        let token = Token::new(Path::new("/\u{3ff}\u{3ff}\u{3ff}/f"), 1).unwrap();
        let rendered = token.to_string();
        let encoded_dir = rendered.split(SEGMENT_DELIMITER).nth(1).unwrap();
        assert!(!encoded_dir.contains('/'));
        assert!(!encoded_dir.contains('_'));
        assert!(!encoded_dir.contains('='));
    }

    #[test]
    fn same_name_from_different_dirs_differs() {
        let a = Token::new(Path::new("/a/notes.md"), 5).unwrap();
        let b = Token::new(Path::new("/b/notes.md"), 5).unwrap();
        assert_ne!(a.to_string(), b.to_string());

        let later = Token::new(Path::new("/a/notes.md"), 6).unwrap();
        assert_ne!(a.to_string(), later.to_string());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for bad in [
            "plain.txt",
            "name__onlyone",
            "name__@@@__12#0",
            "name__Lw__abc#0",
            "name__Lw__12#x",
            "__Lw__12#0",
            "name__dGVzdA__12#0",
        ] {
            let err = decode(bad).unwrap_err();
            assert!(matches!(err, CoreError::InvalidToken(_)), "{bad}");
        }
    }

    #[test]
    fn missing_counter_decodes_as_zero() {
        let token = Token::new(Path::new("/tmp/a"), 99).unwrap();
        let rendered = token.to_string();
        let without_counter = rendered.trim_end_matches("#0");
        assert_eq!(decode(without_counter).unwrap().counter(), 0);
    }

    #[test]
    fn disambiguate_skips_taken_names() {
        let token = Token::new(Path::new("/tmp/a"), 1).unwrap();
        let mut taken = HashSet::new();
        taken.insert(token.to_string());
        taken.insert(token.clone().disambiguate(|_| false).to_string().replace("#0", "#1"));

        let unique = token.disambiguate(|name| taken.contains(name));
        assert_eq!(unique.counter(), 2);
        assert!(unique.to_string().ends_with("#2"));
    }

    #[test]
    fn encode_uses_source_mtime() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.bin");
        fs::write(&file, b"x").unwrap();
        let expected = unix_nanos(fs::metadata(&file).unwrap().modified().unwrap());

        let token = encode(&file).unwrap();
        assert_eq!(token.stamp(), expected);
        assert_eq!(token.original_path(), file);
    }

    #[test]
    fn encode_of_missing_path_still_succeeds() {
        let token = encode(Path::new("/definitely/not/here.txt")).unwrap();
        assert_eq!(token.base_name(), "here.txt");
        assert!(token.stamp() > 0);
    }

    #[test]
    fn root_has_no_base_name() {
        assert!(matches!(encode(Path::new("/")), Err(CoreError::InvalidPath(_))));
    }

    #[test]
    fn display_name_falls_back_to_raw() {
        let token = Token::new(Path::new("/x/photos"), 3).unwrap();
        assert_eq!(display_name(&token.to_string()), "photos");
        assert_eq!(display_name("legacy"), "legacy");
    }
}
