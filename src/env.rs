use std::env;
use std::path::PathBuf;

/// Directory the downloaded build archives live in.
///
/// The archives sit next to the installed binary, mirroring where the
/// original installer kept them. When the executable path cannot be
/// resolved the current directory is used instead.
pub fn archive_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_dir_is_never_empty() {
        let dir = archive_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
