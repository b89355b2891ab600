use std::path::Path;

/// Hands a finished video (or its folder) to the desktop's default handler.
pub fn open_path<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn();
    }

    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(path).spawn();
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let _ = std::process::Command::new("xdg-open").arg(path).spawn();
    }
}

/// Opens the directory containing `file`.
pub fn reveal<P: AsRef<Path>>(file: P) {
    match file.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => open_path(parent),
        _ => open_path("."),
    }
}
