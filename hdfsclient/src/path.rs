//! Remote path helpers. Remote paths are absolute, `/`-separated strings.

use crate::error::{Error, Result};

/// Normalizes an absolute remote path: collapses repeated separators,
/// drops `.` and resolves `..` lexically. Relative paths are rejected.
pub fn normalize(p: &str) -> Result<String> {
    if !p.starts_with('/') {
        return Err(Error::InvalidArgument(format!(
            "remote path must be absolute: {p:?}"
        )));
    }
    let mut parts: Vec<&str> = Vec::new();
    for part in p.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::InvalidArgument(format!(
                        "path escapes the root: {p:?}"
                    )));
                }
            }
            s => parts.push(s),
        }
    }
    let mut out = String::from("/");
    out.push_str(&parts.join("/"));
    Ok(out)
}

/// Splits a normalized path into (parent, name). The root has no parent.
pub fn split_dir_file(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let n = path.rfind('/').unwrap_or(0);
    if n == 0 {
        Some(("/", &path[1..]))
    } else {
        Some((&path[..n], &path[n + 1..]))
    }
}

/// Last component of a normalized path; empty for the root.
pub fn file_name(path: &str) -> &str {
    split_dir_file(path).map(|(_, name)| name).unwrap_or("")
}

pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Whether `path` equals `ancestor` or lies beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor == "/"
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}
